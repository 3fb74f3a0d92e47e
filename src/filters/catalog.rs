//! The ordered list of filters the streams cycle through.

use std::fmt;

use crate::buffer::PixelBuffer;
use crate::error::FilterError;

use super::{blur, color_adjust, edge, grayscale, sharpen};

/// A pure transform: reads the source, returns a freshly allocated result of
/// identical dimensions.
pub type Transform = fn(&PixelBuffer) -> Result<PixelBuffer, FilterError>;

/// A named entry in a [`FilterCatalog`].
#[derive(Clone, Copy)]
pub struct FilterDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub transform: Transform,
}

impl FilterDescriptor {
    pub const fn new(name: &'static str, description: &'static str, transform: Transform) -> Self {
        Self {
            name,
            description,
            transform,
        }
    }

    pub fn apply(&self, input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
        (self.transform)(input)
    }
}

impl fmt::Debug for FilterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

const STANDARD: [FilterDescriptor; 8] = [
    FilterDescriptor::new("Grayscale", "Black & white conversion", grayscale::grayscale),
    FilterDescriptor::new("Sepia", "Vintage warm tone", color_adjust::sepia),
    FilterDescriptor::new("Invert", "Negative color effect", color_adjust::invert),
    FilterDescriptor::new("Blur", "5x5 box average", blur::box_blur),
    FilterDescriptor::new("Sharpen", "Emphasise detail", sharpen::sharpen),
    FilterDescriptor::new("Brightness", "Increase luminosity", color_adjust::brightness),
    FilterDescriptor::new("Contrast", "Enhance light/dark difference", color_adjust::contrast),
    FilterDescriptor::new("Edge Detection", "Sobel gradient magnitude", edge::edge_detect),
];

/// Fixed, ordered filter list. Order is the cycle order.
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    entries: Vec<FilterDescriptor>,
}

impl FilterCatalog {
    /// The eight built-in filters.
    pub fn standard() -> Self {
        Self {
            entries: STANDARD.to_vec(),
        }
    }

    /// Build a custom catalog.
    ///
    /// # Errors
    /// `EmptyCatalog` if `entries` is empty; a stream could never advance.
    pub fn new(entries: Vec<FilterDescriptor>) -> Result<Self, FilterError> {
        if entries.is_empty() {
            return Err(FilterError::EmptyCatalog);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FilterDescriptor> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterDescriptor> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|f| f.name).collect()
    }

    /// Look up a filter by name, ignoring ASCII case.
    pub fn find(&self, name: &str) -> Option<(usize, &FilterDescriptor)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, f)| f.name.eq_ignore_ascii_case(name))
    }

    /// Entry at `index`, wrapping around the end of the catalog.
    pub fn at(&self, index: usize) -> &FilterDescriptor {
        &self.entries[index % self.entries.len()]
    }

    /// Index that follows `index` in cycle order.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.entries.len()
    }
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_order() {
        let catalog = FilterCatalog::standard();
        assert_eq!(
            catalog.names(),
            [
                "Grayscale",
                "Sepia",
                "Invert",
                "Blur",
                "Sharpen",
                "Brightness",
                "Contrast",
                "Edge Detection"
            ]
        );
    }

    #[test]
    fn test_next_index_wraps() {
        let catalog = FilterCatalog::standard();
        let mut index = 0;
        for _ in 0..catalog.len() {
            index = catalog.next_index(index);
        }
        assert_eq!(index, 0);
        assert_eq!(catalog.next_index(7), 0);
    }

    #[test]
    fn test_every_filter_keeps_dimensions() {
        let mut img = PixelBuffer::new(7, 6, 4).unwrap();
        for (i, v) in img.samples_mut().iter_mut().enumerate() {
            *v = (i * 31 % 256) as u8;
        }
        for filter in FilterCatalog::standard().iter() {
            let out = filter.apply(&img).unwrap();
            assert_eq!(
                (out.width(), out.height(), out.channels()),
                (7, 6, 4),
                "{}",
                filter.name
            );
        }
    }

    #[test]
    fn test_find_ignores_case() {
        let catalog = FilterCatalog::standard();
        let (index, filter) = catalog.find("edge detection").unwrap();
        assert_eq!(index, 7);
        assert_eq!(filter.name, "Edge Detection");
        assert!(catalog.find("emboss").is_none());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(
            FilterCatalog::new(Vec::new()),
            Err(FilterError::EmptyCatalog)
        ));
    }
}
