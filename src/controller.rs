//! Dual stream controller.
//!
//! Owns the source image and the manual and automatic [`FilterStream`]s.
//! A step runs in two halves:
//!
//! 1. [`DualStreamController::begin`] claims the stream's busy flag and
//!    snapshots the source, the generation and the target filter index.
//! 2. [`PendingStep::compute`] runs the transform (on a rayon worker for
//!    [`DualStreamController::step`] and [`DualStreamController::advance`]),
//!    then [`DualStreamController::complete`] installs the result if the
//!    generation still matches and releases the flag.
//!
//! Loading a new image bumps the generation and resets both streams while
//! holding the source write lock, so a result computed for an older image can
//! never overwrite the new one.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::buffer::PixelBuffer;
use crate::error::{ApplyError, FilterError, LoadError};
use crate::filters::{FilterCatalog, FilterDescriptor};
use crate::stream::{BusyGuard, FilterStream, Side};

/// A filter was applied and installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterApplied {
    pub side: Side,
    pub filter_name: &'static str,
    /// Catalog index of the filter that ran.
    pub applied_index: usize,
    /// Catalog index the next step will apply.
    pub next_index: usize,
    pub generation: u64,
}

/// Why a step left the stream unchanged without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A step was already in flight on this stream.
    AlreadyBusy,
    /// A new image was loaded while the step ran; its result was dropped.
    Superseded,
}

/// Result of a step that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied(FilterApplied),
    Skipped { side: Side, reason: SkipReason },
}

impl StepOutcome {
    pub fn side(&self) -> Side {
        match self {
            StepOutcome::Applied(applied) => applied.side,
            StepOutcome::Skipped { side, .. } => *side,
        }
    }

    pub fn applied(&self) -> Option<&FilterApplied> {
        match self {
            StepOutcome::Applied(applied) => Some(applied),
            StepOutcome::Skipped { .. } => None,
        }
    }
}

/// Outcome of a non-blocking dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The named filter is now running on a worker.
    Started(&'static str),
    /// A step was already in flight; nothing was dispatched.
    Busy,
}

#[derive(Debug)]
struct Source {
    generation: u64,
    image: Arc<PixelBuffer>,
}

/// A step that holds its stream's busy flag but has not run yet.
#[derive(Debug)]
pub struct PendingStep {
    guard: BusyGuard,
    generation: u64,
    target_index: usize,
    filter: FilterDescriptor,
    source: Arc<PixelBuffer>,
}

impl PendingStep {
    pub fn side(&self) -> Side {
        self.guard.stream().side()
    }

    pub fn filter_name(&self) -> &'static str {
        self.filter.name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run the transform against the snapshotted source.
    pub fn compute(self) -> ComputedStep {
        let result = self.filter.apply(&self.source);
        ComputedStep {
            guard: self.guard,
            generation: self.generation,
            target_index: self.target_index,
            filter_name: self.filter.name,
            result,
        }
    }
}

/// A finished transform waiting to be installed.
#[derive(Debug)]
pub struct ComputedStep {
    guard: BusyGuard,
    generation: u64,
    target_index: usize,
    filter_name: &'static str,
    result: Result<PixelBuffer, FilterError>,
}

impl ComputedStep {
    pub fn side(&self) -> Side {
        self.guard.stream().side()
    }
}

/// Owns one source image and the two filter streams.
#[derive(Debug)]
pub struct DualStreamController {
    catalog: FilterCatalog,
    source: RwLock<Option<Source>>,
    manual: Arc<FilterStream>,
    automatic: Arc<FilterStream>,
}

impl DualStreamController {
    /// A controller over the standard catalog with no image loaded.
    pub fn new() -> Self {
        Self::with_catalog(FilterCatalog::standard())
    }

    pub fn with_catalog(catalog: FilterCatalog) -> Self {
        Self {
            catalog,
            source: RwLock::new(None),
            manual: Arc::new(FilterStream::new(Side::Manual)),
            automatic: Arc::new(FilterStream::new(Side::Automatic)),
        }
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    pub fn stream(&self, side: Side) -> &Arc<FilterStream> {
        match side {
            Side::Manual => &self.manual,
            Side::Automatic => &self.automatic,
        }
    }

    /// Replace the source and reset both streams to `Ready(0, copy)`.
    ///
    /// Steps in flight keep running; their results are discarded on arrival.
    pub fn load_buffer(&self, image: PixelBuffer) -> Result<(), LoadError> {
        let manual_copy = image.try_clone()?;
        let automatic_copy = image.try_clone()?;
        let (width, height, channels) = (image.width(), image.height(), image.channels());

        let previous = {
            let mut source = self.source.write();
            let generation = source.as_ref().map_or(1, |s| s.generation + 1);
            self.manual.load(manual_copy, generation);
            self.automatic.load(automatic_copy, generation);
            tracing::info!(
                "Loaded {}x{} image ({} channels), generation {}",
                width,
                height,
                channels,
                generation
            );
            source.replace(Source {
                generation,
                image: Arc::new(image),
            })
        };
        drop(previous);
        Ok(())
    }

    /// Claim `side` and snapshot everything its next step needs.
    ///
    /// Returns `Ok(None)` if a step is already in flight on that side.
    ///
    /// # Errors
    /// `NoImageLoaded` before the first load.
    pub fn begin(&self, side: Side) -> Result<Option<PendingStep>, ApplyError> {
        // Holding the read lock keeps a load from slipping in between the
        // snapshot of the source and the snapshot of the stream.
        let source = self.source.read();
        let Some(src) = source.as_ref() else {
            return Err(ApplyError::NoImageLoaded);
        };
        let stream = self.stream(side);
        let Some(guard) = stream.try_acquire() else {
            tracing::debug!("{} stream busy, step ignored", side);
            return Ok(None);
        };

        let target_index = stream.index();
        let filter = *self.catalog.at(target_index);
        tracing::debug!(
            "{} stream: dispatching {} (index {}, generation {})",
            side,
            filter.name,
            target_index,
            src.generation
        );

        Ok(Some(PendingStep {
            guard,
            generation: src.generation,
            target_index,
            filter,
            source: Arc::clone(&src.image),
        }))
    }

    /// Install a computed step and release its stream.
    ///
    /// A failed transform leaves the stream's index and buffer untouched.
    pub fn complete(&self, computed: ComputedStep) -> Result<StepOutcome, ApplyError> {
        let ComputedStep {
            guard,
            generation,
            target_index,
            filter_name,
            result,
        } = computed;
        let stream = Arc::clone(guard.stream());
        let side = stream.side();

        let outcome = match result {
            Err(source) => {
                tracing::warn!("{} stream: {} failed: {}", side, filter_name, source);
                Err(ApplyError::Filter {
                    filter: filter_name,
                    source,
                })
            }
            Ok(buffer) => match stream.install(
                &guard,
                generation,
                target_index,
                filter_name,
                buffer,
                self.catalog.len(),
            ) {
                Some(next_index) => {
                    tracing::debug!("{} stream: installed {}", side, filter_name);
                    Ok(StepOutcome::Applied(FilterApplied {
                        side,
                        filter_name,
                        applied_index: target_index,
                        next_index,
                        generation,
                    }))
                }
                None => {
                    tracing::warn!(
                        "{} stream: discarding {} computed for generation {}",
                        side,
                        filter_name,
                        generation
                    );
                    Ok(StepOutcome::Skipped {
                        side,
                        reason: SkipReason::Superseded,
                    })
                }
            },
        };

        drop(guard);
        outcome
    }

    /// Apply the next filter on `side` and wait for it.
    ///
    /// The transform runs on the calling thread (its rows still fan out over
    /// rayon), so this is safe to call from inside a rayon worker or an
    /// `advance` callback. A step requested while `side` is busy returns
    /// `StepOutcome::Skipped { reason: AlreadyBusy, .. }` without waiting.
    pub fn step(&self, side: Side) -> Result<StepOutcome, ApplyError> {
        let Some(pending) = self.begin(side)? else {
            return Ok(StepOutcome::Skipped {
                side,
                reason: SkipReason::AlreadyBusy,
            });
        };
        self.complete(compute_caught(pending)?)
    }

    /// Dispatch the next filter on `side` without waiting.
    ///
    /// `on_done` runs on the worker after the result has been installed (or
    /// discarded). It is not called when the dispatch reports `Busy`.
    pub fn advance<F>(self: &Arc<Self>, side: Side, on_done: F) -> Result<Dispatch, ApplyError>
    where
        F: FnOnce(Result<StepOutcome, ApplyError>) + Send + 'static,
    {
        let Some(pending) = self.begin(side)? else {
            return Ok(Dispatch::Busy);
        };
        let name = pending.filter_name();
        let controller = Arc::clone(self);
        rayon::spawn(move || {
            let result = compute_caught(pending).and_then(|computed| controller.complete(computed));
            on_done(result);
        });
        Ok(Dispatch::Started(name))
    }

    /// One tick of the automatic stream's cadence.
    ///
    /// Skipped (`Dispatch::Busy`) while the previous tick is still running.
    pub fn tick<F>(self: &Arc<Self>, on_done: F) -> Result<Dispatch, ApplyError>
    where
        F: FnOnce(Result<StepOutcome, ApplyError>) + Send + 'static,
    {
        self.advance(Side::Automatic, on_done)
    }

    /// Borrow `side`'s current buffer for the duration of `f`.
    pub fn with_current<R>(&self, side: Side, f: impl FnOnce(&PixelBuffer) -> R) -> Option<R> {
        self.stream(side).with_current(f)
    }

    /// Borrow the unfiltered source image.
    pub fn with_source<R>(&self, f: impl FnOnce(&PixelBuffer) -> R) -> Option<R> {
        self.source.read().as_ref().map(|s| f(&s.image))
    }

    /// Index of the filter `side` will apply next.
    pub fn current_index(&self, side: Side) -> usize {
        self.stream(side).index()
    }

    /// Name of the filter `side` will apply next.
    pub fn next_filter_name(&self, side: Side) -> Option<&'static str> {
        self.catalog.get(self.current_index(side)).map(|f| f.name)
    }

    /// Name of the filter shown in `side`'s buffer; `None` for the unfiltered source copy.
    pub fn applied_filter(&self, side: Side) -> Option<&'static str> {
        self.stream(side).applied_filter()
    }

    pub fn is_busy(&self, side: Side) -> bool {
        self.stream(side).is_busy()
    }

    pub fn has_image(&self) -> bool {
        self.source.read().is_some()
    }

    /// Generation of the current source, `None` before the first load.
    pub fn generation(&self) -> Option<u64> {
        self.source.read().as_ref().map(|s| s.generation)
    }
}

impl Default for DualStreamController {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `pending` on the current thread, turning a panic into `Panicked`.
///
/// Unwinding drops the pending step, which releases the busy flag before the
/// error is returned.
fn compute_caught(pending: PendingStep) -> Result<ComputedStep, ApplyError> {
    let side = pending.side();
    let filter = pending.filter_name();
    panic::catch_unwind(AssertUnwindSafe(move || pending.compute())).map_err(|_| {
        tracing::error!("{} stream: {} panicked", side, filter);
        ApplyError::Panicked { filter }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn white_4x4() -> PixelBuffer {
        PixelBuffer::filled(4, 4, &[255, 255, 255]).unwrap()
    }

    fn gradient() -> PixelBuffer {
        let mut img = PixelBuffer::new(6, 5, 3).unwrap();
        for (i, v) in img.samples_mut().iter_mut().enumerate() {
            *v = (i * 41 % 256) as u8;
        }
        img
    }

    fn failing(_: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
        Err(FilterError::Allocation { bytes: 1 << 40 })
    }

    fn loaded() -> DualStreamController {
        let controller = DualStreamController::new();
        controller.load_buffer(gradient()).unwrap();
        controller
    }

    #[test]
    fn test_step_before_load_fails() {
        let controller = DualStreamController::new();
        assert!(matches!(
            controller.step(Side::Manual),
            Err(ApplyError::NoImageLoaded)
        ));
        assert!(!controller.is_busy(Side::Manual));
    }

    #[test]
    fn test_load_resets_both_streams() {
        let controller = loaded();
        controller.step(Side::Manual).unwrap();
        controller.step(Side::Manual).unwrap();
        assert_eq!(controller.current_index(Side::Manual), 2);

        controller.load_buffer(white_4x4()).unwrap();
        for side in Side::ALL {
            assert_eq!(controller.current_index(side), 0);
            assert_eq!(controller.applied_filter(side), None);
            assert_eq!(controller.with_current(side, |b| b.clone()), Some(white_4x4()));
        }
        assert_eq!(controller.generation(), Some(2));
    }

    #[test]
    fn test_step_installs_filter_output() {
        let controller = loaded();
        let outcome = controller.step(Side::Manual).unwrap();

        let applied = outcome.applied().unwrap();
        assert_eq!(applied.filter_name, "Grayscale");
        assert_eq!(applied.applied_index, 0);
        assert_eq!(applied.next_index, 1);

        let expected = crate::filters::grayscale::grayscale(&gradient()).unwrap();
        assert_eq!(controller.with_current(Side::Manual, |b| b.clone()), Some(expected));
        // The other stream is untouched.
        assert_eq!(controller.with_current(Side::Automatic, |b| b.clone()), Some(gradient()));
        assert_eq!(controller.current_index(Side::Automatic), 0);
    }

    #[test]
    fn test_full_cycle_returns_to_start() {
        let controller = loaded();
        let len = controller.catalog().len();
        assert_eq!(len, 8);

        let mut names = Vec::new();
        for _ in 0..len {
            let outcome = controller.step(Side::Automatic).unwrap();
            names.push(outcome.applied().unwrap().filter_name);
        }
        assert_eq!(names, controller.catalog().names());
        assert_eq!(controller.current_index(Side::Automatic), 0);
    }

    #[test]
    fn test_step_filters_source_not_previous_output() {
        let controller = loaded();
        controller.step(Side::Manual).unwrap(); // Grayscale
        controller.step(Side::Manual).unwrap(); // Sepia

        let expected = crate::filters::color_adjust::sepia(&gradient()).unwrap();
        assert_eq!(controller.with_current(Side::Manual, |b| b.clone()), Some(expected));
    }

    #[test]
    fn test_white_image_brightness_and_invert() {
        let controller = DualStreamController::new();
        controller.load_buffer(white_4x4()).unwrap();
        // Brightness is index 5, Invert index 2.
        for _ in 0..6 {
            controller.step(Side::Manual).unwrap();
        }
        assert_eq!(controller.applied_filter(Side::Manual), Some("Brightness"));
        assert_eq!(
            controller.with_current(Side::Manual, |b| b.samples().iter().all(|&v| v == 255)),
            Some(true)
        );

        for _ in 0..3 {
            controller.step(Side::Automatic).unwrap();
        }
        assert_eq!(controller.applied_filter(Side::Automatic), Some("Invert"));
        assert_eq!(
            controller.with_current(Side::Automatic, |b| b.samples().iter().all(|&v| v == 0)),
            Some(true)
        );
    }

    #[test]
    fn test_step_while_busy_is_a_noop() {
        let controller = loaded();
        controller.step(Side::Manual).unwrap();
        let before = controller.with_current(Side::Manual, |b| b.clone());

        let pending = controller.begin(Side::Manual).unwrap().unwrap();
        let outcome = controller.step(Side::Manual).unwrap();
        assert_eq!(
            outcome,
            StepOutcome::Skipped {
                side: Side::Manual,
                reason: SkipReason::AlreadyBusy
            }
        );
        assert_eq!(controller.current_index(Side::Manual), 1);
        assert_eq!(controller.with_current(Side::Manual, |b| b.clone()), before);

        // The other side is independent.
        assert!(controller.step(Side::Automatic).unwrap().applied().is_some());

        controller.complete(pending.compute()).unwrap();
        assert!(!controller.is_busy(Side::Manual));
        assert_eq!(controller.current_index(Side::Manual), 2);
    }

    #[test]
    fn test_reload_mid_flight_discards_result() {
        let controller = loaded();
        let pending = controller.begin(Side::Automatic).unwrap().unwrap();
        assert_eq!(pending.filter_name(), "Grayscale");

        controller.load_buffer(white_4x4()).unwrap();
        let outcome = controller.complete(pending.compute()).unwrap();

        assert_eq!(
            outcome,
            StepOutcome::Skipped {
                side: Side::Automatic,
                reason: SkipReason::Superseded
            }
        );
        assert_eq!(controller.with_current(Side::Automatic, |b| b.clone()), Some(white_4x4()));
        assert_eq!(controller.current_index(Side::Automatic), 0);
        assert!(!controller.is_busy(Side::Automatic));
    }

    #[test]
    fn test_failed_filter_keeps_state_and_releases() {
        let catalog = FilterCatalog::new(vec![
            FilterDescriptor::new("Broken", "always fails", failing),
            FilterDescriptor::new("Invert", "negative", crate::filters::color_adjust::invert),
        ])
        .unwrap();
        let controller = DualStreamController::with_catalog(catalog);
        controller.load_buffer(gradient()).unwrap();

        let err = controller.step(Side::Manual).unwrap_err();
        assert!(matches!(
            err,
            ApplyError::Filter {
                filter: "Broken",
                source: FilterError::Allocation { .. }
            }
        ));
        assert!(!controller.is_busy(Side::Manual));
        assert_eq!(controller.current_index(Side::Manual), 0);
        assert_eq!(controller.with_current(Side::Manual, |b| b.clone()), Some(gradient()));

        // Retrying hits the same filter again.
        assert!(controller.step(Side::Manual).is_err());
        assert_eq!(controller.current_index(Side::Manual), 0);
    }

    #[test]
    fn test_advance_reports_on_worker() {
        let controller = Arc::new(loaded());
        let (tx, rx) = mpsc::channel();

        let dispatch = controller
            .advance(Side::Manual, move |result| {
                tx.send(result).unwrap();
            })
            .unwrap();
        assert_eq!(dispatch, Dispatch::Started("Grayscale"));

        let outcome = rx.recv().unwrap().unwrap();
        assert_eq!(outcome.applied().unwrap().filter_name, "Grayscale");
        assert_eq!(controller.current_index(Side::Manual), 1);
        assert!(!controller.is_busy(Side::Manual));
    }

    #[test]
    fn test_tick_skips_while_busy() {
        let controller = Arc::new(loaded());
        let pending = controller.begin(Side::Automatic).unwrap().unwrap();

        let dispatch = controller.tick(|_| panic!("busy tick must not report")).unwrap();
        assert_eq!(dispatch, Dispatch::Busy);

        controller.complete(pending.compute()).unwrap();
        let (tx, rx) = mpsc::channel();
        let dispatch = controller.tick(move |r| tx.send(r).unwrap()).unwrap();
        assert_eq!(dispatch, Dispatch::Started("Sepia"));
        assert!(rx.recv().unwrap().is_ok());
    }

    #[test]
    fn test_concurrent_steps_on_one_side() {
        let controller = loaded();
        let outcomes: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..6)
                .map(|_| s.spawn(|| controller.step(Side::Manual).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let applied = outcomes.iter().filter(|o| o.applied().is_some()).count();
        assert!(applied >= 1);
        assert_eq!(controller.current_index(Side::Manual), applied % 8);
        assert!(!controller.is_busy(Side::Manual));
    }

    fn panicking(_: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
        panic!("kernel bug")
    }

    #[test]
    fn test_step_inside_single_thread_pool() {
        let controller = Arc::new(loaded());
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let (tx, rx) = mpsc::channel();

        let worker = Arc::clone(&controller);
        std::thread::spawn(move || {
            let result = pool.install(|| worker.step(Side::Manual));
            let _ = tx.send(result);
        });

        let outcome = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(outcome.applied().unwrap().filter_name, "Grayscale");
        assert!(!controller.is_busy(Side::Manual));
    }

    #[test]
    fn test_step_from_advance_callback() {
        let controller = Arc::new(loaded());
        let (tx, rx) = mpsc::channel();

        let inner = Arc::clone(&controller);
        controller
            .advance(Side::Automatic, move |first| {
                let second = inner.step(Side::Manual);
                let _ = tx.send((first, second));
            })
            .unwrap();

        let (first, second) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(first.unwrap().applied().unwrap().filter_name, "Grayscale");
        assert_eq!(second.unwrap().applied().unwrap().filter_name, "Grayscale");
        assert_eq!(controller.current_index(Side::Manual), 1);
        assert_eq!(controller.current_index(Side::Automatic), 1);
    }

    #[test]
    fn test_panicking_filter_releases_stream() {
        let catalog = FilterCatalog::new(vec![FilterDescriptor::new(
            "Explodes",
            "always panics",
            panicking,
        )])
        .unwrap();
        let controller = Arc::new(DualStreamController::with_catalog(catalog));
        controller.load_buffer(gradient()).unwrap();

        let err = controller.step(Side::Manual).unwrap_err();
        assert!(matches!(err, ApplyError::Panicked { filter: "Explodes" }));
        assert!(!controller.is_busy(Side::Manual));
        assert_eq!(controller.current_index(Side::Manual), 0);

        let (tx, rx) = mpsc::channel();
        controller
            .advance(Side::Automatic, move |r| tx.send(r).unwrap())
            .unwrap();
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(result, Err(ApplyError::Panicked { .. })));
        assert!(!controller.is_busy(Side::Automatic));
    }
}
