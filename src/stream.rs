//! Per-side filter stream state machine.
//!
//! ```text
//!            load                 try_acquire              install / fail
//!   Empty ─────────► Ready(i, buf) ───────────► Busy(i, buf) ──────────────► Ready(i', buf')
//!                        ▲                                                        │
//!                        └────────────────────────────────────────────────────────┘
//! ```
//!
//! `i' = (i + 1) mod N` after a successful install; a failed transform leaves
//! index and buffer untouched. `load` resets to `Ready(0, copy)` from any state
//! and bumps the generation, so a result dispatched before the load is
//! discarded when it arrives.
//!
//! The busy flag is the only state touched without the stream lock: accepting
//! a step is a single compare-and-swap, and the returned [`BusyGuard`] clears
//! it on drop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;

/// Which of the two streams a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Advanced on demand ("Next Filter").
    Manual,
    /// Advanced by the periodic tick.
    Automatic,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Manual, Side::Automatic];

    /// Lowercase label used in file names.
    pub fn label(self) -> &'static str {
        match self {
            Side::Manual => "manual",
            Side::Automatic => "automatic",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Manual => f.write_str("Manual"),
            Side::Automatic => f.write_str("Automatic"),
        }
    }
}

#[derive(Debug, Default)]
struct StreamState {
    generation: u64,
    index: usize,
    buffer: Option<PixelBuffer>,
    /// Filter that produced `buffer`; `None` while it is the plain source copy.
    applied: Option<&'static str>,
}

/// One independently cycling sequence of filtered outputs.
#[derive(Debug)]
pub struct FilterStream {
    side: Side,
    busy: AtomicBool,
    state: Mutex<StreamState>,
}

/// Proof that a step owns the stream's busy flag. Dropping it releases the flag.
#[derive(Debug)]
pub struct BusyGuard {
    stream: Arc<FilterStream>,
}

impl BusyGuard {
    pub fn stream(&self) -> &Arc<FilterStream> {
        &self.stream
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.stream.busy.store(false, Ordering::Release);
    }
}

impl FilterStream {
    /// A new stream in the `Empty` state.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            busy: AtomicBool::new(false),
            state: Mutex::new(StreamState::default()),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Reset to `Ready(0, copy)` for `generation`.
    ///
    /// Does not touch the busy flag: a step already in flight keeps it until
    /// it completes, and its result is then rejected by [`Self::install`].
    pub fn load(&self, copy: PixelBuffer, generation: u64) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(
                &mut *state,
                StreamState {
                    generation,
                    index: 0,
                    buffer: Some(copy),
                    applied: None,
                },
            )
        };
        drop(previous);
    }

    /// Claim the busy flag, or `None` if a step is already in flight.
    pub fn try_acquire(self: &Arc<Self>) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                stream: Arc::clone(self),
            })
    }

    /// Install a finished result.
    ///
    /// Returns the new index, or `None` if the stream was reloaded since the
    /// step was dispatched (the result is dropped). The previous buffer is
    /// released once the lock is gone.
    pub fn install(
        &self,
        _guard: &BusyGuard,
        generation: u64,
        target_index: usize,
        filter_name: &'static str,
        buffer: PixelBuffer,
        catalog_len: usize,
    ) -> Option<usize> {
        let (previous, index) = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return None;
            }
            state.index = (target_index + 1) % catalog_len;
            state.applied = Some(filter_name);
            (state.buffer.replace(buffer), state.index)
        };
        drop(previous);
        Some(index)
    }

    /// Index of the filter the next step will apply.
    pub fn index(&self) -> usize {
        self.state.lock().index
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_none()
    }

    /// Name of the filter shown in the current buffer, `None` for the
    /// unfiltered source copy or an empty stream.
    pub fn applied_filter(&self) -> Option<&'static str> {
        self.state.lock().applied
    }

    /// Borrow the current buffer for the duration of `f`.
    ///
    /// The stream lock is held while `f` runs; keep it short.
    pub fn with_current<R>(&self, f: impl FnOnce(&PixelBuffer) -> R) -> Option<R> {
        self.state.lock().buffer.as_ref().map(f)
    }
}
