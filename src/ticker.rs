//! Fixed-cadence driver for the automatic stream.
//!
//! The controller owns no timer; this is the reference scheduler that calls
//! [`DualStreamController::tick`] every interval on a dedicated thread until
//! stopped. A tick that lands while the previous one is still running is
//! skipped by the controller's busy guard.
//!
//! Loading an image through the controller does not stop a running ticker;
//! the next tick simply starts the cycle over on the new image. Use
//! [`Ticker::stop_and_load`] to halt the cadence and load in one call, the
//! way a player resets to its stopped state when a new file is opened.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::buffer::PixelBuffer;
use crate::controller::{DualStreamController, Dispatch};
use crate::error::{ApplyError, LoadError};
use crate::status::StatusReport;
use crate::stream::Side;

/// Receives the status of every completed tick, on the worker thread.
pub type StatusCallback = Arc<dyn Fn(StatusReport) + Send + Sync>;

#[derive(Default)]
struct Signal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Handle to a running ticker. Dropping it stops the thread.
pub struct Ticker {
    controller: Arc<DualStreamController>,
    signal: Arc<Signal>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl Ticker {
    /// Start ticking `controller` every `interval`.
    pub fn start(
        controller: Arc<DualStreamController>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        Self::start_with(controller, interval, None)
    }

    /// Like [`Ticker::start`], reporting each finished tick to `on_status`.
    pub fn start_with(
        controller: Arc<DualStreamController>,
        interval: Duration,
        on_status: Option<StatusCallback>,
    ) -> std::io::Result<Self> {
        Self::spawn(controller, interval, None, on_status)
    }

    /// Like [`Ticker::start_with`], but stops by itself after dispatching
    /// `ticks` filters. Every dispatched tick still reports to `on_status`.
    pub fn start_limited(
        controller: Arc<DualStreamController>,
        interval: Duration,
        ticks: usize,
        on_status: Option<StatusCallback>,
    ) -> std::io::Result<Self> {
        Self::spawn(controller, interval, Some(ticks), on_status)
    }

    fn spawn(
        controller: Arc<DualStreamController>,
        interval: Duration,
        limit: Option<usize>,
        on_status: Option<StatusCallback>,
    ) -> std::io::Result<Self> {
        let signal = Arc::new(Signal::default());
        let thread_signal = Arc::clone(&signal);
        let thread_controller = Arc::clone(&controller);
        let handle = thread::Builder::new()
            .name("dualfilter-ticker".to_string())
            .spawn(move || run(thread_controller, thread_signal, interval, limit, on_status))?;

        tracing::info!("Automatic filters started ({} ms)", interval.as_millis());
        Ok(Self {
            controller,
            signal,
            handle: Some(handle),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !*self.signal.stopped.lock()
    }

    /// Stop ticking and wait for the thread to exit. Steps already dispatched
    /// still complete on their workers.
    pub fn stop(&mut self) {
        {
            let mut stopped = self.signal.stopped.lock();
            *stopped = true;
            self.signal.wake.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Ticker thread panicked");
            }
            tracing::info!("Automatic filters stopped");
        }
    }

    /// Stop ticking, then load `image` as the new source.
    ///
    /// A tick still running on a worker finishes against the old image and
    /// its result is discarded by the reload.
    pub fn stop_and_load(&mut self, image: PixelBuffer) -> Result<(), LoadError> {
        self.stop();
        self.controller.load_buffer(image)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    controller: Arc<DualStreamController>,
    signal: Arc<Signal>,
    interval: Duration,
    limit: Option<usize>,
    on_status: Option<StatusCallback>,
) {
    let mut dispatched = 0usize;
    let mut deadline = Instant::now() + interval;
    loop {
        if limit.is_some_and(|limit| dispatched >= limit) {
            *signal.stopped.lock() = true;
            tracing::debug!("Tick limit of {} reached", dispatched);
            return;
        }
        {
            let mut stopped = signal.stopped.lock();
            while !*stopped && Instant::now() < deadline {
                signal.wake.wait_until(&mut stopped, deadline);
            }
            if *stopped {
                return;
            }
        }
        deadline += interval;

        let callback = on_status.clone();
        let dispatch = controller.tick(move |result| {
            if let Some(callback) = callback {
                callback(StatusReport::from_result(Side::Automatic, &result));
            }
        });
        match dispatch {
            Ok(Dispatch::Started(name)) => {
                tracing::debug!("Tick: applying {}", name);
                dispatched += 1;
            }
            Ok(Dispatch::Busy) => tracing::debug!("Tick skipped: previous filter still running"),
            Err(ApplyError::NoImageLoaded) => tracing::debug!("Tick skipped: no image loaded"),
            Err(err) => tracing::warn!("Tick failed: {}", err),
        }
    }
}
