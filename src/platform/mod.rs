//! Platform abstraction layer
//!
//! The engine never touches a concrete timer or refresh callback. Hosts plug
//! in:
//! - a [`FrameScheduler`] that arranges for `tick` to be called next refresh
//! - a [`Clock`] that timestamps frames and pointer events

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Host refresh signal
pub trait FrameScheduler {
    /// Arrange for exactly one more frame tick
    fn request_frame(&mut self);

    /// Drop any pending frame request
    fn cancel_frame(&mut self);
}

/// Scheduler driven by hand from tests and the headless binary
///
/// Clones share state, so a host can keep one copy while the engine owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    pending: Rc<Cell<bool>>,
    requests: Rc<Cell<u64>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame has been requested and not yet taken
    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Consume the pending request; returns whether there was one
    pub fn take(&self) -> bool {
        self.pending.replace(false)
    }

    /// Total requests since construction
    pub fn requests(&self) -> u64 {
        self.requests.get()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.pending.set(true);
        self.requests.set(self.requests.get() + 1);
    }

    fn cancel_frame(&mut self) {
        self.pending.set(false);
    }
}

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock relative to construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Synthetic clock advanced explicitly
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: f64) {
        if ms.is_finite() && ms > 0.0 {
            self.now.set(self.now.get() + ms);
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}
