use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of "true" time for the scheduler.
/// Only `pump` reads it; everything else sees the scheduler's virtual clock.
pub trait Clock {
    /// Seconds on this clock's own monotonic timeline.
    fn now(&self) -> f64;
}

/// Wall clock, in seconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Host-driven clock. Clones share the same reading, so a host can keep one
/// handle and give another to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: Rc::new(Cell::new(start)),
        }
    }

    /// Move the clock forward by `dt` seconds. Negative steps are ignored.
    pub fn advance(&self, dt: f64) {
        if dt > 0.0 {
            self.time.set(self.time.get() + dt);
        }
    }

    /// Jump to an absolute reading. The clock never runs backwards.
    pub fn set(&self, time: f64) {
        if time > self.time.get() {
            self.time.set(time);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}
