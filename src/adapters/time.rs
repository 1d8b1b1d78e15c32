//! Monotonic clock adapter.
//!
//! Wraps the embassy-time std driver, the same time base the event queue
//! uses for its deadlines, so timestamps and waits always agree.

use embassy_time::Instant;

use crate::app::ports::Clock;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
