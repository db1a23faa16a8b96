use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};

/// Time source of the blocking read loop
pub trait Clock: Debug {
    /// Monotonic time since the clock was created
    fn now(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Clock that only advances when slept on
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Duration,
    sleeps: usize,
}

impl ManualClock {
    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps += 1;
        self.advance(duration);
    }
}
