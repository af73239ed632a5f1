//! Time sources for playback accounting.
//!
//! Everything that needs "now" goes through [`Clock`] so tests can drive
//! playback with a [`ManualClock`] instead of waiting on wall time.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Monotonic time source reporting seconds since an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
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
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Virtual clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle while the
/// engine holds another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(seconds: f64) -> Self {
        Self {
            time: Arc::new(Mutex::new(seconds)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.advance_secs(by.as_secs_f64());
    }

    pub fn advance_secs(&self, seconds: f64) {
        let mut time = self.time.lock().unwrap();
        *time += seconds.max(0.0);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.time.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_forward() {
        let clock = ManualClock::starting_at(2.0);
        clock.advance_secs(1.5);
        clock.advance_secs(-10.0);
        assert!((clock.now() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert!((other.now() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
