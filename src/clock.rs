//! Monotonic microsecond clocks used to pace sampling

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Remaining wait below which `MonotonicClock` stops sleeping and spins
const SPIN_THRESHOLD_US: u64 = 2_000;

/// Source of monotonic time with a "wait until" primitive
///
/// Implementations must never return from `wait_until` before `micros()` has
/// reached the deadline.
pub trait Clock {
    /// Microseconds since the clock's origin
    fn micros(&self) -> u64;

    /// Block until `micros() >= deadline_us`
    fn wait_until(&self, deadline_us: u64);

    /// Block for at least `duration`
    fn delay(&self, duration: Duration) {
        let deadline = self.micros() + duration.as_micros() as u64;
        self.wait_until(deadline);
    }

    /// Elapsed time since an earlier `micros()` reading
    fn elapsed_since(&self, start_us: u64) -> Duration {
        Duration::from_micros(self.micros().saturating_sub(start_us))
    }
}

/// Wall-clock time since creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a new clock starting now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Get elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn micros(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn wait_until(&self, deadline_us: u64) {
        loop {
            let now = self.micros();
            if now >= deadline_us {
                return;
            }

            let remaining = deadline_us - now;
            if remaining > SPIN_THRESHOLD_US {
                // Sleep most of the way, the OS may overshoot by a scheduler tick
                std::thread::sleep(Duration::from_micros(remaining - SPIN_THRESHOLD_US));
            } else {
                std::hint::spin_loop();
            }
        }
    }
}

/// Manually driven clock for simulation and tests
///
/// Clones share the same time base, so a simulated sensor and the sampler can
/// observe one timeline. Waiting jumps straight to the deadline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_us: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, duration: Duration) {
        self.now_us.set(self.now_us.get() + duration.as_micros() as u64);
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set_micros(&self, micros: u64) {
        if micros > self.now_us.get() {
            self.now_us.set(micros);
        }
    }
}

impl Clock for ManualClock {
    fn micros(&self) -> u64 {
        self.now_us.get()
    }

    fn wait_until(&self, deadline_us: u64) {
        self.set_micros(deadline_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_waits_at_least_until_deadline() {
        let clock = MonotonicClock::new();
        let start = clock.micros();
        clock.wait_until(start + 5_000);
        assert!(clock.micros() >= start + 5_000);
    }

    #[test]
    fn test_monotonic_clock_delay() {
        let clock = MonotonicClock::new();
        clock.delay(Duration::from_millis(10));
        let elapsed = clock.elapsed_secs();
        assert!(elapsed >= 0.01); // At least 10ms
        assert!(elapsed < 0.5);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(3));
        assert_eq!(other.micros(), 3_000);

        other.wait_until(10_000);
        assert_eq!(clock.micros(), 10_000);
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set_micros(500);
        clock.wait_until(100);
        assert_eq!(clock.micros(), 500);
        assert_eq!(clock.elapsed_since(200), Duration::from_micros(300));
    }
}
