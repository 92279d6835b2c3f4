//! "Start calibration" trigger inputs, polled once per loop iteration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A discrete request to start calibration
pub trait CalibrationTrigger {
    /// True at most once per request
    fn poll(&mut self) -> bool;
}

/// Never fires
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTrigger;

impl CalibrationTrigger for NeverTrigger {
    fn poll(&mut self) -> bool {
        false
    }
}

/// Fires on the low-to-high edge of a level input such as a push button
///
/// Holding the button down does not retrigger calibration.
pub struct EdgeTrigger<F> {
    level: F,
    was_high: bool,
}

impl<F: FnMut() -> bool> EdgeTrigger<F> {
    pub fn new(level: F) -> Self {
        Self {
            level,
            was_high: false,
        }
    }
}

impl<F: FnMut() -> bool> CalibrationTrigger for EdgeTrigger<F> {
    fn poll(&mut self) -> bool {
        let high = (self.level)();
        let rising = high && !self.was_high;
        self.was_high = high;
        rising
    }
}

/// Request flag shared with another thread (keyboard watcher, signal handler)
#[derive(Debug, Clone, Default)]
pub struct FlagTrigger {
    requested: Arc<AtomicBool>,
}

impl FlagTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the requesting side
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.requested)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}

impl CalibrationTrigger for FlagTrigger {
    fn poll(&mut self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_trigger_fires_once_per_press() {
        let levels = [false, true, true, true, false, true, false];
        let mut i = 0;
        let mut trigger = EdgeTrigger::new(|| {
            let level = levels[i];
            i += 1;
            level
        });

        let fired: Vec<bool> = (0..levels.len()).map(|_| trigger.poll()).collect();
        assert_eq!(fired, vec![false, true, false, false, false, true, false]);
    }

    #[test]
    fn test_flag_trigger_clears_on_poll() {
        let mut trigger = FlagTrigger::new();
        assert!(!trigger.poll());

        trigger.handle().store(true, Ordering::SeqCst);
        assert!(trigger.poll());
        assert!(!trigger.poll());

        trigger.request();
        assert!(trigger.poll());
    }

    #[test]
    fn test_never_trigger() {
        assert!(!NeverTrigger.poll());
    }
}
