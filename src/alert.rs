//! Threshold alerting

use crate::calibration::CalibrationState;

/// Alert if calibrated and the instantaneous amplitude exceeds the threshold
///
/// Takes the raw amplitude, not the display-smoothed one, so spikes alert on
/// the cycle they occur.
pub fn evaluate(raw_amplitude_g: f64, state: &CalibrationState) -> bool {
    state.is_calibrated && raw_amplitude_g > state.threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_alerts_before_calibration() {
        let state = CalibrationState::default();
        for amplitude in [0.0, 0.6, 5.0, 1e9, f64::INFINITY] {
            assert!(!evaluate(amplitude, &state));
        }
    }

    #[test]
    fn test_strictly_above_threshold() {
        let state = CalibrationState {
            is_calibrated: true,
            threshold: 0.52,
            ..CalibrationState::default()
        };
        assert!(!evaluate(0.52, &state));
        assert!(evaluate(0.521, &state));
        assert!(!evaluate(0.1, &state));
    }
}
