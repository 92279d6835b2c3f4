//! Build-time tuning constants
//!
//! These values were tuned empirically on the bench. Behavior compatibility with
//! existing installations depends on the exact literals, so they are not exposed
//! as runtime options.

use std::time::Duration;

use crate::error::{MonitorError, Result};

/// Samples per analysis window
pub const WINDOW_SIZE: usize = 64;
/// Target sampling rate in Hz
pub const SAMPLING_RATE_HZ: u32 = 120;
/// Peak-to-peak amplitude (g) below which the machine is considered stationary
pub const DEAD_ZONE_G: f64 = 0.06;
/// Multiplier applied to mean operating vibration to derive the alert threshold
pub const SENSITIVITY_FACTOR: f64 = 1.30;
/// Ambient (motor off) calibration phase length
pub const AMBIENT_PHASE: Duration = Duration::from_secs(20);
/// Operator prompt between the two calibration phases, in whole seconds
pub const COUNTDOWN_SECS: u32 = 5;
/// Operating (motor on) calibration phase length
pub const OPERATING_PHASE: Duration = Duration::from_secs(20);
/// Ambient samples at or above this amplitude (g) are implausible
pub const AMBIENT_CEILING_G: f64 = 2.0;
/// Operating samples above this amplitude (g) are implausible
pub const OPERATING_CEILING_G: f64 = 5.0;
/// Lowest threshold calibration may produce (g)
pub const MIN_THRESHOLD_G: f64 = 0.15;
/// Operating vibration must exceed ambient noise by this much (g)
pub const THRESHOLD_MARGIN_G: f64 = 0.05;
/// Substitute operating vibration (g) when calibration is inconclusive
pub const DEFAULT_OPERATING_G: f64 = 0.20;
/// Threshold (g) held before the first calibration; unused for alerting until calibrated
pub const UNCALIBRATED_THRESHOLD_G: f64 = 0.5;
/// Frequencies at or below this (Hz) are treated as "not rotating"
pub const MIN_VALID_FREQUENCY_HZ: f64 = 0.1;
/// Weight of the new sample in the displayed amplitude average
pub const AMPLITUDE_SMOOTHING: f64 = 0.85;
/// Weight of the new sample in the displayed frequency average
pub const FREQUENCY_SMOOTHING: f64 = 0.8;

/// Sampling period in microseconds: round(1_000_000 / rate)
pub fn sampling_period_us(rate_hz: u32) -> u64 {
    (1_000_000.0 / rate_hz as f64).round() as u64
}

/// Calibration procedure parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    pub ambient_duration: Duration,
    pub countdown_secs: u32,
    pub operating_duration: Duration,
    pub ambient_ceiling_g: f64,
    pub operating_ceiling_g: f64,
    pub threshold_margin_g: f64,
    pub default_operating_g: f64,
    pub sensitivity_factor: f64,
    pub min_threshold_g: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            ambient_duration: AMBIENT_PHASE,
            countdown_secs: COUNTDOWN_SECS,
            operating_duration: OPERATING_PHASE,
            ambient_ceiling_g: AMBIENT_CEILING_G,
            operating_ceiling_g: OPERATING_CEILING_G,
            threshold_margin_g: THRESHOLD_MARGIN_G,
            default_operating_g: DEFAULT_OPERATING_G,
            sensitivity_factor: SENSITIVITY_FACTOR,
            min_threshold_g: MIN_THRESHOLD_G,
        }
    }
}

/// Complete monitor configuration
///
/// `Default` yields the fixed production constants above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    pub window_size: usize,
    pub sampling_rate_hz: u32,
    pub dead_zone_g: f64,
    pub min_valid_frequency_hz: f64,
    pub amplitude_smoothing: f64,
    pub frequency_smoothing: f64,
    pub calibration: CalibrationConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            sampling_rate_hz: SAMPLING_RATE_HZ,
            dead_zone_g: DEAD_ZONE_G,
            min_valid_frequency_hz: MIN_VALID_FREQUENCY_HZ,
            amplitude_smoothing: AMPLITUDE_SMOOTHING,
            frequency_smoothing: FREQUENCY_SMOOTHING,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Sampling period in microseconds
    pub fn sampling_period_us(&self) -> u64 {
        sampling_period_us(self.sampling_rate_hz)
    }

    /// Width of one FFT bin in Hz
    pub fn bin_resolution_hz(&self) -> f64 {
        self.sampling_rate_hz as f64 / self.window_size as f64
    }

    /// Highest frequency the analyzer can report
    pub fn nyquist_hz(&self) -> f64 {
        self.sampling_rate_hz as f64 / 2.0
    }

    /// Check that the configuration describes a usable instrument
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 4 {
            return Err(MonitorError::InvalidParameter(format!(
                "Window size must be at least 4 samples, got {}",
                self.window_size
            )));
        }

        if self.sampling_rate_hz == 0 || self.sampling_rate_hz > 1000 {
            return Err(MonitorError::InvalidParameter(format!(
                "Sample rate must be between 1-1000 Hz, got {}",
                self.sampling_rate_hz
            )));
        }

        for (name, weight) in [
            ("amplitude smoothing", self.amplitude_smoothing),
            ("frequency smoothing", self.frequency_smoothing),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(MonitorError::InvalidParameter(format!(
                    "{} weight must be within 0-1, got {}",
                    name, weight
                )));
            }
        }

        let cal = &self.calibration;
        if cal.sensitivity_factor <= 0.0 || cal.min_threshold_g <= 0.0 {
            return Err(MonitorError::InvalidParameter(
                "Sensitivity factor and threshold floor must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_period_rounds() {
        assert_eq!(sampling_period_us(120), 8333);
        assert_eq!(sampling_period_us(1000), 1000);
        assert_eq!(sampling_period_us(7), 142857);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size, 64);
        assert!((config.bin_resolution_hz() - 1.875).abs() < 1e-12);
        assert_eq!(config.nyquist_hz(), 60.0);
    }

    #[test]
    fn test_validate_rejects_bad_rate() {
        let config = MonitorConfig {
            sampling_rate_hz: 0,
            ..MonitorConfig::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::InvalidParameter(_))));
    }

    #[test]
    fn test_validate_rejects_bad_smoothing() {
        let config = MonitorConfig {
            frequency_smoothing: 1.5,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
