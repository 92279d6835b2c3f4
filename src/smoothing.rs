//! Exponential smoothing of the displayed frequency and amplitude

use crate::config::MonitorConfig;

/// Smoothed values shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothedMetrics {
    pub displayed_frequency_hz: f64,
    pub displayed_amplitude_g: f64,
}

/// Two independent exponential moving averages
///
/// Both averages snap to zero instead of decaying when the machine stops, so no
/// stale reading lingers after a halt.
#[derive(Debug, Clone)]
pub struct Smoother {
    metrics: SmoothedMetrics,
    amplitude_weight: f64,
    frequency_weight: f64,
    dead_zone_g: f64,
    min_valid_frequency_hz: f64,
}

impl Smoother {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            metrics: SmoothedMetrics::default(),
            amplitude_weight: config.amplitude_smoothing,
            frequency_weight: config.frequency_smoothing,
            dead_zone_g: config.dead_zone_g,
            min_valid_frequency_hz: config.min_valid_frequency_hz,
        }
    }

    /// Fold in one cycle's raw amplitude and instantaneous frequency
    pub fn update(&mut self, raw_amplitude_g: f64, frequency_hz: f64) -> SmoothedMetrics {
        self.update_amplitude(raw_amplitude_g);
        self.update_frequency(frequency_hz);
        self.metrics
    }

    /// Fast-reacting amplitude average, forced to zero inside the dead zone
    pub fn update_amplitude(&mut self, raw_amplitude_g: f64) -> f64 {
        let smoothed = if raw_amplitude_g < self.dead_zone_g {
            0.0
        } else {
            raw_amplitude_g * self.amplitude_weight
                + self.metrics.displayed_amplitude_g * (1.0 - self.amplitude_weight)
        };
        self.metrics.displayed_amplitude_g = smoothed;
        smoothed
    }

    /// Frequency average while rotating, snapped to zero otherwise
    pub fn update_frequency(&mut self, frequency_hz: f64) -> f64 {
        let smoothed = if frequency_hz > self.min_valid_frequency_hz {
            frequency_hz * self.frequency_weight
                + self.metrics.displayed_frequency_hz * (1.0 - self.frequency_weight)
        } else {
            0.0
        };
        self.metrics.displayed_frequency_hz = smoothed;
        smoothed
    }

    pub fn metrics(&self) -> SmoothedMetrics {
        self.metrics
    }
}
