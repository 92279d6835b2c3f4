//! Dominant-frequency extraction from a sample window
//!
//! The pipeline is: dead-zone guard, DC removal, Hamming window, forward FFT,
//! magnitude, then the largest bin refined by parabolic interpolation.

use std::f64::consts::PI;

use num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::MonitorConfig;
use crate::sampler::SampleWindow;

/// Symmetric Hamming window coefficients
pub fn hamming_window(n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * ((2.0 * PI * i as f64) / denom).cos())
        .collect()
}

/// Frequency of the strongest non-DC bin, refined by parabolic interpolation
///
/// `magnitudes` is the full-length magnitude spectrum of an `n`-point FFT.
/// Only bins 1..=n/2 are considered. The result is clamped to [0, rate/2].
pub fn major_peak(magnitudes: &[f64], sample_rate_hz: f64) -> f64 {
    let n = magnitudes.len();
    if n < 4 {
        return 0.0;
    }

    let half = n / 2;
    let mut peak_bin = 1;
    for k in 2..=half {
        if magnitudes[k] > magnitudes[peak_bin] {
            peak_bin = k;
        }
    }

    let (left, centre, right) = (
        magnitudes[peak_bin - 1],
        magnitudes[peak_bin],
        magnitudes[peak_bin + 1],
    );
    let denom = left - 2.0 * centre + right;
    let delta = if denom.abs() > f64::EPSILON {
        (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };

    let frequency = (peak_bin as f64 + delta) * sample_rate_hz / n as f64;
    frequency.clamp(0.0, sample_rate_hz / 2.0)
}

/// Extracts the dominant vibration frequency from sample windows
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,
    sample_rate_hz: f64,
    dead_zone_g: f64,
}

impl SpectralAnalyzer {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            planner: FftPlanner::new(),
            sample_rate_hz: config.sampling_rate_hz as f64,
            dead_zone_g: config.dead_zone_g,
        }
    }

    /// Dominant frequency in Hz, or exactly 0 when the window is inside the dead zone
    ///
    /// The window is consumed; its storage becomes the FFT buffer.
    pub fn analyze(&mut self, window: SampleWindow) -> f64 {
        if window.peak_to_peak() < self.dead_zone_g {
            return 0.0;
        }

        let magnitudes = self.magnitude_spectrum(window);
        major_peak(&magnitudes, self.sample_rate_hz)
    }

    /// Magnitude of every FFT bin after DC removal and Hamming windowing
    pub fn magnitude_spectrum(&mut self, window: SampleWindow) -> Vec<f64> {
        let mean = window.mean();
        let samples = window.into_samples();
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }

        let coefficients = hamming_window(n);
        let mut buffer: Vec<Complex<f64>> = samples
            .into_iter()
            .zip(coefficients)
            .map(|(x, w)| Complex::new((x - mean) * w, 0.0))
            .collect();

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        buffer.iter().map(|c| c.norm()).collect()
    }
}
