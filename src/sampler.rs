//! Fixed-rate, single-axis window acquisition

use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::sensor::{Accelerometer, Axis, MotionReading};

/// A window of single-axis acceleration samples (g)
///
/// Min/max are tracked while the window is filled so the peak-to-peak
/// amplitude is available without a second pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    samples: Vec<f64>,
    min: f64,
    max: f64,
}

impl SampleWindow {
    /// Build a window from already acquired samples
    pub fn from_samples(samples: Vec<f64>) -> Self {
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self { samples, min, max }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Peak-to-peak range (max - min); 0 for an empty window
    pub fn peak_to_peak(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.max - self.min
        }
    }

    /// Arithmetic mean; 0 for an empty window
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub(crate) fn into_samples(self) -> Vec<f64> {
        self.samples
    }
}

/// Paces reads from an accelerometer at the configured sampling rate
pub struct Sampler<S, C> {
    sensor: S,
    clock: C,
    axis: Axis,
    period_us: u64,
    window_size: usize,
}

impl<S: Accelerometer, C: Clock> Sampler<S, C> {
    pub fn new(sensor: S, clock: C, axis: Axis, config: &MonitorConfig) -> Self {
        Self {
            sensor,
            clock,
            axis,
            period_us: config.sampling_period_us(),
            window_size: config.window_size,
        }
    }

    /// Acquire a full window of samples on the configured axis
    ///
    /// Blocks for `window_size * period`.
    pub fn acquire_window(&mut self) -> Result<SampleWindow> {
        let mut samples = Vec::with_capacity(self.window_size);
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        self.sample_paced(|value| {
            min = min.min(value);
            max = max.max(value);
            samples.push(value);
        })?;

        Ok(SampleWindow { samples, min, max })
    }

    /// Peak-to-peak amplitude of one paced window, without keeping the samples
    pub fn quick_amplitude(&mut self) -> Result<f64> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        self.sample_paced(|value| {
            min = min.min(value);
            max = max.max(value);
        })?;

        if self.window_size == 0 {
            return Ok(0.0);
        }
        Ok(max - min)
    }

    /// Single unpaced read of all axes and temperature
    pub fn read_motion(&mut self) -> Result<MotionReading> {
        self.sensor.read()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Read `window_size` samples, each tick starting at least one period after the previous
    fn sample_paced<F>(&mut self, mut on_sample: F) -> Result<()>
    where
        F: FnMut(f64),
    {
        for _ in 0..self.window_size {
            let tick = self.clock.micros();
            let reading = self.sensor.read()?;
            on_sample(reading.axis(self.axis));
            self.clock.wait_until(tick + self.period_us);
        }
        Ok(())
    }
}
