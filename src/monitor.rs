//! The monitoring control loop
//!
//! `Monitor` is the sole owner of all mutable state: sampler, analyzer,
//! smoothing and calibration. Each call to [`Monitor::tick`] is one main-loop
//! iteration.

use tracing::debug;

use crate::alert;
use crate::calibration::{CalibrationObserver, CalibrationState, CalibrationSummary, Calibrator};
use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::inclination::Inclination;
use crate::report::CycleReport;
use crate::sampler::Sampler;
use crate::sensor::{Accelerometer, Axis};
use crate::smoothing::{SmoothedMetrics, Smoother};
use crate::spectrum::SpectralAnalyzer;
use crate::trigger::CalibrationTrigger;

/// Result of one main-loop iteration
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Present when the trigger fired and calibration ran before this cycle
    pub calibration: Option<CalibrationSummary>,
    pub report: CycleReport,
}

/// Vibration monitor over one accelerometer axis
pub struct Monitor<S, C> {
    sampler: Sampler<S, C>,
    analyzer: SpectralAnalyzer,
    smoother: Smoother,
    calibrator: Calibrator,
    calibration: CalibrationState,
    cycles: u64,
}

impl<S: Accelerometer, C: Clock> Monitor<S, C> {
    /// Create a monitor; fails only on an invalid configuration
    pub fn new(sensor: S, clock: C, axis: Axis, config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            sampler: Sampler::new(sensor, clock, axis, &config),
            analyzer: SpectralAnalyzer::new(&config),
            smoother: Smoother::new(&config),
            calibrator: Calibrator::new(config.calibration),
            calibration: CalibrationState::default(),
            cycles: 0,
        })
    }

    /// One main-loop iteration: poll the trigger, calibrate if requested, then run a cycle
    pub fn tick<T: CalibrationTrigger + ?Sized>(
        &mut self,
        trigger: &mut T,
        observer: &mut dyn CalibrationObserver,
    ) -> Result<CycleOutcome> {
        let calibration = if trigger.poll() {
            Some(self.calibrate(observer)?)
        } else {
            None
        };

        let report = self.run_cycle()?;
        Ok(CycleOutcome {
            calibration,
            report,
        })
    }

    /// Run the two-phase calibration; blocks for its full duration
    pub fn calibrate(&mut self, observer: &mut dyn CalibrationObserver) -> Result<CalibrationSummary> {
        self.calibrator
            .run(&mut self.sampler, &mut self.calibration, observer)
    }

    /// Acquire and analyze one window and derive all reported metrics
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        let window = self.sampler.acquire_window()?;
        let raw_amplitude = window.peak_to_peak();
        let frequency = self.analyzer.analyze(window);
        let metrics = self.smoother.update(raw_amplitude, frequency);

        let motion = self.sampler.read_motion()?;
        let inclination = Inclination::from_reading(&motion).relative_to(self.calibration.tilt_offset);
        let alert = alert::evaluate(raw_amplitude, &self.calibration);

        self.cycles += 1;
        let report = CycleReport {
            raw_amplitude_g: raw_amplitude,
            instantaneous_frequency_hz: frequency,
            displayed_frequency_hz: metrics.displayed_frequency_hz,
            displayed_amplitude_g: metrics.displayed_amplitude_g,
            rpm: CycleReport::rpm_from_frequency(metrics.displayed_frequency_hz),
            temperature_c: motion.temperature_c,
            pitch_deg: inclination.pitch_deg,
            roll_deg: inclination.roll_deg,
            threshold_g: self.calibration.threshold,
            alert,
        };

        debug!(
            cycle = self.cycles,
            amplitude = raw_amplitude,
            frequency,
            displayed = metrics.displayed_frequency_hz,
            alert,
            "Cycle complete"
        );

        Ok(report)
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    pub fn metrics(&self) -> SmoothedMetrics {
        self.smoother.metrics()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn sampler(&self) -> &Sampler<S, C> {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut Sampler<S, C> {
        &mut self.sampler
    }
}
