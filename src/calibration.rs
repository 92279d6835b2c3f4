//! Two-phase threshold calibration
//!
//! The procedure measures ambient noise with the machine off, prompts the
//! operator to start the machine, measures operating vibration, then derives
//! the alert threshold:
//!
//! ```text
//! Ambient (20 s) -> Countdown (5 x 1 s) -> Operating (20 s) -> Complete
//! ```
//!
//! Every transition is driven by elapsed time on the sampler's clock, so a
//! [`ManualClock`](crate::clock::ManualClock) runs the whole procedure
//! instantly in tests.
//!
//! Inconclusive measurements never fail the run. Implausible samples are
//! dropped and a motor signal indistinguishable from ambient noise is replaced
//! by a conservative default.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::config::{CalibrationConfig, UNCALIBRATED_THRESHOLD_G};
use crate::error::{MonitorError, Result};
use crate::inclination::{Inclination, TiltOffset};
use crate::sampler::Sampler;
use crate::sensor::Accelerometer;

/// Calibration result consumed by alerting and inclination every cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationState {
    pub is_calibrated: bool,
    pub ambient_noise_max: f64,
    pub threshold: f64,
    pub tilt_offset: TiltOffset,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            is_calibrated: false,
            ambient_noise_max: 0.0,
            threshold: UNCALIBRATED_THRESHOLD_G,
            tilt_offset: TiltOffset::default(),
        }
    }
}

/// Calibration state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Measuring noise with the machine off
    Ambient,
    /// Prompting the operator to start the machine
    Countdown { remaining_secs: u32 },
    /// Measuring vibration with the machine running
    Operating,
    /// Threshold ready to be applied
    Complete,
}

impl fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationPhase::Ambient => write!(f, "ambient (motor off)"),
            CalibrationPhase::Countdown { remaining_secs } => {
                write!(f, "start motor in {}s", remaining_secs)
            }
            CalibrationPhase::Operating => write!(f, "operating (motor on)"),
            CalibrationPhase::Complete => write!(f, "complete"),
        }
    }
}

/// Ambient phase accumulator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AmbientStats {
    pub noise_max: f64,
    pub accepted: u64,
    pub rejected: u64,
}

impl AmbientStats {
    /// Record one amplitude; returns false if it was implausible
    pub fn record(&mut self, amplitude_g: f64, ceiling_g: f64) -> bool {
        if amplitude_g >= ceiling_g {
            self.rejected += 1;
            return false;
        }
        self.accepted += 1;
        if amplitude_g > self.noise_max {
            self.noise_max = amplitude_g;
        }
        true
    }
}

/// Operating phase accumulator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OperatingStats {
    /// Sum of amplitudes above the ambient maximum
    pub sum: f64,
    /// Number of amplitudes above the ambient maximum
    pub count: u64,
    pub peak: f64,
    pub accepted: u64,
    pub rejected: u64,
}

impl OperatingStats {
    /// Record one amplitude; returns false if it was implausible
    pub fn record(&mut self, amplitude_g: f64, ambient_max_g: f64, ceiling_g: f64) -> bool {
        if amplitude_g > ceiling_g {
            self.rejected += 1;
            return false;
        }
        self.accepted += 1;
        if amplitude_g > self.peak {
            self.peak = amplitude_g;
        }
        // Only vibration above the noise floor counts as motor signal
        if amplitude_g > ambient_max_g {
            self.sum += amplitude_g;
            self.count += 1;
        }
        true
    }

    /// Mean operating vibration, 0 when nothing exceeded the noise floor
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Threshold computed from the two phases
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdDerivation {
    /// Mean operating vibration as measured
    pub measured_mean_g: f64,
    /// Mean actually used (the default when the measurement was inconclusive)
    pub operating_vibration_g: f64,
    pub substituted_default: bool,
    pub threshold_g: f64,
}

/// Derive the alert threshold from ambient noise and mean operating vibration
pub fn derive_threshold(
    ambient_noise_max_g: f64,
    measured_mean_g: f64,
    config: &CalibrationConfig,
) -> ThresholdDerivation {
    let substituted_default = measured_mean_g < ambient_noise_max_g + config.threshold_margin_g;
    let operating_vibration_g = if substituted_default {
        config.default_operating_g
    } else {
        measured_mean_g
    };
    let threshold_g =
        (operating_vibration_g * config.sensitivity_factor).max(config.min_threshold_g);

    ThresholdDerivation {
        measured_mean_g,
        operating_vibration_g,
        substituted_default,
        threshold_g,
    }
}

/// Outcome of a calibration run, for operator feedback
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSummary {
    pub ambient_noise_max: f64,
    pub mean_operating_vibration: f64,
    pub substituted_default: bool,
    pub operating_peak: f64,
    pub threshold: f64,
    pub tilt_offset: TiltOffset,
    pub ambient_samples: u64,
    pub operating_samples: u64,
    pub rejected_samples: u64,
    pub elapsed: Duration,
    pub completed_at: DateTime<Local>,
}

/// Receives calibration progress, e.g. to drive a display
pub trait CalibrationObserver {
    fn on_phase(&mut self, _phase: CalibrationPhase) {}

    /// Fraction (0-1) of the current timed phase that has elapsed
    fn on_progress(&mut self, _phase: CalibrationPhase, _fraction: f64) {}

    fn on_complete(&mut self, _summary: &CalibrationSummary) {}
}

impl CalibrationObserver for () {}

/// One in-flight calibration run
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    phase: CalibrationPhase,
    session_start_us: u64,
    phase_start_us: u64,
    tilt_offset: TiltOffset,
    ambient: AmbientStats,
    operating: OperatingStats,
}

impl CalibrationSession {
    /// Start a run: capture the tilt baseline and enter the ambient phase
    pub fn begin<S: Accelerometer, C: Clock>(
        config: CalibrationConfig,
        sampler: &mut Sampler<S, C>,
    ) -> Result<Self> {
        let start = sampler.clock().micros();
        let reading = sampler.read_motion()?;
        let tilt_offset = Inclination::from_reading(&reading).as_offset();

        debug!(
            roll = tilt_offset.roll_deg,
            pitch = tilt_offset.pitch_deg,
            "Captured tilt offset"
        );

        Ok(Self {
            config,
            phase: CalibrationPhase::Ambient,
            session_start_us: start,
            phase_start_us: start,
            tilt_offset,
            ambient: AmbientStats::default(),
            operating: OperatingStats::default(),
        })
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn ambient(&self) -> &AmbientStats {
        &self.ambient
    }

    pub fn operating(&self) -> &OperatingStats {
        &self.operating
    }

    pub fn tilt_offset(&self) -> TiltOffset {
        self.tilt_offset
    }

    /// Fraction of the current timed phase elapsed (countdown counts seconds)
    pub fn progress<C: Clock>(&self, clock: &C) -> f64 {
        let fraction = |duration: Duration| {
            if duration.is_zero() {
                1.0
            } else {
                clock.elapsed_since(self.phase_start_us).as_secs_f64() / duration.as_secs_f64()
            }
        };

        let value = match self.phase {
            CalibrationPhase::Ambient => fraction(self.config.ambient_duration),
            CalibrationPhase::Operating => fraction(self.config.operating_duration),
            CalibrationPhase::Countdown { remaining_secs } => {
                let total = self.config.countdown_secs.max(1) as f64;
                (total - remaining_secs as f64) / total
            }
            CalibrationPhase::Complete => 1.0,
        };
        value.clamp(0.0, 1.0)
    }

    /// Perform one unit of work and return the (possibly new) phase
    ///
    /// A unit is one amplitude window in the timed phases or one second of
    /// countdown. Transitions happen when the phase's time has elapsed.
    pub fn step<S: Accelerometer, C: Clock>(
        &mut self,
        sampler: &mut Sampler<S, C>,
    ) -> Result<CalibrationPhase> {
        match self.phase {
            CalibrationPhase::Ambient => {
                if sampler.clock().elapsed_since(self.phase_start_us) >= self.config.ambient_duration {
                    self.enter_countdown(sampler.clock());
                } else {
                    let amplitude = sampler.quick_amplitude()?;
                    if !self.ambient.record(amplitude, self.config.ambient_ceiling_g) {
                        trace!(amplitude, "Discarded implausible ambient sample");
                    }
                }
            }
            CalibrationPhase::Countdown { remaining_secs } => {
                sampler.clock().delay(Duration::from_secs(1));
                if remaining_secs <= 1 {
                    self.enter(CalibrationPhase::Operating, sampler.clock());
                } else {
                    self.phase = CalibrationPhase::Countdown {
                        remaining_secs: remaining_secs - 1,
                    };
                }
            }
            CalibrationPhase::Operating => {
                if sampler.clock().elapsed_since(self.phase_start_us)
                    >= self.config.operating_duration
                {
                    self.enter(CalibrationPhase::Complete, sampler.clock());
                } else {
                    let amplitude = sampler.quick_amplitude()?;
                    let accepted = self.operating.record(
                        amplitude,
                        self.ambient.noise_max,
                        self.config.operating_ceiling_g,
                    );
                    if !accepted {
                        trace!(amplitude, "Discarded implausible operating sample");
                    }
                }
            }
            CalibrationPhase::Complete => {}
        }

        Ok(self.phase)
    }

    /// Apply the result to `state`; only valid once the session is complete
    pub fn finish<C: Clock>(
        self,
        state: &mut CalibrationState,
        clock: &C,
    ) -> Result<CalibrationSummary> {
        if self.phase != CalibrationPhase::Complete {
            return Err(MonitorError::CalibrationIncomplete(self.phase));
        }

        let derivation = derive_threshold(self.ambient.noise_max, self.operating.mean(), &self.config);
        if derivation.substituted_default {
            warn!(
                measured = derivation.measured_mean_g,
                ambient = self.ambient.noise_max,
                substitute = derivation.operating_vibration_g,
                "Motor vibration indistinguishable from ambient noise, using default"
            );
        }

        *state = CalibrationState {
            is_calibrated: true,
            ambient_noise_max: self.ambient.noise_max,
            threshold: derivation.threshold_g,
            tilt_offset: self.tilt_offset,
        };

        Ok(CalibrationSummary {
            ambient_noise_max: self.ambient.noise_max,
            mean_operating_vibration: derivation.operating_vibration_g,
            substituted_default: derivation.substituted_default,
            operating_peak: self.operating.peak,
            threshold: derivation.threshold_g,
            tilt_offset: self.tilt_offset,
            ambient_samples: self.ambient.accepted,
            operating_samples: self.operating.accepted,
            rejected_samples: self.ambient.rejected + self.operating.rejected,
            elapsed: clock.elapsed_since(self.session_start_us),
            completed_at: Local::now(),
        })
    }

    fn enter_countdown<C: Clock>(&mut self, clock: &C) {
        let next = if self.config.countdown_secs == 0 {
            CalibrationPhase::Operating
        } else {
            CalibrationPhase::Countdown {
                remaining_secs: self.config.countdown_secs,
            }
        };
        self.enter(next, clock);
    }

    fn enter<C: Clock>(&mut self, phase: CalibrationPhase, clock: &C) {
        self.phase = phase;
        self.phase_start_us = clock.micros();
    }
}

/// Runs calibration sessions to completion
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    config: CalibrationConfig,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Run a full calibration, blocking until it completes
    ///
    /// Overwrites `state` with the new threshold and tilt offset. There is no
    /// cancellation; the only error is a sensor read failure.
    pub fn run<S: Accelerometer, C: Clock>(
        &self,
        sampler: &mut Sampler<S, C>,
        state: &mut CalibrationState,
        observer: &mut dyn CalibrationObserver,
    ) -> Result<CalibrationSummary> {
        let mut session = CalibrationSession::begin(self.config, sampler)?;
        info!(phase = %session.phase(), "Calibration started");
        observer.on_phase(session.phase());

        loop {
            let before = session.phase();
            let after = session.step(sampler)?;

            if after != before {
                info!(phase = %after, "Calibration phase");
                observer.on_phase(after);
            } else {
                observer.on_progress(after, session.progress(sampler.clock()));
            }

            if after == CalibrationPhase::Complete {
                break;
            }
        }

        let summary = session.finish(state, sampler.clock())?;
        info!(
            ambient = summary.ambient_noise_max,
            operating = summary.mean_operating_vibration,
            threshold = summary.threshold,
            elapsed_s = summary.elapsed.as_secs_f64(),
            "Calibration complete"
        );
        observer.on_complete(&summary);

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::MonitorConfig;
    use crate::sensor::{Axis, MotionReading};

    /// Square wave on X whose peak-to-peak depends on whether the "motor" is on
    struct Bench {
        clock: ManualClock,
        motor_on_at_us: u64,
        ambient_p2p: f64,
        operating_p2p: f64,
        spike_every: Option<u64>,
        reads: u64,
    }

    impl Bench {
        fn new(clock: &ManualClock, ambient_p2p: f64, operating_p2p: f64) -> Self {
            Self {
                clock: clock.clone(),
                motor_on_at_us: 25_000_000,
                ambient_p2p,
                operating_p2p,
                spike_every: None,
                reads: 0,
            }
        }
    }

    impl Accelerometer for Bench {
        fn read(&mut self) -> Result<MotionReading> {
            self.reads += 1;
            let motor_on = self.clock.micros() >= self.motor_on_at_us;
            let p2p = if motor_on { self.operating_p2p } else { self.ambient_p2p };
            let sign = if self.reads % 2 == 0 { 1.0 } else { -1.0 };
            let mut x = sign * p2p * 0.5;
            if let Some(every) = self.spike_every {
                if motor_on && self.reads % every == 0 {
                    x = 6.0;
                }
            }
            Ok(MotionReading::new([x, 0.0, 1.0], 30.0))
        }
    }

    #[derive(Default)]
    struct Recorder {
        phases: Vec<(CalibrationPhase, u64)>,
        clock: ManualClock,
        completed: bool,
    }

    impl CalibrationObserver for Recorder {
        fn on_phase(&mut self, phase: CalibrationPhase) {
            self.phases.push((phase, self.clock.micros()));
        }

        fn on_complete(&mut self, _summary: &CalibrationSummary) {
            self.completed = true;
        }
    }

    fn calibrate(bench: Bench, clock: &ManualClock) -> (CalibrationSummary, CalibrationState) {
        let config = MonitorConfig::default();
        let mut sampler = Sampler::new(bench, clock.clone(), Axis::X, &config);
        let mut state = CalibrationState::default();
        let summary = Calibrator::new(config.calibration)
            .run(&mut sampler, &mut state, &mut ())
            .unwrap();
        (summary, state)
    }

    #[test]
    fn test_threshold_from_clear_motor_signal() {
        let d = derive_threshold(0.10, 0.40, &CalibrationConfig::default());
        assert!(!d.substituted_default);
        assert!((d.threshold_g - 0.52).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_substitutes_default_when_inconclusive() {
        let d = derive_threshold(0.10, 0.12, &CalibrationConfig::default());
        assert!(d.substituted_default);
        assert_eq!(d.operating_vibration_g, 0.20);
        assert!((d.threshold_g - 0.26).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_floor() {
        let d = derive_threshold(0.0, 0.10, &CalibrationConfig::default());
        assert!(!d.substituted_default);
        // 0.10 * 1.30 = 0.13, clamped up
        assert_eq!(d.threshold_g, 0.15);
    }

    #[test]
    fn test_operating_mean_zero_without_samples() {
        let stats = OperatingStats::default();
        assert_eq!(stats.mean(), 0.0);
        let d = derive_threshold(0.05, stats.mean(), &CalibrationConfig::default());
        assert!(d.substituted_default);
        assert!((d.threshold_g - 0.26).abs() < 1e-9);
    }

    #[test]
    fn test_stats_reject_implausible_samples() {
        let mut ambient = AmbientStats::default();
        assert!(ambient.record(0.3, 2.0));
        assert!(!ambient.record(2.0, 2.0));
        assert_eq!(ambient.noise_max, 0.3);
        assert_eq!(ambient.rejected, 1);

        let mut operating = OperatingStats::default();
        assert!(operating.record(0.2, 0.3, 5.0)); // counts toward peak only
        assert!(operating.record(0.6, 0.3, 5.0));
        assert!(!operating.record(5.1, 0.3, 5.0));
        assert_eq!(operating.peak, 0.6);
        assert_eq!(operating.count, 1);
        assert_eq!(operating.mean(), 0.6);
    }

    #[test]
    fn test_full_run_sets_state() {
        let clock = ManualClock::new();
        let (summary, state) = calibrate(Bench::new(&clock, 0.10, 0.40), &clock);

        assert!(state.is_calibrated);
        assert!((state.ambient_noise_max - 0.10).abs() < 1e-12);
        assert!((state.threshold - 0.52).abs() < 1e-9);
        assert!(!summary.substituted_default);
        assert!((summary.operating_peak - 0.40).abs() < 1e-12);
        assert!(summary.ambient_samples > 0);
        assert!(summary.operating_samples > 0);
        assert_eq!(summary.rejected_samples, 0);
    }

    #[test]
    fn test_full_run_inconclusive_motor() {
        let clock = ManualClock::new();
        let (summary, state) = calibrate(Bench::new(&clock, 0.10, 0.12), &clock);

        assert!(summary.substituted_default);
        assert!((state.threshold - 0.26).abs() < 1e-9);
    }

    #[test]
    fn test_full_run_discards_spikes() {
        let clock = ManualClock::new();
        let mut bench = Bench::new(&clock, 0.10, 0.40);
        bench.spike_every = Some(320);
        let (summary, state) = calibrate(bench, &clock);

        assert!(summary.rejected_samples > 0);
        assert!((summary.operating_peak - 0.40).abs() < 1e-12);
        assert!((state.threshold - 0.52).abs() < 1e-9);
    }

    #[test]
    fn test_phase_order_and_duration() {
        let clock = ManualClock::new();
        let config = MonitorConfig::default();
        let mut sampler = Sampler::new(Bench::new(&clock, 0.1, 0.4), clock.clone(), Axis::X, &config);
        let mut state = CalibrationState::default();
        let mut recorder = Recorder {
            clock: clock.clone(),
            ..Recorder::default()
        };

        let summary = Calibrator::new(config.calibration)
            .run(&mut sampler, &mut state, &mut recorder)
            .unwrap();

        let phases: Vec<CalibrationPhase> = recorder.phases.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            phases,
            vec![
                CalibrationPhase::Ambient,
                CalibrationPhase::Countdown { remaining_secs: 5 },
                CalibrationPhase::Countdown { remaining_secs: 4 },
                CalibrationPhase::Countdown { remaining_secs: 3 },
                CalibrationPhase::Countdown { remaining_secs: 2 },
                CalibrationPhase::Countdown { remaining_secs: 1 },
                CalibrationPhase::Operating,
                CalibrationPhase::Complete,
            ]
        );

        let at = |phase: CalibrationPhase| recorder.phases.iter().find(|(p, _)| *p == phase).map(|(_, t)| *t).unwrap();
        assert!(at(CalibrationPhase::Countdown { remaining_secs: 5 }) >= 20_000_000);
        assert!(at(CalibrationPhase::Operating) - at(CalibrationPhase::Countdown { remaining_secs: 5 }) >= 5_000_000);
        assert!(at(CalibrationPhase::Complete) - at(CalibrationPhase::Operating) >= 20_000_000);
        assert!(summary.elapsed >= Duration::from_secs(45));
        assert!(recorder.completed);
    }

    #[test]
    fn test_finish_before_complete_is_rejected() {
        let clock = ManualClock::new();
        let config = MonitorConfig::default();
        let mut sampler = Sampler::new(Bench::new(&clock, 0.1, 0.4), clock.clone(), Axis::X, &config);
        let mut session = CalibrationSession::begin(config.calibration, &mut sampler).unwrap();
        session.step(&mut sampler).unwrap();

        let mut state = CalibrationState::default();
        let result = session.finish(&mut state, &clock);
        assert!(matches!(
            result,
            Err(MonitorError::CalibrationIncomplete(CalibrationPhase::Ambient))
        ));
        assert!(!state.is_calibrated);
    }

    #[test]
    fn test_tilt_offset_captured_at_start() {
        let clock = ManualClock::new();
        let config = MonitorConfig::default();
        let mut sampler = Sampler::new(Bench::new(&clock, 0.1, 0.4), clock.clone(), Axis::X, &config);
        let session = CalibrationSession::begin(config.calibration, &mut sampler).unwrap();

        // First read is x = -0.05, y = 0, z = 1
        let offset = session.tilt_offset();
        assert!(offset.roll_deg.abs() < 1e-9);
        assert!((offset.pitch_deg - 0.05f64.atan2(1.0).to_degrees()).abs() < 1e-9);
        assert_eq!(session.phase(), CalibrationPhase::Ambient);
    }
}
