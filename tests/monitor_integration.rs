//! End-to-end monitoring on a simulated machine with deterministic time

use std::time::Duration;

use pretty_assertions::assert_eq;
use vibration_monitor::{
    Axis, CalibrationObserver, CalibrationPhase, CalibrationSummary, Clock, FlagTrigger, MachineProfile,
    ManualClock, Monitor, MonitorConfig, MotorSchedule, NeverTrigger, SerialRecord, SimulatedAccelerometer,
};

type SimMonitor = Monitor<SimulatedAccelerometer<ManualClock>, ManualClock>;

/// Machine that is switched on during the calibration countdown
fn machine(clock: &ManualClock) -> SimMonitor {
    let profile = MachineProfile {
        motor: MotorSchedule::OnAfter(Duration::from_secs(23)),
        ..MachineProfile::default()
    };
    let sensor = SimulatedAccelerometer::new(profile, clock.clone(), 7).unwrap();
    Monitor::new(sensor, clock.clone(), Axis::X, MonitorConfig::default()).unwrap()
}

#[derive(Default)]
struct PhaseLog {
    phases: Vec<CalibrationPhase>,
    completed: Option<CalibrationSummary>,
}

impl CalibrationObserver for PhaseLog {
    fn on_phase(&mut self, phase: CalibrationPhase) {
        self.phases.push(phase);
    }

    fn on_complete(&mut self, summary: &CalibrationSummary) {
        self.completed = Some(summary.clone());
    }
}

#[test]
fn calibrate_then_detect_fault() {
    let clock = ManualClock::new();
    let mut monitor = machine(&clock);
    let mut trigger = FlagTrigger::new();
    let mut log = PhaseLog::default();

    // Uncalibrated cycles never alert
    let first = monitor.tick(&mut trigger, &mut log).unwrap();
    assert!(first.calibration.is_none());
    assert!(!first.report.alert);
    assert_eq!(first.report.displayed_frequency_hz, 0.0);

    trigger.request();
    let calibrated = monitor.tick(&mut trigger, &mut log).unwrap();
    let summary = calibrated.calibration.expect("calibration ran");

    assert_eq!(
        log.phases,
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
    assert_eq!(log.completed.as_ref(), Some(&summary));
    assert!(summary.ambient_noise_max < 0.06);
    assert!(!summary.substituted_default);
    assert!(summary.elapsed >= Duration::from_secs(45));
    assert_eq!(monitor.calibration().threshold, summary.threshold);
    assert!(!calibrated.report.alert);

    // Normal running settles near the motor frequency
    let mut report = calibrated.report;
    for _ in 0..5 {
        report = monitor.tick(&mut NeverTrigger, &mut log).unwrap().report;
    }
    assert!((report.displayed_frequency_hz - 12.5).abs() < 1.875);
    assert!(!report.alert);

    // Doubling the vibration crosses the threshold on the next cycle
    monitor.sampler_mut().sensor_mut().set_vibration_amplitude(0.4);
    let faulty = monitor.tick(&mut NeverTrigger, &mut log).unwrap().report;
    assert!(faulty.raw_amplitude_g > summary.threshold);
    assert!(faulty.alert);
    assert!(faulty.serial_record().to_string().ends_with(",1>"));
}

#[test]
fn calibration_without_motor_uses_default_vibration() {
    let clock = ManualClock::new();
    let profile = MachineProfile {
        motor: MotorSchedule::AlwaysOff,
        ..MachineProfile::default()
    };
    let sensor = SimulatedAccelerometer::new(profile, clock.clone(), 5).unwrap();
    let mut monitor = Monitor::new(sensor, clock.clone(), Axis::X, MonitorConfig::default()).unwrap();

    let summary = monitor.calibrate(&mut ()).unwrap();
    assert!(summary.substituted_default);
    assert!((summary.threshold - 0.26).abs() < 1e-9);
    assert!(clock.micros() >= 45_000_000);
}

#[test]
fn serial_records_parse_back() {
    let clock = ManualClock::new();
    let mut monitor = machine(&clock);
    monitor.sampler_mut().sensor_mut().set_motor(MotorSchedule::AlwaysOn);

    for _ in 0..3 {
        let report = monitor.run_cycle().unwrap();
        let line = report.serial_record().to_string();
        let parsed: SerialRecord = line.parse().unwrap();

        assert_eq!(parsed.rpm, report.rpm);
        assert_eq!(parsed.alert, report.alert);
        assert!((parsed.amplitude_g - report.raw_amplitude_g).abs() < 0.0006);
        assert!((parsed.frequency_hz - report.displayed_frequency_hz).abs() < 0.06);
    }
}

#[test]
fn tilted_mount_reads_relative_to_calibration() {
    let clock = ManualClock::new();
    let tilt = 10f64.to_radians();
    let profile = MachineProfile {
        gravity_g: [0.0, tilt.sin(), tilt.cos()],
        noise_std_g: 0.0,
        motor: MotorSchedule::OnAfter(Duration::from_secs(23)),
        ..MachineProfile::default()
    };
    let sensor = SimulatedAccelerometer::new(profile, clock.clone(), 1).unwrap();
    let mut monitor = Monitor::new(sensor, clock.clone(), Axis::X, MonitorConfig::default()).unwrap();

    let before = monitor.run_cycle().unwrap();
    assert!((before.roll_deg - 10.0).abs() < 0.5);

    monitor.calibrate(&mut ()).unwrap();
    let after = monitor.run_cycle().unwrap();
    assert!(after.roll_deg.abs() < 0.5);
}
