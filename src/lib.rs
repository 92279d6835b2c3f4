//! Vibration monitor for rotating machinery
//!
//! Samples one accelerometer axis at a fixed rate, extracts the dominant
//! vibration frequency with a windowed FFT, smooths the readings and raises an
//! alert when the peak-to-peak amplitude exceeds a threshold learned by a
//! two-phase calibration (machine off, then machine on).
//!
//! # Quick Start
//!
//! ## Simulated machine
//! ```no_run
//! use vibration_monitor::{Axis, MachineProfile, Monitor, MonitorConfig, MonotonicClock, SimulatedAccelerometer};
//!
//! let clock = MonotonicClock::new();
//! let sensor = SimulatedAccelerometer::new(MachineProfile::default(), clock, 1)?;
//! let mut monitor = Monitor::new(sensor, clock, Axis::X, MonitorConfig::default())?;
//!
//! let report = monitor.run_cycle()?;
//! println!("{}", report.serial_record());
//! # Ok::<(), vibration_monitor::MonitorError>(())
//! ```
//!
//! ## Calibrate, then monitor
//! ```no_run
//! use vibration_monitor::{Axis, FlagTrigger, MachineProfile, Monitor, MonitorConfig, MonotonicClock, SimulatedAccelerometer};
//!
//! let clock = MonotonicClock::new();
//! let sensor = SimulatedAccelerometer::new(MachineProfile::default(), clock, 1)?;
//! let mut monitor = Monitor::new(sensor, clock, Axis::X, MonitorConfig::default())?;
//!
//! // Button presses or keyboard input set the flag from another thread
//! let mut trigger = FlagTrigger::new();
//! trigger.request();
//!
//! loop {
//!     let outcome = monitor.tick(&mut trigger, &mut ())?;
//!     if let Some(summary) = &outcome.calibration {
//!         println!("Threshold: {:.3} g", summary.threshold);
//!     }
//!     if outcome.report.alert {
//!         break;
//!     }
//! }
//! # Ok::<(), vibration_monitor::MonitorError>(())
//! ```
//!
//! ## Hardware (feature `ftdi`)
//! ```ignore
//! use vibration_monitor::{Axis, Monitor, MonitorConfig, MonotonicClock, Mpu6050};
//!
//! let sensor = Mpu6050::new(0)?;
//! let mut monitor = Monitor::new(sensor, MonotonicClock::new(), Axis::X, MonitorConfig::default())?;
//! ```

pub mod alert;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod inclination;
pub mod monitor;
pub mod report;
pub mod sampler;
pub mod sensor;
pub mod simulation;
pub mod smoothing;
pub mod spectrum;
pub mod trigger;

#[cfg(feature = "ftdi")]
mod ffi;
#[cfg(feature = "ftdi")]
pub mod mpu6050;

#[cfg(feature = "recording")]
pub mod recording;

// Re-export public API
pub use calibration::{
    CalibrationObserver, CalibrationPhase, CalibrationSession, CalibrationState, CalibrationSummary, Calibrator,
};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{CalibrationConfig, MonitorConfig};
pub use error::{MonitorError, Result};
pub use inclination::{Inclination, TiltOffset};
pub use monitor::{CycleOutcome, Monitor};
pub use report::{CycleReport, SerialRecord};
pub use sampler::{SampleWindow, Sampler};
pub use sensor::{Accelerometer, Axis, MotionReading};
pub use simulation::{MachineProfile, MotorSchedule, SimulatedAccelerometer};
pub use smoothing::{SmoothedMetrics, Smoother};
pub use spectrum::SpectralAnalyzer;
pub use trigger::{CalibrationTrigger, EdgeTrigger, FlagTrigger, NeverTrigger};

#[cfg(feature = "ftdi")]
pub use mpu6050::Mpu6050;

#[cfg(feature = "recording")]
pub use recording::{CycleLog, CycleRecorder, RecordedCycle};
