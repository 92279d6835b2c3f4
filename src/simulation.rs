//! Synthetic rotating machine for running without hardware

use std::f64::consts::PI;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::clock::Clock;
use crate::error::{MonitorError, Result};
use crate::sensor::{Accelerometer, Axis, MotionReading};

/// When the simulated motor runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorSchedule {
    AlwaysOn,
    AlwaysOff,
    /// Off until the clock passes this point, then on
    OnAfter(Duration),
}

/// Physical description of the simulated machine
#[derive(Debug, Clone, PartialEq)]
pub struct MachineProfile {
    /// Rotation (vibration) frequency in Hz
    pub vibration_hz: f64,
    /// Sinusoid amplitude in g (peak-to-peak is twice this)
    pub vibration_amplitude_g: f64,
    /// Axis the vibration appears on
    pub vibration_axis: Axis,
    /// Standard deviation of sensor noise on every axis, in g
    pub noise_std_g: f64,
    /// Static gravity vector in g (sets the inclination)
    pub gravity_g: [f64; 3],
    pub temperature_c: f64,
    pub motor: MotorSchedule,
}

impl Default for MachineProfile {
    fn default() -> Self {
        Self {
            vibration_hz: 12.5,
            vibration_amplitude_g: 0.2,
            vibration_axis: Axis::X,
            noise_std_g: 0.005,
            gravity_g: [0.0, 0.0, 1.0],
            temperature_c: 34.2,
            motor: MotorSchedule::AlwaysOn,
        }
    }
}

/// Accelerometer producing gravity + motor vibration + Gaussian noise
///
/// Signal time comes from the shared clock, so the waveform follows the
/// sampler's pacing exactly.
pub struct SimulatedAccelerometer<C> {
    profile: MachineProfile,
    clock: C,
    noise: Option<Normal<f64>>,
    rng: StdRng,
}

impl<C: Clock> SimulatedAccelerometer<C> {
    pub fn new(profile: MachineProfile, clock: C, seed: u64) -> Result<Self> {
        let noise = if profile.noise_std_g > 0.0 {
            let normal = Normal::new(0.0, profile.noise_std_g).map_err(|e| {
                MonitorError::InvalidParameter(format!("Invalid noise level: {}", e))
            })?;
            Some(normal)
        } else if profile.noise_std_g == 0.0 {
            None
        } else {
            return Err(MonitorError::InvalidParameter(format!(
                "Noise level must not be negative, got {}",
                profile.noise_std_g
            )));
        };

        Ok(Self {
            profile,
            clock,
            noise,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn profile(&self) -> &MachineProfile {
        &self.profile
    }

    /// Change the motor schedule, e.g. to switch the machine on or off
    pub fn set_motor(&mut self, motor: MotorSchedule) {
        self.profile.motor = motor;
    }

    /// Change the vibration amplitude (g), e.g. to emulate a developing fault
    pub fn set_vibration_amplitude(&mut self, amplitude_g: f64) {
        self.profile.vibration_amplitude_g = amplitude_g;
    }

    /// Whether the motor runs at the current clock time
    pub fn motor_running(&self) -> bool {
        match self.profile.motor {
            MotorSchedule::AlwaysOn => true,
            MotorSchedule::AlwaysOff => false,
            MotorSchedule::OnAfter(delay) => self.clock.micros() >= delay.as_micros() as u64,
        }
    }

    fn noise_sample(&mut self) -> f64 {
        match &self.noise {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        }
    }
}

impl<C: Clock> Accelerometer for SimulatedAccelerometer<C> {
    fn read(&mut self) -> Result<MotionReading> {
        let t = self.clock.micros() as f64 / 1_000_000.0;
        let mut accel = self.profile.gravity_g;

        if self.motor_running() {
            accel[self.profile.vibration_axis.index()] += self.profile.vibration_amplitude_g
                * (2.0 * PI * self.profile.vibration_hz * t).sin();
        }

        for value in accel.iter_mut() {
            *value += self.noise_sample();
        }

        Ok(MotionReading::new(accel, self.profile.temperature_c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_noise_free_signal_follows_clock() {
        let clock = ManualClock::new();
        let profile = MachineProfile {
            vibration_hz: 10.0,
            vibration_amplitude_g: 0.5,
            noise_std_g: 0.0,
            ..MachineProfile::default()
        };
        let mut sensor = SimulatedAccelerometer::new(profile, clock.clone(), 1).unwrap();

        // Quarter period of 10 Hz
        clock.advance(Duration::from_micros(25_000));
        let reading = sensor.read().unwrap();
        assert!((reading.accel_g[0] - 0.5).abs() < 1e-9);
        assert_eq!(reading.accel_g[2], 1.0);
        assert_eq!(reading.temperature_c, 34.2);
    }

    #[test]
    fn test_motor_schedule() {
        let clock = ManualClock::new();
        let profile = MachineProfile {
            motor: MotorSchedule::OnAfter(Duration::from_secs(2)),
            noise_std_g: 0.0,
            ..MachineProfile::default()
        };
        let mut sensor = SimulatedAccelerometer::new(profile, clock.clone(), 1).unwrap();

        assert!(!sensor.motor_running());
        clock.advance(Duration::from_secs(2));
        assert!(sensor.motor_running());

        sensor.set_motor(MotorSchedule::AlwaysOff);
        assert!(!sensor.motor_running());
    }

    #[test]
    fn test_negative_noise_rejected() {
        let profile = MachineProfile {
            noise_std_g: -1.0,
            ..MachineProfile::default()
        };
        assert!(SimulatedAccelerometer::new(profile, ManualClock::new(), 1).is_err());
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let a_clock = ManualClock::new();
        let b_clock = ManualClock::new();
        let mut a = SimulatedAccelerometer::new(MachineProfile::default(), a_clock, 42).unwrap();
        let mut b = SimulatedAccelerometer::new(MachineProfile::default(), b_clock, 42).unwrap();
        assert_eq!(a.read().unwrap(), b.read().unwrap());
    }
}
