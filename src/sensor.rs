//! Accelerometer abstraction shared by the hardware and simulated backends

use std::fmt;
use std::str::FromStr;

use crate::error::{MonitorError, Result};

/// Accelerometer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub(crate) fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

impl FromStr for Axis {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(MonitorError::InvalidParameter(format!(
                "Axis must be x, y or z, got '{}'",
                other
            ))),
        }
    }
}

/// One reading from the motion sensor in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReading {
    /// Acceleration (x, y, z) in g
    pub accel_g: [f64; 3],
    /// Die temperature in °C
    pub temperature_c: f64,
}

impl MotionReading {
    pub fn new(accel_g: [f64; 3], temperature_c: f64) -> Self {
        Self {
            accel_g,
            temperature_c,
        }
    }

    /// Acceleration along one axis in g
    pub fn axis(&self, axis: Axis) -> f64 {
        self.accel_g[axis.index()]
    }
}

/// A sensor that yields acceleration readings on demand
///
/// Reads are assumed to succeed once the device is initialized; an error here is
/// a bus failure and is not retried.
pub trait Accelerometer {
    fn read(&mut self) -> Result<MotionReading>;
}

impl<A: Accelerometer + ?Sized> Accelerometer for Box<A> {
    fn read(&mut self) -> Result<MotionReading> {
        (**self).read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_selection() {
        let reading = MotionReading::new([0.1, -0.2, 0.98], 25.0);
        assert_eq!(reading.axis(Axis::X), 0.1);
        assert_eq!(reading.axis(Axis::Y), -0.2);
        assert_eq!(reading.axis(Axis::Z), 0.98);
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!("X".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!(" z ".parse::<Axis>().unwrap(), Axis::Z);
        assert!("w".parse::<Axis>().is_err());
        assert_eq!(Axis::Y.to_string(), "y");
    }
}
