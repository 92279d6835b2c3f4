//! Roll/pitch from a static acceleration vector

use crate::sensor::MotionReading;

/// Roll/pitch baseline captured once during calibration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TiltOffset {
    pub roll_deg: f64,
    pub pitch_deg: f64,
}

/// Inclination in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Inclination {
    pub roll_deg: f64,
    pub pitch_deg: f64,
}

impl Inclination {
    /// Compute roll and pitch from the gravity vector of a single reading
    pub fn from_reading(reading: &MotionReading) -> Self {
        let [ax, ay, az] = reading.accel_g;
        Self {
            roll_deg: ay.atan2(az).to_degrees(),
            pitch_deg: (-ax).atan2((ay * ay + az * az).sqrt()).to_degrees(),
        }
    }

    /// Inclination relative to a captured baseline
    pub fn relative_to(self, offset: TiltOffset) -> Self {
        Self {
            roll_deg: self.roll_deg - offset.roll_deg,
            pitch_deg: self.pitch_deg - offset.pitch_deg,
        }
    }

    /// Use the current inclination as the zero reference
    pub fn as_offset(self) -> TiltOffset {
        TiltOffset {
            roll_deg: self.roll_deg,
            pitch_deg: self.pitch_deg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_level_sensor() {
        let incl = Inclination::from_reading(&MotionReading::new([0.0, 0.0, 1.0], 20.0));
        assert!(close(incl.roll_deg, 0.0));
        assert!(close(incl.pitch_deg, 0.0));
    }

    #[test]
    fn test_roll_and_pitch_at_45_degrees() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let rolled = Inclination::from_reading(&MotionReading::new([0.0, s, s], 20.0));
        assert!(close(rolled.roll_deg, 45.0));

        let pitched = Inclination::from_reading(&MotionReading::new([-s, 0.0, s], 20.0));
        assert!(close(pitched.pitch_deg, 45.0));
    }

    #[test]
    fn test_offset_subtraction() {
        let baseline = Inclination::from_reading(&MotionReading::new([0.1, 0.2, 0.97], 20.0));
        let relative = baseline.relative_to(baseline.as_offset());
        assert!(close(relative.roll_deg, 0.0));
        assert!(close(relative.pitch_deg, 0.0));
    }
}
