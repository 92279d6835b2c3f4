//! Per-cycle results and the serial output record
//!
//! One record line is emitted per monitoring cycle:
//!
//! ```text
//! <frequencyHz,rpm,amplitudeG,temperatureC,pitchDeg,rollDeg,alert>
//! <12.5,750,0.842,34.2,-3.1,1.8,0>
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{MonitorError, Result};

/// Everything one monitoring cycle produces
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CycleReport {
    /// Peak-to-peak amplitude of this cycle's window (g)
    pub raw_amplitude_g: f64,
    /// Frequency from this cycle's spectrum (Hz), before smoothing
    pub instantaneous_frequency_hz: f64,
    pub displayed_frequency_hz: f64,
    pub displayed_amplitude_g: f64,
    pub rpm: u32,
    pub temperature_c: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    /// Alert threshold (g) in effect for this cycle
    pub threshold_g: f64,
    pub alert: bool,
}

impl CycleReport {
    /// Revolutions per minute from a displayed frequency, truncated
    pub fn rpm_from_frequency(frequency_hz: f64) -> u32 {
        (frequency_hz * 60.0).floor().max(0.0) as u32
    }

    /// The line sent to the serial observer
    pub fn serial_record(&self) -> SerialRecord {
        SerialRecord {
            frequency_hz: self.displayed_frequency_hz,
            rpm: self.rpm,
            amplitude_g: self.raw_amplitude_g,
            temperature_c: self.temperature_c,
            pitch_deg: self.pitch_deg,
            roll_deg: self.roll_deg,
            alert: self.alert,
        }
    }
}

/// Fields of one serial output line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialRecord {
    pub frequency_hz: f64,
    pub rpm: u32,
    pub amplitude_g: f64,
    pub temperature_c: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub alert: bool,
}

/// Avoid printing "-0.0" for values that round to zero from below
fn tidy(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    if (value * scale).round() == 0.0 {
        0.0
    } else {
        value
    }
}

impl fmt::Display for SerialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{:.1},{},{:.3},{:.1},{:.1},{:.1},{}>",
            tidy(self.frequency_hz, 1),
            self.rpm,
            tidy(self.amplitude_g, 3),
            tidy(self.temperature_c, 1),
            tidy(self.pitch_deg, 1),
            tidy(self.roll_deg, 1),
            if self.alert { 1 } else { 0 }
        )
    }
}

impl FromStr for SerialRecord {
    type Err = MonitorError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let body = line
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(|| MonitorError::InvalidRecord(format!("missing angle brackets: {}", line)))?;

        let fields: Vec<&str> = body.split(',').map(str::trim).collect();
        if fields.len() != 7 {
            return Err(MonitorError::InvalidRecord(format!(
                "expected 7 fields, got {}",
                fields.len()
            )));
        }

        let float = |index: usize, name: &str| -> Result<f64> {
            fields[index].parse::<f64>().map_err(|_| {
                MonitorError::InvalidRecord(format!("bad {} value '{}'", name, fields[index]))
            })
        };

        let rpm = fields[1]
            .parse::<u32>()
            .map_err(|_| MonitorError::InvalidRecord(format!("bad rpm value '{}'", fields[1])))?;

        let alert = match fields[6] {
            "0" => false,
            "1" => true,
            other => {
                return Err(MonitorError::InvalidRecord(format!(
                    "alert flag must be 0 or 1, got '{}'",
                    other
                )))
            }
        };

        Ok(SerialRecord {
            frequency_hz: float(0, "frequency")?,
            rpm,
            amplitude_g: float(2, "amplitude")?,
            temperature_c: float(3, "temperature")?,
            pitch_deg: float(4, "pitch")?,
            roll_deg: float(5, "roll")?,
            alert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn example() -> SerialRecord {
        SerialRecord {
            frequency_hz: 12.5,
            rpm: 750,
            amplitude_g: 0.842,
            temperature_c: 34.2,
            pitch_deg: -3.1,
            roll_deg: 1.8,
            alert: false,
        }
    }

    #[test]
    fn test_format_matches_wire_example() {
        assert_eq!(example().to_string(), "<12.5,750,0.842,34.2,-3.1,1.8,0>");
    }

    #[test]
    fn test_format_rounds_and_flags_alert() {
        let record = SerialRecord {
            frequency_hz: 23.456,
            rpm: 1407,
            amplitude_g: 1.23456,
            temperature_c: 29.96,
            pitch_deg: -0.04,
            roll_deg: 12.0,
            alert: true,
        };
        assert_eq!(record.to_string(), "<23.5,1407,1.235,30.0,0.0,12.0,1>");
    }

    #[test]
    fn test_parse_wire_example() {
        let parsed: SerialRecord = "<12.5,750,0.842,34.2,-3.1,1.8,0>".parse().unwrap();
        assert_eq!(parsed, example());
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!("12.5,750,0.842,34.2,-3.1,1.8,0".parse::<SerialRecord>().is_err());
        assert!("<12.5,750,0.842>".parse::<SerialRecord>().is_err());
        assert!("<12.5,750,0.842,34.2,-3.1,1.8,2>".parse::<SerialRecord>().is_err());
        assert!("<12.5,abc,0.842,34.2,-3.1,1.8,0>".parse::<SerialRecord>().is_err());
    }

    #[test]
    fn test_rpm_truncates() {
        assert_eq!(CycleReport::rpm_from_frequency(12.5), 750);
        assert_eq!(CycleReport::rpm_from_frequency(12.49), 749);
        assert_eq!(CycleReport::rpm_from_frequency(0.0), 0);
    }

    #[test]
    fn test_cycle_report_uses_displayed_frequency_and_raw_amplitude() {
        let report = CycleReport {
            raw_amplitude_g: 0.9,
            instantaneous_frequency_hz: 13.0,
            displayed_frequency_hz: 12.5,
            displayed_amplitude_g: 0.7,
            rpm: 750,
            temperature_c: 30.0,
            pitch_deg: 1.0,
            roll_deg: 2.0,
            threshold_g: 0.52,
            alert: true,
        };
        assert_eq!(report.serial_record().to_string(), "<12.5,750,0.900,30.0,1.0,2.0,1>");
    }
}
