//! Console dashboard rendering

use crate::calibration::{CalibrationPhase, CalibrationState};
use crate::report::CycleReport;

/// Bar scale (g) used before calibration
const UNCALIBRATED_BAR_FULL_SCALE_G: f64 = 2.0;

/// Create a horizontal level bar filled to `fraction` (clamped to 0-1)
///
/// # Example
/// ```
/// use vibration_monitor::display::create_bar;
///
/// let bar = create_bar(0.5, 20);
/// assert_eq!(bar.chars().filter(|&c| c == '█').count(), 10);
/// ```
pub fn create_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let filled = ((fraction * width as f64) as usize).min(width);

    let mut bar = String::with_capacity(width * 3);
    bar.push_str(&"█".repeat(filled));
    bar.push_str(&"░".repeat(width - filled));
    bar
}

/// Fill level of the amplitude bar
///
/// Once calibrated the bar is full at the alert threshold; before that it spans
/// 0-2 g.
pub fn amplitude_bar_fraction(displayed_amplitude_g: f64, state: &CalibrationState) -> f64 {
    let full_scale = if state.is_calibrated {
        state.threshold
    } else {
        UNCALIBRATED_BAR_FULL_SCALE_G
    };

    if full_scale <= 0.0 {
        return 0.0;
    }
    (displayed_amplitude_g / full_scale).clamp(0.0, 1.0)
}

/// Render the live dashboard for one cycle
pub fn render_dashboard(report: &CycleReport, state: &CalibrationState, cycles: u64) -> String {
    let mut out = String::new();
    let status = if report.alert { "ALERT" } else { "OK" };

    out.push_str("VIBRATION MONITOR                                              \n");
    out.push_str("=================                                              \n");
    out.push_str(&format!("Cycles: {} | Status: {:<5}                                 \n", cycles, status));
    out.push('\n');

    // Frequencies below half a hertz are shown as stopped
    let shown_frequency = if report.displayed_frequency_hz < 0.5 {
        0.0
    } else {
        report.displayed_frequency_hz
    };
    out.push_str(&format!("FREQ / RPM:   {:6.1} Hz  {:6} rpm               \n", shown_frequency, report.rpm));

    let fraction = amplitude_bar_fraction(report.displayed_amplitude_g, state);
    out.push_str(&format!(
        "AMPLITUDE:    {:7.3} g  [{}]\n",
        report.displayed_amplitude_g,
        create_bar(fraction, 40)
    ));
    out.push_str(&format!("TEMPERATURE:  {:6.1} C                                 \n", report.temperature_c));
    out.push_str(&format!(
        "INCLINATION:  P: {:4.0}  R: {:4.0}                          \n",
        report.pitch_deg, report.roll_deg
    ));
    out.push('\n');

    if state.is_calibrated {
        out.push_str(&format!(
            "Alert threshold: {:.3} g (ambient noise {:.3} g)            \n",
            state.threshold, state.ambient_noise_max
        ));
    } else {
        out.push_str("Not calibrated: press Enter to calibrate                      \n");
    }

    out
}

/// One-line calibration status for the console
pub fn render_calibration_phase(phase: CalibrationPhase, progress: f64) -> String {
    match phase {
        CalibrationPhase::Ambient => format!(
            "STEP 1/2  Reading ambient noise (motor OFF)  [{}]",
            create_bar(progress, 30)
        ),
        CalibrationPhase::Countdown { remaining_secs } => {
            format!("START THE MOTOR  {}", remaining_secs)
        }
        CalibrationPhase::Operating => format!(
            "STEP 2/2  Analyzing motor (motor ON)          [{}]",
            create_bar(progress, 30)
        ),
        CalibrationPhase::Complete => "CALIBRATED".to_string(),
    }
}
