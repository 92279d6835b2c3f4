//! Cycle recording summary
//!
//! Post-run report over an HDF5 cycle recording.
//!
//! Usage:
//!   cycle-summary --input cycles.h5
//!   cycle-summary --input cycles.h5 --start 60 --end 120 --output report.txt

use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use vibration_monitor::recording::{CycleLog, RecordedCycle, RecordingMetadata};

#[derive(Parser, Debug)]
#[command(name = "cycle-summary")]
#[command(about = "Summarize a vibration monitor cycle recording", long_about = None)]
struct Args {
    /// Input HDF5 file path
    #[arg(short, long)]
    input: PathBuf,

    /// Start time in seconds (default: recording start)
    #[arg(long)]
    start: Option<f64>,

    /// End time in seconds (default: recording end)
    #[arg(long)]
    end: Option<f64>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log = CycleLog::open(&args.input)?;
    let all_cycles = log.read_all()?;

    let (file_start, file_end) = match (all_cycles.first(), all_cycles.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => {
            eprintln!("Error: No cycles in file");
            return Ok(());
        }
    };

    let start_time = args.start.unwrap_or(file_start);
    let end_time = args.end.unwrap_or(file_end);

    if start_time > end_time {
        eprintln!("Error: Start time must not be after end time");
        std::process::exit(1);
    }

    let cycles: Vec<RecordedCycle> = all_cycles
        .into_iter()
        .filter(|c| c.timestamp >= start_time && c.timestamp <= end_time)
        .collect();

    if cycles.is_empty() {
        eprintln!("Error: No cycles in specified time range");
        return Ok(());
    }

    let mut output: Box<dyn Write> = if let Some(path) = args.output {
        Box::new(File::create(path)?)
    } else {
        Box::new(io::stdout())
    };

    write_header(&mut output, log.metadata(), &cycles, start_time, end_time)?;

    writeln!(output, "\n{}", "=".repeat(80))?;
    writeln!(output, "CYCLE STATISTICS")?;
    writeln!(output, "{}", "=".repeat(80))?;
    write_statistics(&mut output, &cycles)?;

    writeln!(output, "\n{}", "=".repeat(80))?;
    writeln!(output, "ALERTS")?;
    writeln!(output, "{}", "=".repeat(80))?;
    write_alerts(&mut output, &cycles)?;

    writeln!(output, "\n{}", "=".repeat(80))?;
    Ok(())
}

fn write_header(
    output: &mut dyn Write,
    metadata: &RecordingMetadata,
    cycles: &[RecordedCycle],
    start_time: f64,
    end_time: f64,
) -> io::Result<()> {
    writeln!(output, "{}", "=".repeat(80))?;
    writeln!(output, "VIBRATION MONITOR CYCLE SUMMARY")?;
    writeln!(output, "{}", "=".repeat(80))?;
    writeln!(output)?;
    writeln!(output, "Recording:")?;
    writeln!(output, "  Started: {}", metadata.start_time)?;
    writeln!(
        output,
        "  Sampling: {:.0} Hz, {} samples per window",
        metadata.sampling_rate_hz, metadata.window_size
    )?;
    writeln!(output)?;
    writeln!(output, "Range:")?;
    writeln!(output, "  {:.2}s to {:.2}s ({:.2}s)", start_time, end_time, end_time - start_time)?;
    writeln!(output, "  Cycles: {}", cycles.len())?;

    let thresholds = thresholds_used(cycles);
    let listed: Vec<String> = thresholds.iter().map(|t| format!("{:.3} g", t)).collect();
    writeln!(output, "  Alert threshold(s): {}", listed.join(", "))?;
    Ok(())
}

/// Distinct thresholds in order of first use
fn thresholds_used(cycles: &[RecordedCycle]) -> Vec<f64> {
    let mut thresholds: Vec<f64> = Vec::new();
    for cycle in cycles {
        if thresholds.last() != Some(&cycle.report.threshold_g) {
            thresholds.push(cycle.report.threshold_g);
        }
    }
    thresholds
}

#[derive(Debug)]
struct Stats {
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

fn compute_stats(data: &[f64]) -> Stats {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;

    Stats {
        mean,
        std_dev: variance.sqrt(),
        min: data.iter().copied().fold(f64::INFINITY, f64::min),
        max: data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

fn write_statistics(output: &mut dyn Write, cycles: &[RecordedCycle]) -> io::Result<()> {
    let column = |f: fn(&RecordedCycle) -> f64| cycles.iter().map(f).collect::<Vec<f64>>();

    let rows = [
        ("Frequency (Hz)", column(|c| c.report.displayed_frequency_hz)),
        ("Speed (rpm)", column(|c| c.report.rpm as f64)),
        ("Amplitude (g)", column(|c| c.report.raw_amplitude_g)),
        ("Smoothed amp (g)", column(|c| c.report.displayed_amplitude_g)),
        ("Temperature (C)", column(|c| c.report.temperature_c)),
        ("Pitch (deg)", column(|c| c.report.pitch_deg)),
        ("Roll (deg)", column(|c| c.report.roll_deg)),
    ];

    writeln!(output)?;
    writeln!(
        output,
        "{:<18} {:>12} {:>12} {:>12} {:>12}",
        "Metric", "Mean", "Std Dev", "Min", "Max"
    )?;
    writeln!(output, "{:-<80}", "")?;

    for (label, data) in rows.iter() {
        let stats = compute_stats(data);
        writeln!(
            output,
            "{:<18} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
            label, stats.mean, stats.std_dev, stats.min, stats.max
        )?;
    }

    Ok(())
}

/// A run of consecutive alerting cycles
#[derive(Debug, Clone, Copy, PartialEq)]
struct AlertEpisode {
    start: f64,
    end: f64,
    peak_g: f64,
    /// Threshold the peak cycle was judged against
    threshold_g: f64,
}

impl AlertEpisode {
    fn begin(cycle: &RecordedCycle) -> Self {
        Self {
            start: cycle.timestamp,
            end: cycle.timestamp,
            peak_g: cycle.report.raw_amplitude_g,
            threshold_g: cycle.report.threshold_g,
        }
    }

    fn extend(&mut self, cycle: &RecordedCycle) {
        self.end = cycle.timestamp;
        if cycle.report.raw_amplitude_g > self.peak_g {
            self.peak_g = cycle.report.raw_amplitude_g;
            self.threshold_g = cycle.report.threshold_g;
        }
    }

    fn excess_percent(&self) -> f64 {
        100.0 * (self.peak_g - self.threshold_g) / self.threshold_g
    }
}

fn alert_episodes(cycles: &[RecordedCycle]) -> Vec<AlertEpisode> {
    let mut episodes = Vec::new();
    let mut current: Option<AlertEpisode> = None;

    for cycle in cycles {
        if !cycle.report.alert {
            episodes.extend(current.take());
            continue;
        }
        match current.as_mut() {
            Some(episode) => episode.extend(cycle),
            None => current = Some(AlertEpisode::begin(cycle)),
        }
    }
    episodes.extend(current);
    episodes
}

fn write_alerts(output: &mut dyn Write, cycles: &[RecordedCycle]) -> io::Result<()> {
    let alerting = cycles.iter().filter(|c| c.report.alert).count();
    let episodes = alert_episodes(cycles);

    writeln!(output)?;
    writeln!(
        output,
        "Alerting cycles: {} of {} ({:.1}%)",
        alerting,
        cycles.len(),
        100.0 * alerting as f64 / cycles.len() as f64
    )?;

    if episodes.is_empty() {
        writeln!(output, "No alert episodes")?;
        return Ok(());
    }

    writeln!(output)?;
    writeln!(
        output,
        "{:>4} {:>10} {:>10} {:>10} {:>12} {:>10}",
        "#", "Start (s)", "End (s)", "Peak (g)", "Thresh (g)", "Over by"
    )?;
    writeln!(output, "{:-<80}", "")?;
    for (i, episode) in episodes.iter().enumerate() {
        writeln!(
            output,
            "{:>4} {:>10.2} {:>10.2} {:>10.3} {:>12.3} {:>9.0}%",
            i + 1,
            episode.start,
            episode.end,
            episode.peak_g,
            episode.threshold_g,
            episode.excess_percent()
        )?;
    }

    Ok(())
}
