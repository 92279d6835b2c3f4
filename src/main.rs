//! Vibration monitor - continuous monitoring with on-demand calibration
//!
//! Emits one serial record per cycle on stdout:
//!
//! ```text
//! <12.5,750,0.842,34.2,-3.1,1.8,0>
//! ```
//!
//! Press Enter to start calibration (machine off for 20 s, then on for 20 s).
//! Logs, calibration progress and the optional dashboard go to stderr.
//!
//! Usage:
//!   vibration-monitor                              # simulated machine
//!   vibration-monitor --calibrate --motor-on-after 25
//!   vibration-monitor --source ftdi --channel 0 --axis x --dashboard

use clap::{Parser, ValueEnum};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vibration_monitor::display::{render_calibration_phase, render_dashboard};
use vibration_monitor::{
    Accelerometer, Axis, CalibrationObserver, CalibrationPhase, CalibrationSummary, FlagTrigger, MachineProfile,
    Monitor, MonitorConfig, MonotonicClock, MotorSchedule, SimulatedAccelerometer,
};

#[cfg(feature = "recording")]
use std::path::PathBuf;
#[cfg(feature = "recording")]
use vibration_monitor::{CycleRecorder, RecordedCycle};

/// Cycles between HDF5 flushes
#[cfg(feature = "recording")]
const FLUSH_INTERVAL: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Synthetic machine driven by the wall clock
    Simulated,
    /// MPU6050 on an FT232H I2C bridge
    Ftdi,
}

#[derive(Parser, Debug)]
#[command(name = "vibration-monitor")]
#[command(about = "Monitor machine vibration and alert on excessive amplitude", long_about = None)]
struct Args {
    /// Sensor source
    #[arg(long, value_enum, default_value_t = Source::Simulated)]
    source: Source,

    /// FT232H channel index (ftdi source)
    #[arg(short, long, default_value_t = 0)]
    channel: u32,

    /// Accelerometer axis to analyze
    #[arg(short, long, default_value = "x")]
    axis: Axis,

    /// Run calibration before the first cycle
    #[arg(long)]
    calibrate: bool,

    /// Stop after this many cycles (default: run until Ctrl+C)
    #[arg(long)]
    cycles: Option<u64>,

    /// Redraw a live dashboard on stderr every cycle
    #[arg(long)]
    dashboard: bool,

    /// Record every cycle to this HDF5 file
    #[cfg(feature = "recording")]
    #[arg(long)]
    record: Option<PathBuf>,

    /// Simulated vibration frequency in Hz
    #[arg(long, default_value_t = 12.5)]
    sim_frequency: f64,

    /// Simulated vibration amplitude in g
    #[arg(long, default_value_t = 0.2)]
    sim_amplitude: f64,

    /// Simulated sensor noise (standard deviation, g)
    #[arg(long, default_value_t = 0.005)]
    sim_noise: f64,

    /// Simulated motor starts this many seconds after launch (default: always on)
    #[arg(long)]
    motor_on_after: Option<f64>,

    /// Seed for the simulated noise
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

/// Writes calibration progress to stderr
struct ConsoleObserver;

impl CalibrationObserver for ConsoleObserver {
    fn on_phase(&mut self, phase: CalibrationPhase) {
        match phase {
            CalibrationPhase::Ambient => eprintln!("\nCALIBRATION: make sure the machine is OFF"),
            CalibrationPhase::Operating => eprintln!("\nTURN THE MACHINE ON NOW"),
            _ => {}
        }
        eprint!("\r{}", render_calibration_phase(phase, 0.0));
    }

    fn on_progress(&mut self, phase: CalibrationPhase, fraction: f64) {
        eprint!("\r{}", render_calibration_phase(phase, fraction));
    }

    fn on_complete(&mut self, summary: &CalibrationSummary) {
        eprintln!();
        eprintln!("Ambient noise:       {:.3} g", summary.ambient_noise_max);
        eprintln!("Operating vibration: {:.3} g", summary.mean_operating_vibration);
        eprintln!("Alert threshold:     {:.3} g", summary.threshold);
        if summary.substituted_default {
            eprintln!("Warning: motor vibration not distinguishable from noise, default used");
        }
    }
}

fn open_sensor(args: &Args, clock: MonotonicClock) -> Result<Box<dyn Accelerometer>, Box<dyn Error>> {
    match args.source {
        Source::Simulated => {
            let motor = match args.motor_on_after {
                Some(secs) if secs > 0.0 => MotorSchedule::OnAfter(Duration::from_secs_f64(secs)),
                _ => MotorSchedule::AlwaysOn,
            };
            let profile = MachineProfile {
                vibration_hz: args.sim_frequency,
                vibration_amplitude_g: args.sim_amplitude,
                vibration_axis: args.axis,
                noise_std_g: args.sim_noise,
                motor,
                ..MachineProfile::default()
            };
            info!(?profile, "Using simulated sensor");
            Ok(Box::new(SimulatedAccelerometer::new(profile, clock, args.seed)?))
        }
        Source::Ftdi => open_hardware(args.channel),
    }
}

#[cfg(feature = "ftdi")]
fn open_hardware(channel: u32) -> Result<Box<dyn Accelerometer>, Box<dyn Error>> {
    use vibration_monitor::{MonitorError, Mpu6050};

    eprintln!("Initializing FT232H I2C interface...");
    match Mpu6050::new(channel) {
        Ok(sensor) => Ok(Box::new(sensor)),
        Err(MonitorError::NoChannelsFound) => {
            eprintln!("Error: No FT232H devices found.");
            eprintln!("Please check:");
            eprintln!("  1. FT232H is connected via USB");
            eprintln!("  2. FTDI drivers are installed");
            eprintln!("  3. No other application is using the device");
            Err(Box::new(MonitorError::NoChannelsFound))
        }
        Err(MonitorError::InvalidDeviceId(id)) => {
            eprintln!("Error: Invalid MPU6050 device ID: 0x{:02X}", id);
            eprintln!("Please check:");
            eprintln!("  1. MPU6050 is properly connected to FT232H I2C pins");
            eprintln!("  2. Power supply to MPU6050 is correct (3.3V)");
            eprintln!("  3. Pull-up resistors are present on SDA/SCL lines");
            Err(Box::new(MonitorError::InvalidDeviceId(id)))
        }
        Err(e) => {
            eprintln!("Error initializing sensor: {}", e);
            Err(Box::new(e))
        }
    }
}

#[cfg(not(feature = "ftdi"))]
fn open_hardware(_channel: u32) -> Result<Box<dyn Accelerometer>, Box<dyn Error>> {
    eprintln!("Error: built without FT232H support.");
    eprintln!("Rebuild with: cargo build --release --features ftdi");
    Err("ftdi source unavailable".into())
}

/// Request calibration on every line read from stdin
fn spawn_keyboard_watcher(trigger: &FlagTrigger) {
    let requested = trigger.handle();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if line.is_err() {
                break;
            }
            requested.store(true, Ordering::SeqCst);
        }
    });
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let clock = MonotonicClock::new();
    let sensor = open_sensor(&args, clock)?;
    let config = MonitorConfig::default();
    let mut monitor = Monitor::new(sensor, clock, args.axis, config)?;

    let mut trigger = FlagTrigger::new();
    if args.calibrate {
        trigger.request();
    }
    spawn_keyboard_watcher(&trigger);

    #[cfg(feature = "recording")]
    let mut recorder = match &args.record {
        Some(path) => {
            info!(path = %path.display(), "Recording cycles");
            Some(CycleRecorder::create(path, &config)?)
        }
        None => None,
    };

    info!(
        axis = %args.axis,
        rate_hz = config.sampling_rate_hz,
        window = config.window_size,
        "Monitoring started, press Enter to calibrate, Ctrl+C to exit"
    );

    if args.dashboard {
        eprint!("\x1B[2J");
    }

    let stdout = io::stdout();
    while running.load(Ordering::SeqCst) {
        let outcome = match monitor.tick(&mut trigger, &mut ConsoleObserver) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Sensor failure: {}", e);
                return Err(Box::new(e));
            }
        };

        let mut out = stdout.lock();
        writeln!(out, "{}", outcome.report.serial_record())?;
        out.flush()?;

        if args.dashboard {
            // Move cursor to top without clearing (reduces flicker)
            eprint!("\x1B[H{}", render_dashboard(&outcome.report, monitor.calibration(), monitor.cycles()));
        }

        #[cfg(feature = "recording")]
        if let Some(recorder) = recorder.as_mut() {
            recorder.append(&RecordedCycle {
                timestamp: clock.elapsed_secs(),
                report: outcome.report,
            })?;
            if monitor.cycles() % FLUSH_INTERVAL == 0 {
                recorder.flush()?;
            }
        }

        if args.cycles.is_some_and(|limit| monitor.cycles() >= limit) {
            break;
        }
    }

    #[cfg(feature = "recording")]
    if let Some(mut recorder) = recorder {
        recorder.flush()?;
        info!(cycles = recorder.cycle_count(), "Recording closed");
    }

    info!(cycles = monitor.cycles(), "Monitoring stopped");
    Ok(())
}
