//! HDF5 storage for monitoring cycles
//!
//! One row per cycle in resizable, chunked, deflated datasets under
//! `cycles/`, with run metadata as attributes of `metadata/`. Each row carries
//! the alert threshold in effect for that cycle, so recalibrating mid-run is
//! reflected in the file. Calibration results are not otherwise persisted.

use std::path::Path;

use hdf5::types::VarLenUnicode;
use hdf5::{Dataset, File, Group};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::report::CycleReport;

const FORMAT_VERSION: &str = "1.1";
const CHUNK_SIZE: usize = 256;

/// Cycle report with its timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCycle {
    /// Seconds since the monitor started
    pub timestamp: f64,
    pub report: CycleReport,
}

/// Metadata stored with every recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingMetadata {
    /// ISO 8601 wall-clock start time
    pub start_time: String,
    pub sampling_rate_hz: f64,
    pub window_size: u32,
    pub version: String,
}

struct CycleDatasets {
    timestamps: Dataset,
    frequency_hz: Dataset,
    instantaneous_frequency_hz: Dataset,
    rpm: Dataset,
    amplitude_g: Dataset,
    displayed_amplitude_g: Dataset,
    temperature_c: Dataset,
    pitch_deg: Dataset,
    roll_deg: Dataset,
    threshold_g: Dataset,
    alert: Dataset,
}

impl CycleDatasets {
    fn open(group: &Group) -> Result<Self> {
        let open = |name: &str| {
            group
                .dataset(name)
                .map_err(|e| recording_error(&format!("Failed to open {} dataset", name), e))
        };

        Ok(Self {
            timestamps: open("timestamps")?,
            frequency_hz: open("frequency_hz")?,
            instantaneous_frequency_hz: open("instantaneous_frequency_hz")?,
            rpm: open("rpm")?,
            amplitude_g: open("amplitude_g")?,
            displayed_amplitude_g: open("displayed_amplitude_g")?,
            temperature_c: open("temperature_c")?,
            pitch_deg: open("pitch_deg")?,
            roll_deg: open("roll_deg")?,
            threshold_g: open("threshold_g")?,
            alert: open("alert")?,
        })
    }
}

fn recording_error(context: &str, e: impl std::fmt::Display) -> MonitorError {
    MonitorError::Recording(format!("{}: {}", context, e))
}

fn unicode(value: &str) -> Result<VarLenUnicode> {
    value
        .parse()
        .map_err(|e| recording_error(&format!("Invalid attribute text {:?}", value), e))
}

/// Appends cycle reports to an HDF5 file
pub struct CycleRecorder {
    file: File,
    datasets: CycleDatasets,
    cycle_count: usize,
}

impl CycleRecorder {
    /// Create (truncating) a recording file
    pub fn create<P: AsRef<Path>>(path: P, config: &MonitorConfig) -> Result<Self> {
        let file = File::create(path).map_err(|e| recording_error("Failed to create HDF5 file", e))?;

        let metadata = file
            .create_group("metadata")
            .map_err(|e| recording_error("Failed to create metadata group", e))?;

        let start_time = unicode(&chrono::Local::now().to_rfc3339())?;
        metadata
            .new_attr::<VarLenUnicode>()
            .create("start_time")
            .and_then(|attr| attr.write_scalar(&start_time))
            .map_err(|e| recording_error("Failed to write start_time", e))?;

        metadata
            .new_attr::<f64>()
            .create("sampling_rate_hz")
            .and_then(|attr| attr.write_scalar(&(config.sampling_rate_hz as f64)))
            .map_err(|e| recording_error("Failed to write sampling_rate_hz", e))?;

        metadata
            .new_attr::<u32>()
            .create("window_size")
            .and_then(|attr| attr.write_scalar(&(config.window_size as u32)))
            .map_err(|e| recording_error("Failed to write window_size", e))?;

        let version = unicode(FORMAT_VERSION)?;
        metadata
            .new_attr::<VarLenUnicode>()
            .create("version")
            .and_then(|attr| attr.write_scalar(&version))
            .map_err(|e| recording_error("Failed to write version", e))?;

        let group = file
            .create_group("cycles")
            .map_err(|e| recording_error("Failed to create cycles group", e))?;

        let datasets = CycleDatasets {
            timestamps: Self::create_dataset::<f64>(&group, "timestamps")?,
            frequency_hz: Self::create_dataset::<f64>(&group, "frequency_hz")?,
            instantaneous_frequency_hz: Self::create_dataset::<f64>(&group, "instantaneous_frequency_hz")?,
            rpm: Self::create_dataset::<u32>(&group, "rpm")?,
            amplitude_g: Self::create_dataset::<f64>(&group, "amplitude_g")?,
            displayed_amplitude_g: Self::create_dataset::<f64>(&group, "displayed_amplitude_g")?,
            temperature_c: Self::create_dataset::<f64>(&group, "temperature_c")?,
            pitch_deg: Self::create_dataset::<f64>(&group, "pitch_deg")?,
            roll_deg: Self::create_dataset::<f64>(&group, "roll_deg")?,
            threshold_g: Self::create_dataset::<f64>(&group, "threshold_g")?,
            alert: Self::create_dataset::<u8>(&group, "alert")?,
        };

        Ok(Self {
            file,
            datasets,
            cycle_count: 0,
        })
    }

    fn create_dataset<T: hdf5::H5Type>(group: &Group, name: &str) -> Result<Dataset> {
        group
            .new_dataset::<T>()
            .shape((0..,))
            .chunk((CHUNK_SIZE,))
            .deflate(4)
            .create(name)
            .map_err(|e| recording_error(&format!("Failed to create dataset {}", name), e))
    }

    pub fn append(&mut self, cycle: &RecordedCycle) -> Result<()> {
        self.append_batch(std::slice::from_ref(cycle))
    }

    pub fn append_batch(&mut self, cycles: &[RecordedCycle]) -> Result<()> {
        if cycles.is_empty() {
            return Ok(());
        }

        let new_size = self.cycle_count + cycles.len();
        let column = |f: fn(&RecordedCycle) -> f64| cycles.iter().map(f).collect::<Vec<f64>>();

        let timestamps = column(|c| c.timestamp);
        let frequency = column(|c| c.report.displayed_frequency_hz);
        let instantaneous_frequency = column(|c| c.report.instantaneous_frequency_hz);
        let rpm: Vec<u32> = cycles.iter().map(|c| c.report.rpm).collect();
        let amplitude = column(|c| c.report.raw_amplitude_g);
        let displayed_amplitude = column(|c| c.report.displayed_amplitude_g);
        let temperature = column(|c| c.report.temperature_c);
        let pitch = column(|c| c.report.pitch_deg);
        let roll = column(|c| c.report.roll_deg);
        let threshold = column(|c| c.report.threshold_g);
        let alert: Vec<u8> = cycles.iter().map(|c| c.report.alert as u8).collect();

        append_to_dataset(&self.datasets.timestamps, new_size, &timestamps)?;
        append_to_dataset(&self.datasets.frequency_hz, new_size, &frequency)?;
        append_to_dataset(&self.datasets.instantaneous_frequency_hz, new_size, &instantaneous_frequency)?;
        append_to_dataset(&self.datasets.rpm, new_size, &rpm)?;
        append_to_dataset(&self.datasets.amplitude_g, new_size, &amplitude)?;
        append_to_dataset(&self.datasets.displayed_amplitude_g, new_size, &displayed_amplitude)?;
        append_to_dataset(&self.datasets.temperature_c, new_size, &temperature)?;
        append_to_dataset(&self.datasets.pitch_deg, new_size, &pitch)?;
        append_to_dataset(&self.datasets.roll_deg, new_size, &roll)?;
        append_to_dataset(&self.datasets.threshold_g, new_size, &threshold)?;
        append_to_dataset(&self.datasets.alert, new_size, &alert)?;

        self.cycle_count = new_size;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| recording_error("Failed to flush HDF5 file", e))
    }

    pub fn cycle_count(&self) -> usize {
        self.cycle_count
    }
}

fn append_to_dataset<T: hdf5::H5Type>(dataset: &Dataset, new_size: usize, data: &[T]) -> Result<()> {
    dataset
        .resize((new_size,))
        .map_err(|e| recording_error("Failed to resize dataset", e))?;

    let start = new_size - data.len();
    dataset
        .write_slice(data, start..)
        .map_err(|e| recording_error("Failed to write to dataset", e))
}

/// Read access to a recording
pub struct CycleLog {
    _file: File,
    datasets: CycleDatasets,
    metadata: RecordingMetadata,
}

impl CycleLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(|e| recording_error("Failed to open HDF5 file", e))?;
        let metadata = Self::read_metadata(&file)?;

        let group = file
            .group("cycles")
            .map_err(|e| recording_error("Failed to open cycles group", e))?;
        let datasets = CycleDatasets::open(&group)?;

        Ok(Self {
            _file: file,
            datasets,
            metadata,
        })
    }

    fn read_metadata(file: &File) -> Result<RecordingMetadata> {
        let group = file
            .group("metadata")
            .map_err(|e| recording_error("Failed to open metadata group", e))?;

        let text = |name: &str| {
            group
                .attr(name)
                .and_then(|attr| attr.read_scalar::<VarLenUnicode>())
                .map(|s| s.to_string())
                .map_err(|e| recording_error(&format!("Failed to read {}", name), e))
        };

        let sampling_rate_hz = group
            .attr("sampling_rate_hz")
            .and_then(|attr| attr.read_scalar::<f64>())
            .map_err(|e| recording_error("Failed to read sampling_rate_hz", e))?;

        let window_size = group
            .attr("window_size")
            .and_then(|attr| attr.read_scalar::<u32>())
            .map_err(|e| recording_error("Failed to read window_size", e))?;

        Ok(RecordingMetadata {
            start_time: text("start_time")?,
            sampling_rate_hz,
            window_size,
            version: text("version")?,
        })
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.datasets.timestamps.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read up to `count` cycles starting at index `start`
    pub fn read_range(&self, start: usize, count: usize) -> Result<Vec<RecordedCycle>> {
        let total = self.len();
        if start >= total {
            return Ok(Vec::new());
        }
        let end = start + count.min(total - start);

        let timestamps: Vec<f64> = read_slice(&self.datasets.timestamps, start, end)?;
        let frequency: Vec<f64> = read_slice(&self.datasets.frequency_hz, start, end)?;
        let instantaneous_frequency: Vec<f64> =
            read_slice(&self.datasets.instantaneous_frequency_hz, start, end)?;
        let rpm: Vec<u32> = read_slice(&self.datasets.rpm, start, end)?;
        let amplitude: Vec<f64> = read_slice(&self.datasets.amplitude_g, start, end)?;
        let displayed_amplitude: Vec<f64> = read_slice(&self.datasets.displayed_amplitude_g, start, end)?;
        let temperature: Vec<f64> = read_slice(&self.datasets.temperature_c, start, end)?;
        let pitch: Vec<f64> = read_slice(&self.datasets.pitch_deg, start, end)?;
        let roll: Vec<f64> = read_slice(&self.datasets.roll_deg, start, end)?;
        let threshold: Vec<f64> = read_slice(&self.datasets.threshold_g, start, end)?;
        let alert: Vec<u8> = read_slice(&self.datasets.alert, start, end)?;

        let cycles = (0..timestamps.len())
            .map(|i| RecordedCycle {
                timestamp: timestamps[i],
                report: CycleReport {
                    raw_amplitude_g: amplitude[i],
                    instantaneous_frequency_hz: instantaneous_frequency[i],
                    displayed_frequency_hz: frequency[i],
                    displayed_amplitude_g: displayed_amplitude[i],
                    rpm: rpm[i],
                    temperature_c: temperature[i],
                    pitch_deg: pitch[i],
                    roll_deg: roll[i],
                    threshold_g: threshold[i],
                    alert: alert[i] != 0,
                },
            })
            .collect();

        Ok(cycles)
    }

    pub fn read_all(&self) -> Result<Vec<RecordedCycle>> {
        self.read_range(0, self.len())
    }
}

fn read_slice<T: hdf5::H5Type>(dataset: &Dataset, start: usize, end: usize) -> Result<Vec<T>> {
    dataset
        .read_slice_1d::<T, _>(start..end)
        .map(|array| array.to_vec())
        .map_err(|e| recording_error("Failed to read dataset", e))
}
