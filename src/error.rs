//! Error types for the vibration monitor

use thiserror::Error;

use crate::calibration::CalibrationPhase;

/// Error type for monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// FTDI driver error
    #[error("FTDI error: {status} ({description})")]
    FtdiError { status: u32, description: String },

    /// No I2C channels found
    #[error("No I2C channels found")]
    NoChannelsFound,

    /// Invalid channel index
    #[error("Invalid channel index: {0}")]
    InvalidChannel(u32),

    /// Invalid WHO_AM_I response
    #[error("Invalid WHO_AM_I response: expected 0x68, got 0x{0:02X}")]
    InvalidDeviceId(u8),

    /// Data transfer error
    #[error("Data transfer error: expected {expected} bytes, transferred {actual}")]
    TransferError { expected: u32, actual: u32 },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Calibration result requested before the session reached completion
    #[error("Calibration not complete (current phase: {0})")]
    CalibrationIncomplete(CalibrationPhase),

    /// Malformed serial record
    #[error("Invalid serial record: {0}")]
    InvalidRecord(String),

    /// HDF5 cycle recording error
    #[cfg(feature = "recording")]
    #[error("Recording error: {0}")]
    Recording(String),
}

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
