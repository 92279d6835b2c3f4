//! FFI bindings for the FTDI libMPSSE I2C library
//!
//! Only the calls the MPU6050 backend needs. Based on libmpsse_i2c.h.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;

use crate::error::{MonitorError, Result};

pub type DWORD = u32;
pub type UCHAR = u8;
pub type USHORT = u16;

pub type FT_STATUS = DWORD;
pub type FT_HANDLE = *mut c_void;

// FT_STATUS return codes (from ftd2xx.h)
pub const FT_OK: FT_STATUS = 0;
const FT_INVALID_HANDLE: FT_STATUS = 1;
const FT_DEVICE_NOT_FOUND: FT_STATUS = 2;
const FT_DEVICE_NOT_OPENED: FT_STATUS = 3;
const FT_IO_ERROR: FT_STATUS = 4;
const FT_INSUFFICIENT_RESOURCES: FT_STATUS = 5;
const FT_INVALID_PARAMETER: FT_STATUS = 6;
const FT_INVALID_ARGS: FT_STATUS = 16;
const FT_NOT_SUPPORTED: FT_STATUS = 17;
const FT_OTHER_ERROR: FT_STATUS = 18;

// I2C transfer options
pub const I2C_TRANSFER_OPTIONS_START_BIT: DWORD = 0x00000001;
pub const I2C_TRANSFER_OPTIONS_STOP_BIT: DWORD = 0x00000002;
pub const I2C_TRANSFER_OPTIONS_BREAK_ON_NACK: DWORD = 0x00000004;
pub const I2C_TRANSFER_OPTIONS_NACK_LAST_BYTE: DWORD = 0x00000008;
pub const I2C_TRANSFER_OPTIONS_FAST_TRANSFER_BYTES: DWORD = 0x00000010;

// I2C clock rates
pub const I2C_CLOCK_FAST_MODE: DWORD = 400000;

#[repr(C)]
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub ClockRate: DWORD,
    pub LatencyTimer: UCHAR,
    pub Options: DWORD,
    pub Pin: DWORD,
    pub currentPinState: USHORT,
}

#[link(name = "libmpsse")]
extern "C" {
    pub fn I2C_GetNumChannels(numChannels: *mut DWORD) -> FT_STATUS;

    pub fn I2C_OpenChannel(index: DWORD, handle: *mut FT_HANDLE) -> FT_STATUS;

    pub fn I2C_InitChannel(handle: FT_HANDLE, config: *mut ChannelConfig) -> FT_STATUS;

    pub fn I2C_CloseChannel(handle: FT_HANDLE) -> FT_STATUS;

    pub fn I2C_DeviceRead(
        handle: FT_HANDLE,
        deviceAddress: UCHAR,
        sizeToTransfer: DWORD,
        buffer: *mut UCHAR,
        sizeTransfered: *mut DWORD,
        options: DWORD,
    ) -> FT_STATUS;

    pub fn I2C_DeviceWrite(
        handle: FT_HANDLE,
        deviceAddress: UCHAR,
        sizeToTransfer: DWORD,
        buffer: *const UCHAR,
        sizeTransfered: *mut DWORD,
        options: DWORD,
    ) -> FT_STATUS;
}

fn status_to_string(status: FT_STATUS) -> &'static str {
    match status {
        FT_OK => "FT_OK",
        FT_INVALID_HANDLE => "FT_INVALID_HANDLE",
        FT_DEVICE_NOT_FOUND => "FT_DEVICE_NOT_FOUND",
        FT_DEVICE_NOT_OPENED => "FT_DEVICE_NOT_OPENED",
        FT_IO_ERROR => "FT_IO_ERROR",
        FT_INSUFFICIENT_RESOURCES => "FT_INSUFFICIENT_RESOURCES",
        FT_INVALID_PARAMETER => "FT_INVALID_PARAMETER",
        FT_INVALID_ARGS => "FT_INVALID_ARGS",
        FT_NOT_SUPPORTED => "FT_NOT_SUPPORTED",
        FT_OTHER_ERROR => "FT_OTHER_ERROR",
        _ => "UNKNOWN_ERROR",
    }
}

/// Map a driver status to `Ok(())` or an `FtdiError`
pub fn check(status: FT_STATUS) -> Result<()> {
    if status == FT_OK {
        Ok(())
    } else {
        Err(MonitorError::FtdiError {
            status,
            description: status_to_string(status).to_string(),
        })
    }
}
