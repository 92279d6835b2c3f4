//! MPU6050 accelerometer over an FT232H I2C bridge (libMPSSE)
//!
//! Configured as the instrument expects: ±4 g accelerometer range, ±500 °/s
//! gyroscope, 21 Hz digital low-pass filter.

use std::ptr;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{MonitorError, Result};
use crate::ffi::*;
use crate::sensor::{Accelerometer, MotionReading};

const MPU6050_ADDRESS: u8 = 0x68;

// Register addresses
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;

const WHO_AM_I_VALUE: u8 = 0x68;

// Configuration values
const DLPF_21_HZ: u8 = 0x04;
const GYRO_RANGE_500_DPS: u8 = 0x08;
const ACCEL_RANGE_4_G: u8 = 0x08;

/// LSB per g at ±4 g
const ACCEL_SCALE: f64 = 8192.0;

/// Accel (6) + temperature (2) + gyro (6)
const BURST_LEN: usize = 14;

/// Convert a 14-byte burst starting at ACCEL_XOUT_H into physical units
pub fn decode_burst(data: &[u8; BURST_LEN]) -> MotionReading {
    let word = |i: usize| i16::from_be_bytes([data[i], data[i + 1]]) as f64;

    MotionReading::new(
        [word(0) / ACCEL_SCALE, word(2) / ACCEL_SCALE, word(4) / ACCEL_SCALE],
        word(6) / 340.0 + 36.53,
    )
}

/// MPU6050 sensor interface
pub struct Mpu6050 {
    handle: FT_HANDLE,
    address: u8,
}

impl Mpu6050 {
    /// Open an I2C channel and initialize the sensor
    ///
    /// Any failure here is fatal for the instrument; there is no retry.
    pub fn new(channel_index: u32) -> Result<Self> {
        let mut num_channels: DWORD = 0;
        check(unsafe { I2C_GetNumChannels(&mut num_channels) })?;

        if num_channels == 0 {
            return Err(MonitorError::NoChannelsFound);
        }

        if channel_index >= num_channels {
            return Err(MonitorError::InvalidChannel(channel_index));
        }

        let mut handle: FT_HANDLE = ptr::null_mut();
        check(unsafe { I2C_OpenChannel(channel_index, &mut handle) })?;

        let mut config = ChannelConfig {
            ClockRate: I2C_CLOCK_FAST_MODE,
            LatencyTimer: 1,
            Options: 0,
            Pin: 0,
            currentPinState: 0,
        };

        if let Err(e) = check(unsafe { I2C_InitChannel(handle, &mut config) }) {
            unsafe { I2C_CloseChannel(handle) };
            return Err(e);
        }

        let mut sensor = Mpu6050 {
            handle,
            address: MPU6050_ADDRESS,
        };
        sensor.init()?;

        info!(channel = channel_index, "MPU6050 initialized");
        Ok(sensor)
    }

    fn init(&mut self) -> Result<()> {
        // Clear the sleep bit
        self.write_register(REG_PWR_MGMT_1, 0x00)?;
        std::thread::sleep(Duration::from_millis(100));

        let [who_am_i] = self.read_registers::<1>(REG_WHO_AM_I)?;
        if who_am_i != WHO_AM_I_VALUE {
            return Err(MonitorError::InvalidDeviceId(who_am_i));
        }

        self.write_register(REG_ACCEL_CONFIG, ACCEL_RANGE_4_G)?;
        self.write_register(REG_GYRO_CONFIG, GYRO_RANGE_500_DPS)?;
        self.write_register(REG_CONFIG, DLPF_21_HZ)?;

        debug!("Configured ±4g, ±500°/s, 21 Hz DLPF");
        Ok(())
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
        let buffer = [reg, value];
        let mut transferred: DWORD = 0;

        let options = I2C_TRANSFER_OPTIONS_START_BIT
            | I2C_TRANSFER_OPTIONS_STOP_BIT
            | I2C_TRANSFER_OPTIONS_FAST_TRANSFER_BYTES;

        // With FAST_TRANSFER_BYTES the transferred count is in bits; only the status is meaningful
        check(unsafe {
            I2C_DeviceWrite(
                self.handle,
                self.address,
                buffer.len() as DWORD,
                buffer.as_ptr(),
                &mut transferred,
                options,
            )
        })
    }

    /// Read consecutive registers using a repeated START
    fn read_registers<const N: usize>(&mut self, reg: u8) -> Result<[u8; N]> {
        let reg_buf = [reg];
        let mut transferred: DWORD = 0;

        let options = I2C_TRANSFER_OPTIONS_START_BIT | I2C_TRANSFER_OPTIONS_BREAK_ON_NACK;

        check(unsafe {
            I2C_DeviceWrite(
                self.handle,
                self.address,
                1,
                reg_buf.as_ptr(),
                &mut transferred,
                options,
            )
        })?;
        check_transferred(1, transferred)?;

        // Byte-mode read so the transferred count is in bytes
        let mut data = [0u8; N];
        transferred = 0;

        let options = I2C_TRANSFER_OPTIONS_START_BIT
            | I2C_TRANSFER_OPTIONS_STOP_BIT
            | I2C_TRANSFER_OPTIONS_NACK_LAST_BYTE;

        check(unsafe {
            I2C_DeviceRead(
                self.handle,
                self.address,
                N as DWORD,
                data.as_mut_ptr(),
                &mut transferred,
                options,
            )
        })?;
        check_transferred(N, transferred)?;

        Ok(data)
    }
}

/// A short transfer leaves stale bytes in the buffer
fn check_transferred(expected: usize, transferred: DWORD) -> Result<()> {
    if transferred as usize != expected {
        return Err(MonitorError::TransferError {
            expected: expected as u32,
            actual: transferred,
        });
    }
    Ok(())
}

impl Accelerometer for Mpu6050 {
    fn read(&mut self) -> Result<MotionReading> {
        let burst = self.read_registers::<BURST_LEN>(REG_ACCEL_XOUT_H)?;
        Ok(decode_burst(&burst))
    }
}

impl Drop for Mpu6050 {
    fn drop(&mut self) {
        unsafe {
            I2C_CloseChannel(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_burst_units() {
        let mut data = [0u8; BURST_LEN];
        // +1 g on Z at ±4 g
        data[4..6].copy_from_slice(&8192i16.to_be_bytes());
        // -0.5 g on X
        data[0..2].copy_from_slice(&(-4096i16).to_be_bytes());
        // Raw temperature 0 -> 36.53 °C
        let reading = decode_burst(&data);

        assert_eq!(reading.accel_g, [-0.5, 0.0, 1.0]);
        assert!((reading.temperature_c - 36.53).abs() < 1e-9);
    }

    #[test]
    fn test_short_transfer_is_an_error() {
        assert!(check_transferred(BURST_LEN, BURST_LEN as DWORD).is_ok());

        match check_transferred(BURST_LEN, 9) {
            Err(MonitorError::TransferError { expected, actual }) => {
                assert_eq!(expected, 14);
                assert_eq!(actual, 9);
            }
            other => panic!("expected TransferError, got {:?}", other),
        }
    }
}
