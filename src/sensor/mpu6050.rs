//! MPU-6050 gyroscope over I2C

use super::GyroReading;

/// Default I2C address (AD0 low)
pub const DEFAULT_ADDRESS: u16 = 0x68;

/// Power management register; writing 0 wakes the device
pub const PWR_MGMT_1: u8 = 0x6B;

/// First of six gyro output registers (X high byte)
pub const GYRO_XOUT_H: u8 = 0x43;

/// LSB per °/s at the power-on full scale of ±250 °/s
pub const GYRO_SCALE: f64 = 131.0;

impl GyroReading {
    /// Decode the six gyro output registers
    ///
    /// Each axis is a big-endian two's complement word.
    #[must_use]
    pub fn from_registers(raw: &[u8; 6]) -> Self {
        let axis = |hi: u8, lo: u8| f64::from(i16::from_be_bytes([hi, lo])) / GYRO_SCALE;
        Self {
            x: axis(raw[0], raw[1]),
            y: axis(raw[2], raw[3]),
            z: axis(raw[4], raw[5]),
        }
    }
}

#[cfg(feature = "rpi")]
pub use device::Mpu6050;

#[cfg(feature = "rpi")]
mod device {
    use rppal::i2c::I2c;

    use super::{GYRO_XOUT_H, PWR_MGMT_1};
    use crate::sensor::{GyroReading, GyroSource};
    use crate::{Error, Result};

    /// MPU-6050 on a Linux I2C bus
    pub struct Mpu6050 {
        i2c: I2c,
    }

    impl Mpu6050 {
        /// Open the device and wake it from sleep
        ///
        /// # Errors
        ///
        /// Returns error if the bus cannot be opened or the device does not respond
        pub fn new(bus: u8, address: u16) -> Result<Self> {
            let mut i2c = I2c::with_bus(bus).map_err(|e| Error::Sensor(e.to_string()))?;
            i2c.set_slave_address(address)
                .map_err(|e| Error::Sensor(e.to_string()))?;
            i2c.smbus_write_byte(PWR_MGMT_1, 0)
                .map_err(|e| Error::Sensor(format!("failed to wake MPU-6050: {e}")))?;

            tracing::debug!(bus, address = format_args!("{address:#04x}"), "MPU-6050 initialized");

            Ok(Self { i2c })
        }
    }

    impl GyroSource for Mpu6050 {
        fn read_gyro(&mut self) -> Result<GyroReading> {
            let mut raw = [0u8; 6];
            self.i2c
                .block_read(GYRO_XOUT_H, &mut raw)
                .map_err(|e| Error::Sensor(e.to_string()))?;
            Ok(GyroReading::from_registers(&raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_positive_and_negative_words() {
        // +131 (1 °/s), -131 (-1 °/s), 0
        let raw = [0x00, 0x83, 0xFF, 0x7D, 0x00, 0x00];
        let reading = GyroReading::from_registers(&raw);

        assert!((reading.x - 1.0).abs() < 1e-9);
        assert!((reading.y + 1.0).abs() < 1e-9);
        assert!(reading.z.abs() < f64::EPSILON);
    }

    #[test]
    fn test_decode_extremes() {
        let raw = [0x7F, 0xFF, 0x80, 0x00, 0x80, 0x01];
        let reading = GyroReading::from_registers(&raw);

        assert!((reading.x - 32767.0 / GYRO_SCALE).abs() < 1e-9);
        assert!((reading.y + 32768.0 / GYRO_SCALE).abs() < 1e-9);
        assert!((reading.z + 32767.0 / GYRO_SCALE).abs() < 1e-9);
    }

    #[test]
    fn test_full_scale_shake_exceeds_default_peak() {
        // ~±250 °/s on two axes is a firm shake
        let raw = [0x7F, 0xFF, 0x80, 0x00, 0x00, 0x00];
        assert!(GyroReading::from_registers(&raw).magnitude() > 250.0);
    }
}
