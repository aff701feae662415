//! Gyroscope input
//!
//! The detector consumes a scalar; this module turns 3-axis angular rate
//! readings into that scalar.

pub mod mpu6050;

#[cfg(feature = "rpi")]
pub use mpu6050::Mpu6050;

use crate::{Error, Result};

/// Angular rate on three axes, in degrees per second
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GyroReading {
    /// Rotation about X
    pub x: f64,
    /// Rotation about Y
    pub y: f64,
    /// Rotation about Z
    pub z: f64,
}

impl GyroReading {
    /// Create a reading
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of the three axes
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.z.mul_add(self.z, self.x.mul_add(self.x, self.y * self.y)).sqrt()
    }
}

/// Something that can be polled for a gyro reading
pub trait GyroSource {
    /// Read the current angular rate
    ///
    /// # Errors
    ///
    /// Returns error if the sensor cannot be read
    fn read_gyro(&mut self) -> Result<GyroReading>;
}

impl<T: GyroSource + ?Sized> GyroSource for Box<T> {
    fn read_gyro(&mut self) -> Result<GyroReading> {
        (**self).read_gyro()
    }
}

/// Stand-in for a missing sensor; every read fails
///
/// Used when only the push button triggers the action.
#[derive(Debug, Default)]
pub struct NoSensor;

impl GyroSource for NoSensor {
    fn read_gyro(&mut self) -> Result<GyroReading> {
        Err(Error::Sensor("no gyro sensor attached".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        assert!((GyroReading::new(3.0, 4.0, 0.0).magnitude() - 5.0).abs() < 1e-9);
        assert!((GyroReading::new(-2.0, 3.0, 6.0).magnitude() - 7.0).abs() < 1e-9);
        assert!(GyroReading::default().magnitude().abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_sensor_always_fails() {
        assert!(matches!(NoSensor.read_gyro(), Err(Error::Sensor(_))));
    }
}
