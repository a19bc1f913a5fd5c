/// IMU (Inertial Measurement Unit) sensor interface
use crate::types::Vector3d;

/// Six degree-of-freedom IMU: three gyroscope axes and three accelerometer axes
pub trait Imu6Dof {
    /// Get acceleration data (in m/s²)
    fn read_accelerometer(&self) -> Vector3d;

    /// Get gyroscope data (in rad/s)
    fn read_gyroscope(&self) -> Vector3d;

    /// Get the current temperature of the IMU in Celsius
    fn read_temperature(&self) -> f32;

    /// Get detailed information about the IMU status
    fn status(&self) -> ImuStatus;
}

/// IMU sensor status information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuStatus {
    /// Whether the last sample came back without diagnostic flags
    pub healthy: bool,

    /// Temperature of the sensor in Celsius
    pub temperature: f32,

    /// The current sample rate in Hz
    pub sample_rate: f32,

    /// Timestamp of the last successful reading in nanoseconds
    pub last_reading_ns: u64,

    /// Number of samples read since initialization
    pub samples: u64,
}
