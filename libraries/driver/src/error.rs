use core::fmt::Debug;
use core::time::Duration;

use thiserror::Error;

use crate::imu::DiagStat;

/// Errors raised by the IMU driver
///
/// `E` is the error type of the injected SPI device and data-ready pin.
#[derive(Error, Debug)]
pub enum ImuError<E: Debug> {
    /// The bus could not be reached while bringing the device up
    #[error("Device unreachable: {0:?}")]
    ResourceUnavailable(E),

    /// Something answered on the bus, but it is not the expected part
    #[error("Unexpected product id {0:#06x}")]
    UnknownDevice(u16),

    /// Rejected configuration, nothing was written to the device
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// An SPI transfer or data-ready poll failed during a read
    #[error("SPI transaction failed: {0:?}")]
    Io(E),

    /// The bus returned fewer bytes than one 16-bit frame
    #[error("Incomplete frame: got {0} of 2 bytes")]
    IncompleteFrame(usize),

    /// The device flagged the sample as corrupt
    #[error("Malformed sample block, DIAG_STAT {0}")]
    Malformed(DiagStat),

    /// No data-ready edge arrived in time
    #[error("No data-ready edge within {0:?}")]
    Timeout(Duration),
}

/// Coarse error classes callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bus, daemon or device not accessible
    ResourceUnavailable,
    /// Invalid sample rate, pin or other setting
    Configuration,
    /// Transaction failure or malformed data while reading
    Io,
}

impl<E: Debug> ImuError<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImuError::ResourceUnavailable(_) | ImuError::UnknownDevice(_) => {
                ErrorKind::ResourceUnavailable
            }
            ImuError::Configuration(_) => ErrorKind::Configuration,
            ImuError::Io(_)
            | ImuError::IncompleteFrame(_)
            | ImuError::Malformed(_)
            | ImuError::Timeout(_) => ErrorKind::Io,
        }
    }
}

/// Configuration rejected before touching the hardware
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("sample rate {0} Hz outside 1..=2048 Hz")]
    SampleRateOutOfRange(f32),

    #[error("filter taps {0} outside 0..=7")]
    FilterTapsOutOfRange(u8),

    #[error("GPIO pin {0} is not a usable data-ready line")]
    InvalidPin(u8),

    #[error("SPI clock {0} Hz above the device maximum")]
    SpiClockOutOfRange(u32),
}

/// Type alias for Result with ImuError
pub type ImuResult<T, E> = Result<T, ImuError<E>>;
