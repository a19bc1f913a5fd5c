// IMU driver module
//
// Drivers here never own the hardware directly. The SPI device, the
// data-ready line and the clock are injected, so a host binary can back them
// with real peripherals and tests can back them with fakes.
//
// Each driver keeps a snapshot of the latest sample which is replaced as a
// whole on every successful read.

use core::fmt::{self, Debug};
use core::time::Duration;

use hal::Vector3d;

use crate::error::ImuError;

pub mod adis16460;

pub use self::adis16460::{Adis16460, Adis16460Config};

/// Common interface for SPI device operations with async support
///
/// One call to `write` or `read` is one chip-select framed transfer.
#[allow(async_fn_in_trait)]
pub trait SpiDevice {
    type Error: Debug;

    /// Clock out `data`, discarding whatever comes back
    async fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Clock in `data.len()` bytes, returning how many actually arrived
    async fn read(&mut self, data: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write one byte of a register, as a 16-bit write frame
    async fn write_register(&mut self, addr: u8, value: u8) -> Result<(), ImuError<Self::Error>> {
        self.write(&[0x80 | addr, value]).await.map_err(ImuError::Io)
    }

    /// Read a 16-bit register
    ///
    /// The request frame is answered on the following frame, so this costs
    /// two transfers.
    async fn read_register(&mut self, addr: u8) -> Result<u16, ImuError<Self::Error>> {
        self.write(&[addr & 0x7F, 0x00]).await.map_err(ImuError::Io)?;

        let mut frame = [0u8; 2];
        let received = self.read(&mut frame).await.map_err(ImuError::Io)?;
        if received < frame.len() {
            return Err(ImuError::IncompleteFrame(received));
        }

        Ok(u16::from_be_bytes(frame))
    }
}

/// Data-ready input line, armed for rising edges
#[allow(async_fn_in_trait)]
pub trait DataReady {
    type Error: Debug;

    /// Wait for a rising edge latched since the previous call
    ///
    /// Returns `false` when `timeout` elapses first.
    async fn wait_for_edge(&mut self, timeout: Duration) -> Result<bool, Self::Error>;

    /// Check for a latched edge without blocking, consuming it if present
    fn edge_pending(&mut self) -> Result<bool, Self::Error>;
}

/// Source of sample timestamps
pub trait Clock {
    /// Nanoseconds since the Unix epoch, never decreasing
    fn now_ns(&self) -> u64;
}

/// Where the driver is in its read cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleState {
    /// Idle, waiting for the device to latch a new sample
    WaitingForSample,
    /// Data-ready seen, register block not read yet
    SampleReady,
    /// Register block being read and converted
    Decoding,
}

/// Decoded DIAG_STAT register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagStat(pub u16);

impl DiagStat {
    pub const DATA_PATH_OVERRUN: u16 = 1 << 1;
    pub const FLASH_UPDATE_FAILURE: u16 = 1 << 2;
    pub const SPI_COMM_FAILURE: u16 = 1 << 3;
    pub const SENSOR_OVERRANGE: u16 = 1 << 4;
    pub const SELF_TEST_FAILURE: u16 = 1 << 5;
    pub const FLASH_TEST_FAILURE: u16 = 1 << 6;
    pub const CLOCK_ERROR: u16 = 1 << 7;

    pub fn is_clear(&self) -> bool {
        self.0 & 0x00FE == 0
    }

    pub fn data_path_overrun(&self) -> bool {
        self.0 & Self::DATA_PATH_OVERRUN != 0
    }

    pub fn flash_update_failure(&self) -> bool {
        self.0 & Self::FLASH_UPDATE_FAILURE != 0
    }

    pub fn spi_comm_failure(&self) -> bool {
        self.0 & Self::SPI_COMM_FAILURE != 0
    }

    pub fn sensor_overrange(&self) -> bool {
        self.0 & Self::SENSOR_OVERRANGE != 0
    }

    pub fn self_test_failure(&self) -> bool {
        self.0 & Self::SELF_TEST_FAILURE != 0
    }

    pub fn flash_test_failure(&self) -> bool {
        self.0 & Self::FLASH_TEST_FAILURE != 0
    }

    pub fn clock_error(&self) -> bool {
        self.0 & Self::CLOCK_ERROR != 0
    }
}

impl fmt::Display for DiagStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// One coherent IMU sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Angular rate in degrees per second
    pub gyro: Vector3d,
    /// Linear acceleration in m/s²
    pub accel: Vector3d,
    /// Internal temperature in Celsius
    pub temperature: f32,
    /// Time the block was read, nanoseconds since the Unix epoch
    pub timestamp_ns: u64,
    /// Diagnostic flags latched with this sample
    pub diag: DiagStat,
}

impl Default for ImuSample {
    fn default() -> Self {
        Self {
            gyro: Vector3d::zeros(),
            accel: Vector3d::zeros(),
            temperature: 0.0,
            timestamp_ns: 0,
            diag: DiagStat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diag_stat_flags() {
        assert!(DiagStat(0).is_clear());
        assert!(DiagStat(0x0001).is_clear(), "bit 0 is reserved");

        let cases: [(u16, fn(&DiagStat) -> bool); 7] = [
            (DiagStat::DATA_PATH_OVERRUN, DiagStat::data_path_overrun),
            (DiagStat::FLASH_UPDATE_FAILURE, DiagStat::flash_update_failure),
            (DiagStat::SPI_COMM_FAILURE, DiagStat::spi_comm_failure),
            (DiagStat::SENSOR_OVERRANGE, DiagStat::sensor_overrange),
            (DiagStat::SELF_TEST_FAILURE, DiagStat::self_test_failure),
            (DiagStat::FLASH_TEST_FAILURE, DiagStat::flash_test_failure),
            (DiagStat::CLOCK_ERROR, DiagStat::clock_error),
        ];
        for (bit, flag) in cases {
            let diag = DiagStat(bit);
            assert!(flag(&diag), "flag for bit {:#06x} not decoded", bit);
            assert!(!diag.is_clear());
            assert!(!flag(&DiagStat(!bit & 0x00FE)), "flag for bit {:#06x} leaks", bit);
        }
    }
}
