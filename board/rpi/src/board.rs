use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use driver::{Adis16460, Clock, DataReady, SpiDevice};
use embassy_futures::block_on;
use rppal::gpio::{Gpio, InputPin, Trigger};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::config::{AppConfig, SpiConfig};
use crate::error::{BoardError, HwError};

pub type RpiImu = Adis16460<RpiSpi, RpiDataReady, MonotonicClock>;

/// Raspberry Pi running the ADIS16460 over spidev and the GPIO character device
pub struct RaspberryPiBoard;

impl RaspberryPiBoard {
    pub fn name(&self) -> &str {
        "Raspberry Pi"
    }

    /// Open the SPI channel and data-ready line and bring the IMU up
    pub fn open_imu(&self, config: &AppConfig) -> Result<RpiImu, BoardError> {
        config.validate()?;

        let spi = RpiSpi::open(&config.spi)?;
        let gpio = Gpio::new().map_err(HwError::from)?;
        let data_ready = RpiDataReady::open(&gpio, config.imu.data_ready_pin)?;

        let imu = block_on(Adis16460::new(
            spi,
            data_ready,
            MonotonicClock::new(),
            config.driver_config(),
        ))?;

        log::info!(
            "ADIS16460 on {} SPI{}.{} at {} Hz, DR on GPIO{}, {:.2} Hz output",
            self.name(),
            config.spi.bus,
            config.spi.slave_select,
            config.spi.clock_hz,
            config.imu.data_ready_pin,
            imu.effective_sample_rate()
        );

        Ok(imu)
    }
}

/// SPI device backed by rppal, one chip-select framed transfer per call
pub struct RpiSpi {
    spi: Spi,
}

impl RpiSpi {
    pub fn open(config: &SpiConfig) -> Result<Self, BoardError> {
        let (bus, slave_select) = channel(config.bus, config.slave_select)?;
        // ADIS16460 samples on the rising edge with the clock idling high
        let spi = Spi::new(bus, slave_select, config.clock_hz, Mode::Mode3)
            .map_err(HwError::from)?;
        Ok(Self { spi })
    }
}

impl SpiDevice for RpiSpi {
    type Error = HwError;

    async fn write(&mut self, data: &[u8]) -> Result<(), HwError> {
        self.spi.write(data)?;
        Ok(())
    }

    async fn read(&mut self, data: &mut [u8]) -> Result<usize, HwError> {
        Ok(self.spi.read(data)?)
    }
}

fn channel(bus: u8, slave_select: u8) -> Result<(Bus, SlaveSelect), BoardError> {
    let invalid = || BoardError::InvalidSpiChannel { bus, slave_select };

    let bus = match bus {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        _ => return Err(invalid()),
    };
    let slave_select = match slave_select {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        _ => return Err(invalid()),
    };

    Ok((bus, slave_select))
}

/// Data-ready input armed for rising-edge interrupts
///
/// Edges are queued by the kernel between polls, so an edge that fires while
/// a block is being read is still seen by the next wait.
pub struct RpiDataReady {
    pin: InputPin,
}

impl RpiDataReady {
    pub fn open(gpio: &Gpio, pin: u8) -> Result<Self, BoardError> {
        let mut pin = gpio.get(pin).map_err(HwError::from)?.into_input();
        pin.set_interrupt(Trigger::RisingEdge, None)
            .map_err(HwError::from)?;
        Ok(Self { pin })
    }
}

impl DataReady for RpiDataReady {
    type Error = HwError;

    async fn wait_for_edge(&mut self, timeout: Duration) -> Result<bool, HwError> {
        Ok(self.pin.poll_interrupt(false, Some(timeout))?.is_some())
    }

    fn edge_pending(&mut self) -> Result<bool, HwError> {
        Ok(self.pin.poll_interrupt(false, Some(Duration::ZERO))?.is_some())
    }
}

/// Wall-clock anchored monotonic time
///
/// Reads as nanoseconds since the Unix epoch but advances with `Instant`, so
/// NTP steps never move timestamps backwards.
pub struct MonotonicClock {
    epoch_ns: u64,
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let epoch_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            epoch_ns,
            anchor: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        self.epoch_ns + self.anchor.elapsed().as_nanos() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_tracks_epoch() {
        let clock = MonotonicClock::new();
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64;

        let first = clock.now_ns();
        let second = clock.now_ns();
        assert!(second >= first);
        assert!(first.abs_diff(wall) < Duration::from_secs(1).as_nanos() as u64);
    }

    #[test]
    fn test_spi_channel_mapping() {
        assert!(matches!(channel(0, 0), Ok((Bus::Spi0, SlaveSelect::Ss0))));
        assert!(matches!(channel(1, 2), Ok((Bus::Spi1, SlaveSelect::Ss2))));
        assert!(matches!(
            channel(7, 0),
            Err(BoardError::InvalidSpiChannel { bus: 7, slave_select: 0 })
        ));
        assert!(matches!(
            channel(0, 3),
            Err(BoardError::InvalidSpiChannel { bus: 0, slave_select: 3 })
        ));
    }
}
