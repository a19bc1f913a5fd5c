use core::f32::consts::PI;
use core::time::Duration;

use hal::{Imu6Dof, ImuStatus, Vector3d};

use crate::error::{ConfigError, ImuError, ImuResult};
use crate::imu::{Clock, DataReady, DiagStat, ImuSample, SampleState, SpiDevice};

// Register addresses (lower byte of each 16-bit register)
pub const ADIS16460_REG_DIAG_STAT: u8 = 0x02;
pub const ADIS16460_REG_X_GYRO_LOW: u8 = 0x04;
pub const ADIS16460_REG_X_GYRO_OUT: u8 = 0x06;
pub const ADIS16460_REG_Y_GYRO_LOW: u8 = 0x08;
pub const ADIS16460_REG_Y_GYRO_OUT: u8 = 0x0A;
pub const ADIS16460_REG_Z_GYRO_LOW: u8 = 0x0C;
pub const ADIS16460_REG_Z_GYRO_OUT: u8 = 0x0E;
pub const ADIS16460_REG_X_ACCL_LOW: u8 = 0x10;
pub const ADIS16460_REG_X_ACCL_OUT: u8 = 0x12;
pub const ADIS16460_REG_Y_ACCL_LOW: u8 = 0x14;
pub const ADIS16460_REG_Y_ACCL_OUT: u8 = 0x16;
pub const ADIS16460_REG_Z_ACCL_LOW: u8 = 0x18;
pub const ADIS16460_REG_Z_ACCL_OUT: u8 = 0x1A;
pub const ADIS16460_REG_TEMP_OUT: u8 = 0x1E;
pub const ADIS16460_REG_DEC_RATE: u8 = 0x36;
pub const ADIS16460_REG_FILT_CTRL: u8 = 0x38;
pub const ADIS16460_REG_PROD_ID: u8 = 0x56;

// Product ID for verification
pub const ADIS16460_PROD_ID: u16 = 0x404C;

// Internal sample clock, divided down by DEC_RATE + 1
pub const ADIS16460_BASE_SAMPLE_RATE_HZ: f32 = 2048.0;
pub const ADIS16460_MAX_DEC_RATE: u16 = 2047;
pub const ADIS16460_MIN_SAMPLE_RATE_HZ: f32 = 1.0;

// Bartlett window FIR filter
pub const ADIS16460_MAX_FILTER_TAPS: u8 = 7;
pub const ADIS16460_DEFAULT_FILTER_TAPS: u8 = 4;

// SPI bus settings
pub const ADIS16460_SPI_CLOCK_HZ: u32 = 1_000_000;
pub const ADIS16460_MAX_SPI_CLOCK_HZ: u32 = 2_000_000;

// Scale factors, per LSB of the 16-bit OUT register
pub const ADIS16460_GYRO_SCALE_DPS: f64 = 0.005;
pub const ADIS16460_ACCEL_SCALE_MG: f64 = 0.25;
pub const ADIS16460_TEMP_SCALE_C: f32 = 0.05;
pub const ADIS16460_TEMP_OFFSET_C: f32 = 25.0;

pub const STANDARD_GRAVITY: f64 = 9.80665;

const LOW_WORD_SCALE: f64 = 65536.0;

/// Configuration for ADIS16460 sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adis16460Config {
    /// Requested output rate in Hz, rounded down to 2048 / n
    pub sample_rate_hz: f32,

    /// Number of Bartlett FIR filter taps (0..=7)
    pub filter_taps: u8,

    /// Longest wait for a data-ready edge in `update`
    pub ready_timeout: Duration,

    /// Log raw and decoded values for every sample
    pub debug: bool,
}

impl Default for Adis16460Config {
    fn default() -> Self {
        Self {
            sample_rate_hz: ADIS16460_BASE_SAMPLE_RATE_HZ,
            filter_taps: ADIS16460_DEFAULT_FILTER_TAPS,
            ready_timeout: Duration::from_secs(1),
            debug: false,
        }
    }
}

impl Adis16460Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.sample_rate_hz;
        if !(ADIS16460_MIN_SAMPLE_RATE_HZ..=ADIS16460_BASE_SAMPLE_RATE_HZ).contains(&rate) {
            return Err(ConfigError::SampleRateOutOfRange(rate));
        }
        if self.filter_taps > ADIS16460_MAX_FILTER_TAPS {
            return Err(ConfigError::FilterTapsOutOfRange(self.filter_taps));
        }
        Ok(())
    }
}

/// DEC_RATE value for a requested sample rate
///
/// The device only divides its 2048 Hz clock by integers, so the rate is
/// rounded down to the nearest 2048 / n.
pub fn decimation(sample_rate_hz: f32) -> u16 {
    let divisor = (ADIS16460_BASE_SAMPLE_RATE_HZ / sample_rate_hz) as i32;
    (divisor - 1).clamp(0, ADIS16460_MAX_DEC_RATE as i32) as u16
}

/// Output rate produced by a DEC_RATE value
pub fn effective_sample_rate(decimation: u16) -> f32 {
    ADIS16460_BASE_SAMPLE_RATE_HZ / (decimation as f32 + 1.0)
}

/// Join an OUT/LOW register pair into the 32-bit two's complement reading
pub fn combine(out: u16, low: u16) -> i32 {
    (((out as u32) << 16) | low as u32) as i32
}

pub fn gyro_dps(raw: i32) -> f32 {
    (raw as f64 * ADIS16460_GYRO_SCALE_DPS / LOW_WORD_SCALE) as f32
}

pub fn accel_mps2(raw: i32) -> f32 {
    (raw as f64 * ADIS16460_ACCEL_SCALE_MG / LOW_WORD_SCALE * STANDARD_GRAVITY / 1000.0) as f32
}

pub fn temperature_c(raw: u16) -> f32 {
    (raw as i16) as f32 * ADIS16460_TEMP_SCALE_C + ADIS16460_TEMP_OFFSET_C
}

/// Register block exactly as read from the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawBlock {
    pub diag: DiagStat,
    pub gyro: [i32; 3],
    pub accel: [i32; 3],
    pub temperature: u16,
}

impl RawBlock {
    pub fn decode(&self, timestamp_ns: u64) -> ImuSample {
        ImuSample {
            gyro: Vector3d::new(
                gyro_dps(self.gyro[0]),
                gyro_dps(self.gyro[1]),
                gyro_dps(self.gyro[2]),
            ),
            accel: Vector3d::new(
                accel_mps2(self.accel[0]),
                accel_mps2(self.accel[1]),
                accel_mps2(self.accel[2]),
            ),
            temperature: temperature_c(self.temperature),
            timestamp_ns,
            diag: self.diag,
        }
    }
}

// (OUT, LOW) register pairs in x, y, z order
const GYRO_REGS: [(u8, u8); 3] = [
    (ADIS16460_REG_X_GYRO_OUT, ADIS16460_REG_X_GYRO_LOW),
    (ADIS16460_REG_Y_GYRO_OUT, ADIS16460_REG_Y_GYRO_LOW),
    (ADIS16460_REG_Z_GYRO_OUT, ADIS16460_REG_Z_GYRO_LOW),
];

const ACCEL_REGS: [(u8, u8); 3] = [
    (ADIS16460_REG_X_ACCL_OUT, ADIS16460_REG_X_ACCL_LOW),
    (ADIS16460_REG_Y_ACCL_OUT, ADIS16460_REG_Y_ACCL_LOW),
    (ADIS16460_REG_Z_ACCL_OUT, ADIS16460_REG_Z_ACCL_LOW),
];

/// ADIS16460 sensor handle
///
/// Owns the SPI device and data-ready line for its whole life. The sample
/// snapshot has a single writer, `update`, which replaces it whole or not at
/// all.
pub struct Adis16460<S, P, C> {
    spi: S,
    data_ready: P,
    clock: C,
    config: Adis16460Config,
    decimation: u16,
    state: SampleState,
    sample: ImuSample,
    start_time_ns: u64,
    last_time_ns: u64,
    samples_read: u64,
}

impl<S, P, C> Adis16460<S, P, C>
where
    S: SpiDevice,
    P: DataReady<Error = S::Error>,
    C: Clock,
{
    /// Bring up the device: check its identity, program the output rate and
    /// filter, and record the start time.
    pub async fn new(
        mut spi: S,
        data_ready: P,
        clock: C,
        config: Adis16460Config,
    ) -> ImuResult<Self, S::Error> {
        config.validate()?;

        let prod_id = spi
            .read_register(ADIS16460_REG_PROD_ID)
            .await
            .map_err(unavailable)?;
        if prod_id != ADIS16460_PROD_ID {
            return Err(ImuError::UnknownDevice(prod_id));
        }

        let decimation = decimation(config.sample_rate_hz);
        let [dec_high, dec_low] = decimation.to_be_bytes();
        spi.write_register(ADIS16460_REG_DEC_RATE, dec_low)
            .await
            .map_err(unavailable)?;
        spi.write_register(ADIS16460_REG_DEC_RATE + 1, dec_high)
            .await
            .map_err(unavailable)?;
        spi.write_register(ADIS16460_REG_FILT_CTRL, config.filter_taps)
            .await
            .map_err(unavailable)?;

        if config.debug {
            log::debug!(
                "ADIS16460 product id {:#06x}, DEC_RATE {}, {:.2} Hz, {} filter taps",
                prod_id,
                decimation,
                effective_sample_rate(decimation),
                config.filter_taps
            );
        }

        let start_time_ns = clock.now_ns();

        Ok(Self {
            spi,
            data_ready,
            clock,
            config,
            decimation,
            state: SampleState::WaitingForSample,
            sample: ImuSample::default(),
            start_time_ns,
            last_time_ns: start_time_ns,
            samples_read: 0,
        })
    }

    /// Block until the device latches a new sample, then read it
    ///
    /// Fails with `Timeout` when no data-ready edge arrives within the
    /// configured bound. On any failure the previous sample is kept.
    pub async fn update(&mut self) -> ImuResult<(), S::Error> {
        self.state = SampleState::WaitingForSample;

        let ready = self
            .data_ready
            .wait_for_edge(self.config.ready_timeout)
            .await
            .map_err(ImuError::Io)?;
        if !ready {
            return Err(ImuError::Timeout(self.config.ready_timeout));
        }

        self.state = SampleState::SampleReady;
        self.read().await
    }

    /// Read a sample only if data-ready fired since the last read
    ///
    /// Returns `false` without touching the bus when nothing is pending.
    pub async fn try_update(&mut self) -> ImuResult<bool, S::Error> {
        if !self.data_ready.edge_pending().map_err(ImuError::Io)? {
            return Ok(false);
        }

        self.state = SampleState::SampleReady;
        self.read().await?;
        Ok(true)
    }

    async fn read(&mut self) -> ImuResult<(), S::Error> {
        self.state = SampleState::Decoding;
        let block = self.read_block().await;
        self.state = SampleState::WaitingForSample;
        let block = block?;

        if block.diag.spi_comm_failure() {
            return Err(ImuError::Malformed(block.diag));
        }
        if !block.diag.is_clear() {
            log::warn!("ADIS16460 DIAG_STAT {}", block.diag);
        }

        // Strictly after the previous sample, even if the clock stalls
        let timestamp_ns = self.clock.now_ns().max(self.last_time_ns.saturating_add(1));
        let sample = block.decode(timestamp_ns);

        if self.config.debug {
            log::debug!(
                "raw gyro {:?} accel {:?} temp {:#06x}",
                block.gyro,
                block.accel,
                block.temperature
            );
            log::debug!(
                "gyro x {:.3} y {:.3} z {:.3} deg/s, accel x {:.3} y {:.3} z {:.3} m/s², temp {:.2} C",
                sample.gyro.x,
                sample.gyro.y,
                sample.gyro.z,
                sample.accel.x,
                sample.accel.y,
                sample.accel.z,
                sample.temperature
            );
        }

        self.sample = sample;
        self.last_time_ns = timestamp_ns;
        self.samples_read += 1;
        Ok(())
    }

    async fn read_block(&mut self) -> ImuResult<RawBlock, S::Error> {
        let mut block = RawBlock {
            diag: DiagStat(self.spi.read_register(ADIS16460_REG_DIAG_STAT).await?),
            ..RawBlock::default()
        };

        for (axis, (out, low)) in GYRO_REGS.iter().enumerate() {
            block.gyro[axis] = self.read_pair(*out, *low).await?;
        }
        for (axis, (out, low)) in ACCEL_REGS.iter().enumerate() {
            block.accel[axis] = self.read_pair(*out, *low).await?;
        }
        block.temperature = self.spi.read_register(ADIS16460_REG_TEMP_OUT).await?;

        Ok(block)
    }

    async fn read_pair(&mut self, out: u8, low: u8) -> ImuResult<i32, S::Error> {
        let out = self.spi.read_register(out).await?;
        let low = self.spi.read_register(low).await?;
        Ok(combine(out, low))
    }

    /// Latest decoded sample
    pub fn sample(&self) -> &ImuSample {
        &self.sample
    }

    pub fn start_time(&self) -> u64 {
        self.start_time_ns
    }

    /// Time of the most recent successful read; equals `start_time` before the first one
    pub fn last_time(&self) -> u64 {
        self.last_time_ns
    }

    pub fn state(&self) -> SampleState {
        self.state
    }

    pub fn config(&self) -> &Adis16460Config {
        &self.config
    }

    pub fn decimation(&self) -> u16 {
        self.decimation
    }

    pub fn effective_sample_rate(&self) -> f32 {
        effective_sample_rate(self.decimation)
    }

    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }

    /// Give back the bus resources
    pub fn release(self) -> (S, P, C) {
        (self.spi, self.data_ready, self.clock)
    }
}

impl<S, P, C> Imu6Dof for Adis16460<S, P, C>
where
    S: SpiDevice,
    P: DataReady<Error = S::Error>,
    C: Clock,
{
    fn read_accelerometer(&self) -> Vector3d {
        self.sample.accel
    }

    fn read_gyroscope(&self) -> Vector3d {
        self.sample.gyro * (PI / 180.0)
    }

    fn read_temperature(&self) -> f32 {
        self.sample.temperature
    }

    fn status(&self) -> ImuStatus {
        ImuStatus {
            healthy: self.samples_read > 0 && self.sample.diag.is_clear(),
            temperature: self.sample.temperature,
            sample_rate: self.effective_sample_rate(),
            last_reading_ns: self.last_time_ns,
            samples: self.samples_read,
        }
    }
}

// Bus failures while bringing the device up mean it cannot be reached
fn unavailable<E: core::fmt::Debug>(err: ImuError<E>) -> ImuError<E> {
    match err {
        ImuError::Io(e) => ImuError::ResourceUnavailable(e),
        other => other,
    }
}
