use driver::{ConfigError, ImuError};
use thiserror::Error;

/// Failures of the Raspberry Pi peripherals backing the IMU
#[derive(Error, Debug)]
pub enum HwError {
    #[error(transparent)]
    Spi(#[from] rppal::spi::Error),

    #[error(transparent)]
    Gpio(#[from] rppal::gpio::Error),
}

/// Errors raised while configuring and bringing up the board
#[derive(Error, Debug)]
pub enum BoardError {
    /// SPI bus or GPIO character device could not be opened
    #[error("Hardware unavailable: {0}")]
    ResourceUnavailable(#[from] HwError),

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("SPI bus {bus} with slave select {slave_select} does not exist")]
    InvalidSpiChannel { bus: u8, slave_select: u8 },

    #[error("IMU error: {0}")]
    Imu(#[from] ImuError<HwError>),
}
