//! Configuration for the ADIS16460 Raspberry Pi reader
//!
//! Loaded from a TOML file; every section and field falls back to its
//! default, so an empty file (or no file at all) is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use driver::imu::adis16460::{
    ADIS16460_BASE_SAMPLE_RATE_HZ, ADIS16460_DEFAULT_FILTER_TAPS, ADIS16460_MAX_SPI_CLOCK_HZ,
    ADIS16460_SPI_CLOCK_HZ,
};
use driver::{Adis16460Config, ConfigError};
use serde::{Deserialize, Serialize};

use crate::error::BoardError;

/// Highest BCM line on the 40-pin header
pub const MAX_HEADER_GPIO: u8 = 27;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub imu: ImuConfig,
    pub spi: SpiConfig,
    pub run: RunConfig,
    pub logging: LoggingConfig,
}

/// Sensor settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImuConfig {
    /// Requested output rate in Hz (1..=2048), rounded down to 2048 / n
    pub sample_rate_hz: f32,
    /// BCM number of the GPIO wired to the DR output
    pub data_ready_pin: u8,
    /// Bartlett FIR filter taps (0..=7)
    pub filter_taps: u8,
    /// Longest wait for a data-ready edge before an update fails
    pub ready_timeout_ms: u64,
    /// Log raw and decoded values for every sample
    pub debug: bool,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: ADIS16460_BASE_SAMPLE_RATE_HZ,
            data_ready_pin: 25,
            filter_taps: ADIS16460_DEFAULT_FILTER_TAPS,
            ready_timeout_ms: 1000,
            debug: false,
        }
    }
}

/// SPI channel the device sits on
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpiConfig {
    /// SPI controller, `/dev/spidev<bus>.*`
    pub bus: u8,
    /// Chip-select line, `/dev/spidev*.<slave_select>`
    pub slave_select: u8,
    pub clock_hz: u32,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            bus: 0,
            slave_select: 0,
            clock_hz: ADIS16460_SPI_CLOCK_HZ,
        }
    }
}

/// Read loop settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Stop after this many seconds; zero runs until killed
    pub duration_s: f64,
    /// Log every Nth sample
    pub print_every: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_s: 5.0,
            print_every: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BoardError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| BoardError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, BoardError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.imu.data_ready_pin > MAX_HEADER_GPIO {
            return Err(ConfigError::InvalidPin(self.imu.data_ready_pin).into());
        }
        if self.spi.clock_hz == 0 || self.spi.clock_hz > ADIS16460_MAX_SPI_CLOCK_HZ {
            return Err(ConfigError::SpiClockOutOfRange(self.spi.clock_hz).into());
        }
        if self.spi.bus > 6 || self.spi.slave_select > 2 {
            return Err(BoardError::InvalidSpiChannel {
                bus: self.spi.bus,
                slave_select: self.spi.slave_select,
            });
        }
        self.driver_config().validate()?;
        Ok(())
    }

    pub fn driver_config(&self) -> Adis16460Config {
        Adis16460Config {
            sample_rate_hz: self.imu.sample_rate_hz,
            filter_taps: self.imu.filter_taps,
            ready_timeout: Duration::from_millis(self.imu.ready_timeout_ms),
            debug: self.imu.debug,
        }
    }

    /// Default log filter; `debug = true` forces per-sample diagnostics on
    pub fn log_filter(&self) -> &str {
        if self.imu.debug {
            "debug"
        } else {
            &self.logging.level
        }
    }

    pub fn run_duration(&self) -> Option<Duration> {
        let seconds = self.run.duration_s;
        (seconds.is_finite() && seconds > 0.0).then(|| Duration::from_secs_f64(seconds))
    }
}

/// Config path from command line arguments
///
/// Supports `--config <path>`, `-c <path>` and a first positional argument.
pub fn config_path_from_args(args: &[String]) -> Option<PathBuf> {
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }

    args.get(1)
        .filter(|arg| !arg.starts_with('-'))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.imu.data_ready_pin, 25);
        assert_eq!(config.spi.clock_hz, 1_000_000);
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.run_duration(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_full_file() {
        let config = AppConfig::from_toml(
            r#"
            [imu]
            sample_rate_hz = 30.0
            data_ready_pin = 17
            filter_taps = 2
            ready_timeout_ms = 250
            debug = true

            [spi]
            bus = 1
            slave_select = 2
            clock_hz = 2000000

            [run]
            duration_s = 0.0
            print_every = 10

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        assert_eq!(config.imu.data_ready_pin, 17);
        assert_eq!(config.spi.bus, 1);
        assert_eq!(config.run.print_every, 10);
        assert_eq!(config.run_duration(), None);
        assert_eq!(config.log_filter(), "debug");

        let driver = config.driver_config();
        assert_eq!(driver.sample_rate_hz, 30.0);
        assert_eq!(driver.filter_taps, 2);
        assert_eq!(driver.ready_timeout, Duration::from_millis(250));
        assert!(driver.debug);
    }

    #[test]
    fn test_rejects_invalid_pin() {
        let err = AppConfig::from_toml("[imu]\ndata_ready_pin = 40\n").unwrap_err();
        assert!(matches!(
            err,
            BoardError::Configuration(ConfigError::InvalidPin(40))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_settings() {
        let err = AppConfig::from_toml("[imu]\nsample_rate_hz = 5000.0\n").unwrap_err();
        assert!(matches!(
            err,
            BoardError::Configuration(ConfigError::SampleRateOutOfRange(_))
        ));

        let err = AppConfig::from_toml("[imu]\nfilter_taps = 9\n").unwrap_err();
        assert!(matches!(
            err,
            BoardError::Configuration(ConfigError::FilterTapsOutOfRange(9))
        ));

        let err = AppConfig::from_toml("[spi]\nclock_hz = 8000000\n").unwrap_err();
        assert!(matches!(
            err,
            BoardError::Configuration(ConfigError::SpiClockOutOfRange(8_000_000))
        ));

        let err = AppConfig::from_toml("[spi]\nbus = 9\n").unwrap_err();
        assert!(matches!(err, BoardError::InvalidSpiChannel { bus: 9, .. }));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = AppConfig::from_toml("[imu\nsample_rate_hz = ").unwrap_err();
        assert!(matches!(err, BoardError::ConfigParse(_)));
    }

    #[test]
    fn test_sample_config_file() {
        let config =
            AppConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/adis16460.toml")).unwrap();
        assert_eq!(config.imu.sample_rate_hz, 30.0);
        assert_eq!(config.driver_config().validate(), Ok(()));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("/nonexistent/adis16460.toml").unwrap_err();
        assert!(matches!(err, BoardError::ConfigRead { .. }));
    }

    #[test]
    fn test_config_path_from_args() {
        assert_eq!(config_path_from_args(&args(&["rpi"])), None);
        assert_eq!(
            config_path_from_args(&args(&["rpi", "imu.toml"])),
            Some(PathBuf::from("imu.toml"))
        );
        assert_eq!(
            config_path_from_args(&args(&["rpi", "--config", "/etc/imu.toml"])),
            Some(PathBuf::from("/etc/imu.toml"))
        );
        assert_eq!(
            config_path_from_args(&args(&["rpi", "-c", "a.toml"])),
            Some(PathBuf::from("a.toml"))
        );
        assert_eq!(config_path_from_args(&args(&["rpi", "--config"])), None);
    }
}
