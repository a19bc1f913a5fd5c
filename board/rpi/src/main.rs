//! ADIS16460 reader for the Raspberry Pi
//!
//! Brings the IMU up on spidev, then reads one sample per data-ready edge as
//! fast as the device produces them. Failed reads are logged and retried on
//! the next edge.

mod board;
mod config;
mod error;

use std::env;
use std::time::Instant;

use anyhow::Context;
use driver::ErrorKind;
use embassy_futures::block_on;
use hal::Imu6Dof;

use crate::board::RaspberryPiBoard;
use crate::config::{config_path_from_args, AppConfig};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = match config_path_from_args(&args) {
        Some(path) => AppConfig::load(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();

    let board = RaspberryPiBoard;
    log::info!("Board: {}", board.name());

    let mut imu = board
        .open_imu(&config)
        .context("failed to bring up ADIS16460")?;

    let deadline = config.run_duration().map(|d| Instant::now() + d);
    let print_every = config.run.print_every.max(1);
    let mut failures = 0u64;

    loop {
        match block_on(imu.update()) {
            Ok(()) => {
                if imu.samples_read() % print_every == 0 {
                    let sample = imu.sample();
                    log::info!(
                        "t={:.3}s gyro [{:.3}, {:.3}, {:.3}] deg/s accel [{:.3}, {:.3}, {:.3}] m/s² temp {:.2} C",
                        (imu.last_time() - imu.start_time()) as f64 / 1e9,
                        sample.gyro.x,
                        sample.gyro.y,
                        sample.gyro.z,
                        sample.accel.x,
                        sample.accel.y,
                        sample.accel.z,
                        sample.temperature
                    );
                }
            }
            Err(err) if err.kind() == ErrorKind::Io => {
                failures += 1;
                log::warn!("IMU read failed: {}", err);
            }
            Err(err) => return Err(err).context("IMU stopped responding"),
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
    }

    let status = imu.status();
    log::info!(
        "{} samples at {:.2} Hz, {} failed reads, last temperature {:.2} C",
        status.samples,
        status.sample_rate,
        failures,
        status.temperature
    );

    // Dropping the peripherals closes the spidev handle and releases the pin
    drop(imu.release());
    Ok(())
}
