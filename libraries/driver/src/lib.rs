//! Sensor drivers that talk to hardware through injected bus capabilities.
//!
//! Drivers are `no_std` and async; a host without an executor can drive them
//! with `embassy_futures::block_on`.
#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod imu;

pub use error::{ConfigError, ErrorKind, ImuError, ImuResult};
pub use imu::{
    Adis16460, Adis16460Config, Clock, DataReady, DiagStat, ImuSample, SampleState, SpiDevice,
};
