#![no_std]
extern crate nalgebra;

mod imu;
mod types;

pub use imu::*;
pub use types::*;
