//! Emulated I2C peripheral for the companion device.
//!
//! The device sits on the target's bus as a follower: the target's bus
//! controller writes bytes into one exchange buffer and reads the other
//! back out. Bus events arrive asynchronously relative to the main loop, so
//! every buffer access goes through a short critical section.

pub mod controller;
pub mod periph;

pub use controller::BusController;
pub use periph::{BusEvents, I2cPeriph, BUFFER_SIZE, DEFAULT_ADDRESS, DEFAULT_SPEED_HZ};
