//! Simulated Qwiic Quad Solid State Relay on an in-memory I2C bus.

pub mod board;
pub mod i2c;

pub use board::SimBoard;
pub use i2c::{I2cFrame, SimError};
