// src/hal/mod.rs
//! Hardware abstraction layer: virtual I2C buses and the devices on them

pub mod bus;
pub mod mpu6050;
pub mod registers;
pub mod simulation;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use bus::{BusRegistry, I2cBus, VirtualDevice};
pub use mpu6050::{Mpu6050, Mpu6050Settings, TickOutcome};
pub use traits::*;
pub use types::*;
