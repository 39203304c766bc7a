// src/hal/traits.rs
//! Capability set every virtual I2C device implements

use crate::error::SimResult;
use crate::hal::types::DeviceKind;

/// Register-level access to one addressable device.
///
/// Each call is one logical bus transaction: implementations apply their
/// fault model once per call, whether it moves one byte or a burst.
pub trait I2cDevice: Send + Sync {
    /// Read a single register
    fn read_register(&self, reg: u8) -> SimResult<u8>;

    /// Write a single register
    fn write_register(&self, reg: u8, value: u8) -> SimResult<()>;

    /// Fill `buf` starting at `reg`, advancing the register pointer per byte
    fn read_burst(&self, reg: u8, buf: &mut [u8]) -> SimResult<usize>;

    /// Write `data` starting at `reg`, advancing the register pointer per byte
    fn write_burst(&self, reg: u8, data: &[u8]) -> SimResult<usize>;

    /// Device variant
    fn kind(&self) -> DeviceKind;

    /// 7-bit bus address
    fn address(&self) -> u8;
}
