//! I2C-Sim-Core: virtual I2C bus and MPU-6050 emulator
//!
//! This library lets driver-level logic run without physical hardware. It
//! features:
//!
//! - Numbered buses with address-keyed device slots
//! - A register-accurate MPU-6050 state machine with datasheet addresses
//! - A bounded hardware FIFO fed by a periodic background sampler
//! - Probabilistic per-transaction fault injection
//! - Lock-free performance metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use i2c_sim_core::{I2cSimulator, PowerState, SimulatorConfig};
//! use i2c_sim_core::hal::registers::WHO_AM_I;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sim = I2cSimulator::new(SimulatorConfig::default())?;
//!     sim.add_device(0, 0x68, "mpu6050")?;
//!
//!     assert_eq!(sim.read_byte(0, 0x68, WHO_AM_I)?, 0x68);
//!
//!     sim.set_power_state(0, 0x68, PowerState::On)?;
//!     sim.fifo_enable(0, 0x68, true)?;
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//!     println!("FIFO holds {} bytes", sim.fifo_get_count(0, 0x68)?);
//!
//!     println!("{}", sim.performance_report());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod metrics;
pub mod simulator;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ConfigLoader, SimulatorConfig};
pub use error::{to_errno, SimError, SimResult};
pub use hal::{DataPattern, DeviceKind, ErrorMode, I2cDevice, PowerState, Sample};
pub use metrics::{PerformanceMetrics, PerformanceReport};
pub use simulator::I2cSimulator;
pub use utils::time::{MockTimeProvider, MonotonicTimeProvider, TimeProvider};

