//! Data synthesis and fault models for the virtual devices
//! Location: src/hal/simulation/mod.rs

pub mod error_injection;
pub mod signal_generator;

pub use error_injection::{ErrorInjector, InjectedFault};
pub use signal_generator::Axis;
