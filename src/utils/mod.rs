// src/utils/mod.rs
//! Shared utilities

pub mod time;

pub use time::{MockTimeProvider, MonotonicTimeProvider, TimeProvider};
