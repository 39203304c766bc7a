// src/acquisition/mod.rs
//! Sample acquisition: the device FIFO and the background sampler feeding it

pub mod ring_buffer;
pub mod sampler;

pub use ring_buffer::{FifoBuffer, RingBufferError};
pub use sampler::BackgroundSampler;
