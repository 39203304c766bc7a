// src/acquisition/ring_buffer.rs
//! Bounded byte FIFO with a latched overflow flag
//!
//! Models the chip's hardware FIFO: when full, new bytes are dropped and
//! `overflow` latches until an explicit reset or re-enable. Unread data is
//! never overwritten. The buffer carries no lock of its own; its owning
//! device keeps it inside the device lock.

/// FIFO error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingBufferError {
    Full,
    InvalidCapacity,
}

impl std::fmt::Display for RingBufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingBufferError::Full => write!(f, "FIFO is full, byte dropped"),
            RingBufferError::InvalidCapacity => write!(f, "Invalid FIFO capacity (must be 1..=65535)"),
        }
    }
}

impl std::error::Error for RingBufferError {}

/// Fixed-capacity byte queue
#[derive(Debug, Clone)]
pub struct FifoBuffer {
    buffer: Box<[u8]>,
    head: usize,
    tail: usize,
    count: usize,
    enabled: bool,
    overflow: bool,
}

impl FifoBuffer {
    /// Create an empty, disabled FIFO. The count must fit FIFO_COUNTH/L.
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 || capacity > u16::MAX as usize {
            return Err(RingBufferError::InvalidCapacity);
        }

        Ok(Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
            enabled: false,
            overflow: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn overflowed(&self) -> bool {
        self.overflow
    }

    /// Enabling always starts from an empty FIFO; disabling keeps contents
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    /// Clear contents and the overflow latch; `enabled` is untouched
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
        self.overflow = false;
    }

    /// Append one byte, or drop it and latch overflow when full
    pub fn push(&mut self, byte: u8) -> Result<(), RingBufferError> {
        if self.is_full() {
            self.overflow = true;
            return Err(RingBufferError::Full);
        }

        self.buffer[self.head] = byte;
        self.head = (self.head + 1) % self.capacity();
        self.count += 1;
        Ok(())
    }

    /// Append bytes in order until the FIFO fills; returns how many fit
    pub fn push_slice(&mut self, bytes: &[u8]) -> usize {
        let mut written = 0;
        for &byte in bytes {
            if self.push(byte).is_err() {
                break;
            }
            written += 1;
        }
        written
    }

    /// Remove the oldest byte; never blocks
    pub fn pop(&mut self) -> Option<u8> {
        if self.count == 0 {
            return None;
        }

        let byte = self.buffer[self.tail];
        self.tail = (self.tail + 1) % self.capacity();
        self.count -= 1;
        Some(byte)
    }

    /// Drain up to `out.len()` bytes; returns the number copied
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let mut read = 0;
        while read < out.len() {
            match self.pop() {
                Some(byte) => {
                    out[read] = byte;
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    /// Count split for FIFO_COUNTH / FIFO_COUNTL
    pub fn count_bytes(&self) -> [u8; 2] {
        (self.count as u16).to_be_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_indices_consistent(fifo: &FifoBuffer) {
        assert!(fifo.count() <= fifo.capacity());
        assert_eq!((fifo.tail + fifo.count) % fifo.capacity(), fifo.head);
    }

    #[test]
    fn test_basic_push_pop() {
        let mut fifo = FifoBuffer::new(8).unwrap();
        assert!(fifo.push(42).is_ok());
        assert!(fifo.push(43).is_ok());
        assert_eq!(fifo.count(), 2);

        assert_eq!(fifo.pop(), Some(42));
        assert_eq!(fifo.pop(), Some(43));
        assert_eq!(fifo.pop(), None);
    }

    #[test]
    fn test_full_fifo_drops_new_bytes_and_latches() {
        let mut fifo = FifoBuffer::new(4).unwrap();
        assert_eq!(fifo.push_slice(&[1, 2, 3, 4]), 4);
        assert!(fifo.is_full());
        assert!(!fifo.overflowed());

        assert_eq!(fifo.push(99), Err(RingBufferError::Full));
        assert!(fifo.overflowed());

        // oldest data retained
        assert_eq!(fifo.pop(), Some(1));
        // latch survives draining
        assert!(fifo.overflowed());
        fifo.reset();
        assert!(!fifo.overflowed());
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_enable_resets_disable_keeps() {
        let mut fifo = FifoBuffer::new(16).unwrap();
        fifo.set_enabled(true);
        fifo.push_slice(&[1, 2, 3]);
        fifo.set_enabled(false);
        assert_eq!(fifo.count(), 3);
        assert!(!fifo.is_enabled());

        fifo.set_enabled(true);
        assert_eq!(fifo.count(), 0);
        assert!(fifo.is_enabled());
    }

    #[test]
    fn test_reset_keeps_enabled_flag() {
        let mut fifo = FifoBuffer::new(16).unwrap();
        fifo.set_enabled(true);
        fifo.push_slice(&[7; 10]);
        fifo.reset();
        assert!(fifo.is_enabled());
        assert_eq!(fifo.count(), 0);
    }

    #[test]
    fn test_count_bytes_big_endian() {
        let mut fifo = FifoBuffer::new(1024).unwrap();
        fifo.push_slice(&[0u8; 300]);
        assert_eq!(fifo.count_bytes(), [0x01, 0x2C]);
    }

    #[test]
    fn test_drain_into_partial() {
        let mut fifo = FifoBuffer::new(8).unwrap();
        fifo.push_slice(&[1, 2, 3]);
        let mut out = [0u8; 5];
        assert_eq!(fifo.drain_into(&mut out), 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_invalid_capacity() {
        assert_eq!(FifoBuffer::new(0).unwrap_err(), RingBufferError::InvalidCapacity);
        assert!(FifoBuffer::new(70_000).is_err());
        assert!(FifoBuffer::new(1024).is_ok());
    }

    proptest! {
        #[test]
        fn prop_count_bounded_and_fifo_ordered(
            capacity in 1usize..64,
            ops in proptest::collection::vec(proptest::option::of(any::<u8>()), 0..400),
        ) {
            let mut fifo = FifoBuffer::new(capacity).unwrap();
            let mut model = std::collections::VecDeque::new();
            let mut dropped = false;

            for op in ops {
                match op {
                    Some(byte) => {
                        if model.len() < capacity {
                            model.push_back(byte);
                            prop_assert!(fifo.push(byte).is_ok());
                        } else {
                            dropped = true;
                            prop_assert!(fifo.push(byte).is_err());
                        }
                    }
                    None => prop_assert_eq!(fifo.pop(), model.pop_front()),
                }
                assert_indices_consistent(&fifo);
                prop_assert_eq!(fifo.count(), model.len());
                prop_assert_eq!(fifo.overflowed(), dropped);
            }
        }
    }
}
