// src/error.rs
//! Error type shared by every simulator operation
//!
//! Failures are always returned to the caller; nothing in the simulator
//! panics on a documented input. Callers that speak the C-style driver
//! convention can convert any error to a negative POSIX code with
//! [`SimError::errno`].

use thiserror::Error;

/// Unified simulator error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Bad bus id, empty buffer, zero length or out-of-range parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A device is already present at this bus/address
    #[error("Device 0x{address:02X} already present on bus {bus}")]
    AlreadyExists { bus: usize, address: u8 },

    /// No present device answers at this bus/address, or the device
    /// was torn down, or a DEVICE_NOT_FOUND fault was injected
    #[error("No device at 0x{address:02X} on bus {bus}")]
    NotFound { bus: usize, address: u8 },

    /// The bus slot table is full
    #[error("Bus {bus} has no free device slots (capacity {capacity})")]
    NoCapacity { bus: usize, capacity: usize },

    /// Unknown device type name
    #[error("Unsupported device type '{0}'")]
    Unsupported(String),

    /// Write to a read-only register
    #[error("Register 0x{0:02X} is read-only")]
    Access(u8),

    /// The simulator has been cleaned up and not re-initialized
    #[error("Simulator is not initialized")]
    NotReady,

    /// The background sampler thread could not be spawned
    #[error("Failed to start background sampler: {0}")]
    SamplerSpawn(String),

    /// Injected TIMEOUT fault
    #[error("Transaction timed out after {ms} ms")]
    Timeout { ms: u64 },

    /// Injected BUS_ERROR, or an INTERMITTENT fault that fired
    #[error("I2C bus error")]
    BusError,
}

/// Result type alias for simulator operations
pub type SimResult<T> = Result<T, SimError>;

mod errno {
    pub const EIO: i32 = 5;
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EACCES: i32 = 13;
    pub const EEXIST: i32 = 17;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const ENOTSUP: i32 = 95;
    pub const ETIMEDOUT: i32 = 110;
}

impl SimError {
    /// Negative POSIX error code for the C-style surface
    pub fn errno(&self) -> i32 {
        let code = match self {
            SimError::InvalidArgument(_) => errno::EINVAL,
            SimError::AlreadyExists { .. } => errno::EEXIST,
            SimError::NotFound { .. } => errno::ENODEV,
            SimError::NoCapacity { .. } => errno::ENOMEM,
            SimError::Unsupported(_) => errno::ENOTSUP,
            SimError::Access(_) => errno::EACCES,
            SimError::NotReady | SimError::SamplerSpawn(_) => errno::EAGAIN,
            SimError::Timeout { .. } => errno::ETIMEDOUT,
            SimError::BusError => errno::EIO,
        };
        -code
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SimError::InvalidArgument(reason.into())
    }
}

/// Collapse a result to the driver convention: the non-negative value on
/// success, the negative errno on failure.
pub fn to_errno<T: Into<i32>>(result: SimResult<T>) -> i32 {
    match result {
        Ok(value) => value.into(),
        Err(err) => err.errno(),
    }
}
