// src/config/constants.rs
//! System-wide configuration constants

/// Bus directory constants
pub mod bus {
    pub const DEFAULT_BUS_COUNT: usize = 2;
    pub const DEFAULT_MAX_DEVICES_PER_BUS: usize = 128;
    pub const DEFAULT_NOISE_LEVEL: f64 = 0.01;
    pub const MIN_NOISE_LEVEL: f64 = 0.0;
    pub const MAX_NOISE_LEVEL: f64 = 1.0;

    /// Upper bound of the random extra delay a noisy bus adds to a transaction
    pub const MAX_NOISE_DELAY_US: u64 = 50;

    /// Largest 7-bit I2C address
    pub const MAX_I2C_ADDRESS: u8 = 0x7F;
}

/// Timing constants
pub mod timing {
    pub const DEFAULT_GLOBAL_LATENCY_US: u64 = 100;
    pub const DEFAULT_SAMPLER_INTERVAL_MS: u64 = 10;
    pub const DEFAULT_TIMEOUT_DELAY_MS: u64 = 100;

    /// Rate the waveform generator assumes when converting a sample index to seconds
    pub const ASSUMED_SAMPLE_RATE_HZ: f64 = 1000.0;

    pub const MILLISECONDS_PER_SECOND: u64 = 1_000;
}

/// FIFO constants
pub mod fifo {
    pub const DEFAULT_CAPACITY_BYTES: usize = 1024;

    /// accel xyz + temperature + gyro xyz, 16 bits each
    pub const FRAME_SIZE_BYTES: usize = 14;
}

/// Error-injection constants
pub mod injection {
    pub const DEFAULT_INTERMITTENT_FAILURE_RATIO: f64 = 0.3;
    pub const MIN_PROBABILITY: f64 = 0.0;
    pub const MAX_PROBABILITY: f64 = 1.0;
}

/// MPU-6050 conversion constants at the power-on full-scale ranges
pub mod mpu6050 {
    pub const WHO_AM_I_VALUE: u8 = 0x68;

    /// LSB per g at +/-2g
    pub const ACCEL_SCALE_2G: f64 = 16384.0;
    /// LSB per degree/s at +/-250 dps
    pub const GYRO_SCALE_250DPS: f64 = 131.0;
    /// LSB per degree C
    pub const TEMP_SENSITIVITY: f64 = 340.0;
    /// Temperature (C) at raw value 0
    pub const TEMP_OFFSET_C: f64 = 36.53;
    pub const DEFAULT_TEMPERATURE_C: f64 = 21.0;

    pub const POWER_ON_PWR_MGMT_1: u8 = 0x40;
}
