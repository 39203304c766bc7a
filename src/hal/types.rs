// src/hal/types.rs
//! Core types for the virtual devices

use crate::config::constants::{fifo::FRAME_SIZE_BYTES, mpu6050};
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One motion + temperature sample, in raw register units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub gyro_x: i16,
    pub gyro_y: i16,
    pub gyro_z: i16,
    pub temperature: i16,
    /// Milliseconds on the simulator's monotonic clock
    pub timestamp: u32,
}

impl Sample {
    /// Power-on sample: 1g on Z, no rotation, room temperature
    pub fn power_on() -> Self {
        Self {
            accel_z: mpu6050::ACCEL_SCALE_2G as i16,
            temperature: Self::raw_temperature(mpu6050::DEFAULT_TEMPERATURE_C),
            ..Self::default()
        }
    }

    /// Encode as the 14 bytes the chip exposes from ACCEL_XOUT_H onwards
    pub fn to_frame(&self) -> [u8; FRAME_SIZE_BYTES] {
        let words = [
            self.accel_x,
            self.accel_y,
            self.accel_z,
            self.temperature,
            self.gyro_x,
            self.gyro_y,
            self.gyro_z,
        ];

        let mut frame = [0u8; FRAME_SIZE_BYTES];
        for (chunk, word) in frame.chunks_exact_mut(2).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        frame
    }

    /// Decode a 14-byte frame; the timestamp is not part of the frame
    pub fn from_frame(frame: &[u8; FRAME_SIZE_BYTES]) -> Self {
        let word = |i: usize| i16::from_be_bytes([frame[2 * i], frame[2 * i + 1]]);
        Self {
            accel_x: word(0),
            accel_y: word(1),
            accel_z: word(2),
            temperature: word(3),
            gyro_x: word(4),
            gyro_y: word(5),
            gyro_z: word(6),
            timestamp: 0,
        }
    }

    /// Accelerometer in g at +/-2g full scale
    pub fn accel_g(&self) -> (f64, f64, f64) {
        let scale = mpu6050::ACCEL_SCALE_2G;
        (
            self.accel_x as f64 / scale,
            self.accel_y as f64 / scale,
            self.accel_z as f64 / scale,
        )
    }

    /// Gyroscope in degrees/s at +/-250 dps full scale
    pub fn gyro_dps(&self) -> (f64, f64, f64) {
        let scale = mpu6050::GYRO_SCALE_250DPS;
        (
            self.gyro_x as f64 / scale,
            self.gyro_y as f64 / scale,
            self.gyro_z as f64 / scale,
        )
    }

    /// Die temperature in degrees C (datasheet formula)
    pub fn temperature_celsius(&self) -> f64 {
        self.temperature as f64 / mpu6050::TEMP_SENSITIVITY + mpu6050::TEMP_OFFSET_C
    }

    /// Inverse of [`Sample::temperature_celsius`]
    pub fn raw_temperature(celsius: f64) -> i16 {
        ((celsius - mpu6050::TEMP_OFFSET_C) * mpu6050::TEMP_SENSITIVITY).round() as i16
    }
}

/// Power management state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    Off,
    Sleep,
    Cycle,
    On,
}

impl PowerState {
    /// Sensor outputs only advance while awake
    pub fn is_awake(self) -> bool {
        matches!(self, PowerState::Cycle | PowerState::On)
    }
}

/// Waveform the sensor-data generator produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataPattern {
    Static,
    SineWave,
    Noise,
    GravityOnly,
    Rotation,
    Vibration,
}

/// Configured fault behaviour of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorMode {
    None,
    DeviceNotFound,
    Timeout,
    BusError,
    CorruptData,
    Intermittent,
}

/// Device variants the bus can host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Mpu6050,
}

macro_rules! named_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Canonical name
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = SimError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| SimError::invalid(format!("unknown {} '{}'", $what, s)))
            }
        }
    };
}

named_enum!(PowerState, "power state", {
    Off => "OFF",
    Sleep => "SLEEP",
    Cycle => "CYCLE",
    On => "ON",
});

named_enum!(DataPattern, "data pattern", {
    Static => "STATIC",
    SineWave => "SINE_WAVE",
    Noise => "NOISE",
    GravityOnly => "GRAVITY_ONLY",
    Rotation => "ROTATION",
    Vibration => "VIBRATION",
});

named_enum!(ErrorMode, "error mode", {
    None => "NONE",
    DeviceNotFound => "DEVICE_NOT_FOUND",
    Timeout => "TIMEOUT",
    BusError => "BUS_ERROR",
    CorruptData => "CORRUPT_DATA",
    Intermittent => "INTERMITTENT",
});

impl FromStr for DeviceKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mpu6050" | "mpu-6050" => Ok(DeviceKind::Mpu6050),
            _ => Err(SimError::Unsupported(s.to_string())),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Mpu6050 => f.write_str("mpu6050"),
        }
    }
}
