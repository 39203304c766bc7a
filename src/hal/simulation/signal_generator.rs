//! Sensor-data generation for the virtual MPU-6050
//! Location: src/hal/simulation/signal_generator.rs
//!
//! Every waveform is a function of the pattern, the axis and the sample
//! index; time is `sample_index / ASSUMED_SAMPLE_RATE_HZ`. Only the NOISE
//! pattern draws from the supplied random source.

use crate::config::constants::{mpu6050, timing::ASSUMED_SAMPLE_RATE_HZ};
use crate::hal::types::{DataPattern, Sample};
use rand::Rng;
use std::f64::consts::PI;

const ACCEL_1G: f64 = mpu6050::ACCEL_SCALE_2G;
const GYRO_1DPS: f64 = mpu6050::GYRO_SCALE_250DPS;

/// Motion axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    fn index(self) -> f64 {
        match self {
            Axis::X => 0.0,
            Axis::Y => 1.0,
            Axis::Z => 2.0,
        }
    }
}

fn time_seconds(sample_index: u32) -> f64 {
    sample_index as f64 / ASSUMED_SAMPLE_RATE_HZ
}

fn sine(amplitude: f64, freq_hz: f64, t: f64) -> f64 {
    amplitude * (2.0 * PI * freq_hz * t).sin()
}

/// Symmetric uniform draw in [-1, 1)
fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(-1.0..1.0)
}

/// Raw accelerometer value for one axis
pub fn accel<R: Rng + ?Sized>(pattern: DataPattern, axis: Axis, sample_index: u32, rng: &mut R) -> i16 {
    let t = time_seconds(sample_index);
    let gravity = if axis == Axis::Z { ACCEL_1G } else { 0.0 };

    let value = match pattern {
        DataPattern::Static | DataPattern::GravityOnly => gravity,
        DataPattern::SineWave => {
            let freq_hz = 1.0 + axis.index() * 0.5;
            gravity + sine(ACCEL_1G * 0.1, freq_hz, t)
        }
        DataPattern::Noise => gravity + uniform(rng) * ACCEL_1G * 0.05,
        DataPattern::Rotation => {
            // gravity vector revolving about Y at 0.5 rad/s
            let angle = t * 0.5;
            match axis {
                Axis::X => ACCEL_1G * angle.sin(),
                Axis::Y => ACCEL_1G * 0.1 * (angle * 2.0).cos(),
                Axis::Z => ACCEL_1G * angle.cos(),
            }
        }
        DataPattern::Vibration => {
            let freq_hz = 50.0 + axis.index() * 10.0;
            gravity + sine(ACCEL_1G * 0.02, freq_hz, t)
        }
    };

    value as i16
}

/// Raw gyroscope value for one axis
pub fn gyro<R: Rng + ?Sized>(pattern: DataPattern, axis: Axis, sample_index: u32, rng: &mut R) -> i16 {
    let t = time_seconds(sample_index);

    let value = match pattern {
        DataPattern::Static | DataPattern::GravityOnly => 0.0,
        DataPattern::SineWave => {
            let freq_hz = 0.5 + axis.index() * 0.2;
            sine(GYRO_1DPS * 10.0, freq_hz, t)
        }
        DataPattern::Noise => uniform(rng) * GYRO_1DPS,
        DataPattern::Rotation => match axis {
            Axis::X => GYRO_1DPS * 5.0,
            Axis::Y => GYRO_1DPS * -2.0,
            Axis::Z => GYRO_1DPS * 10.0 * t.sin(),
        },
        DataPattern::Vibration => {
            let freq_hz = 30.0 + axis.index() * 5.0;
            sine(GYRO_1DPS * 2.0, freq_hz, t)
        }
    };

    value as i16
}

/// Raw die temperature
pub fn temperature<R: Rng + ?Sized>(pattern: DataPattern, sample_index: u32, rng: &mut R) -> i16 {
    let t = time_seconds(sample_index);
    let mut celsius = mpu6050::DEFAULT_TEMPERATURE_C;

    match pattern {
        DataPattern::Static | DataPattern::GravityOnly => {}
        DataPattern::SineWave => celsius += sine(2.0, 0.01, t),
        DataPattern::Noise => celsius += uniform(rng) * 0.5,
        // slight self-heating under motion
        DataPattern::Rotation | DataPattern::Vibration => celsius += 1.0,
    }

    Sample::raw_temperature(celsius)
}

/// All seven channels for one sample index, computed together so a
/// 14-byte burst is internally consistent. The timestamp is left at zero.
pub fn generate<R: Rng + ?Sized>(pattern: DataPattern, sample_index: u32, rng: &mut R) -> Sample {
    let [accel_x, accel_y, accel_z] = Axis::ALL.map(|axis| accel(pattern, axis, sample_index, rng));
    let [gyro_x, gyro_y, gyro_z] = Axis::ALL.map(|axis| gyro(pattern, axis, sample_index, rng));

    Sample {
        accel_x,
        accel_y,
        accel_z,
        gyro_x,
        gyro_y,
        gyro_z,
        temperature: temperature(pattern, sample_index, rng),
        timestamp: 0,
    }
}
