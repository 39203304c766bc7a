// src/hal/tests.rs
//! Unit tests for HAL types

use crate::error::SimError;
use crate::hal::{DataPattern, DeviceKind, ErrorMode, PowerState, Sample};

#[test]
fn test_sample_frame_layout() {
    let sample = Sample {
        accel_x: 0x0102,
        accel_y: -2,
        accel_z: 16384,
        gyro_x: 0x0A0B,
        gyro_y: 0,
        gyro_z: -131,
        temperature: -5280,
        timestamp: 99,
    };

    let frame = sample.to_frame();
    assert_eq!(&frame[0..2], &[0x01, 0x02]);
    assert_eq!(&frame[2..4], &[0xFF, 0xFE]);
    assert_eq!(&frame[4..6], &[0x40, 0x00]);
    // temperature sits between accel and gyro, as on the chip
    assert_eq!(&frame[6..8], &(-5280i16).to_be_bytes());
    assert_eq!(&frame[8..10], &[0x0A, 0x0B]);

    let decoded = Sample::from_frame(&frame);
    assert_eq!(decoded, Sample { timestamp: 0, ..sample });
}

#[test]
fn test_power_on_sample_units() {
    let sample = Sample::power_on();
    assert_eq!(sample.accel_g(), (0.0, 0.0, 1.0));
    assert_eq!(sample.gyro_dps(), (0.0, 0.0, 0.0));
    assert_eq!(sample.temperature, -5280);
    assert!((sample.temperature_celsius() - 21.0).abs() < 0.01);
}

#[test]
fn test_enum_names_round_trip() {
    for pattern in DataPattern::ALL {
        assert_eq!(pattern.to_string().parse::<DataPattern>().unwrap(), *pattern);
    }
    for mode in ErrorMode::ALL {
        assert_eq!(mode.as_str().parse::<ErrorMode>().unwrap(), *mode);
    }
    assert_eq!("sine_wave".parse::<DataPattern>().unwrap(), DataPattern::SineWave);
    assert_eq!(" on ".parse::<PowerState>().unwrap(), PowerState::On);
}

#[test]
fn test_unknown_names_rejected() {
    assert!(matches!("SQUARE".parse::<DataPattern>(), Err(SimError::InvalidArgument(_))));
    assert!(matches!("FLAKY".parse::<ErrorMode>(), Err(SimError::InvalidArgument(_))));
    assert_eq!("bmp280".parse::<DeviceKind>(), Err(SimError::Unsupported("bmp280".into())));
    assert_eq!("MPU-6050".parse::<DeviceKind>(), Ok(DeviceKind::Mpu6050));
    assert_eq!(DeviceKind::Mpu6050.to_string(), "mpu6050");
}

#[test]
fn test_power_state_awake() {
    assert!(PowerState::On.is_awake());
    assert!(PowerState::Cycle.is_awake());
    assert!(!PowerState::Sleep.is_awake());
    assert!(!PowerState::Off.is_awake());
}

#[test]
fn test_serde_names() {
    let json = serde_json::to_string(&ErrorMode::DeviceNotFound).unwrap();
    assert_eq!(json, "\"DEVICE_NOT_FOUND\"");
    let pattern: DataPattern = serde_json::from_str("\"GRAVITY_ONLY\"").unwrap();
    assert_eq!(pattern, DataPattern::GravityOnly);

    let sample = Sample::power_on();
    let back: Sample = serde_json::from_str(&serde_json::to_string(&sample).unwrap()).unwrap();
    assert_eq!(back, sample);
}
