// src/hal/registers.rs
//! MPU-6050 register map (datasheet addresses)
//!
//! These addresses are what a real driver writes on the wire, so they must
//! agree byte-for-byte with the chip.

pub const SMPLRT_DIV: u8 = 0x19;
pub const CONFIG: u8 = 0x1A;
pub const GYRO_CONFIG: u8 = 0x1B;
pub const ACCEL_CONFIG: u8 = 0x1C;
pub const FIFO_EN: u8 = 0x23;
pub const INT_ENABLE: u8 = 0x38;
pub const INT_STATUS: u8 = 0x3A;

pub const ACCEL_XOUT_H: u8 = 0x3B;
pub const ACCEL_XOUT_L: u8 = 0x3C;
pub const ACCEL_YOUT_H: u8 = 0x3D;
pub const ACCEL_YOUT_L: u8 = 0x3E;
pub const ACCEL_ZOUT_H: u8 = 0x3F;
pub const ACCEL_ZOUT_L: u8 = 0x40;
pub const TEMP_OUT_H: u8 = 0x41;
pub const TEMP_OUT_L: u8 = 0x42;
pub const GYRO_XOUT_H: u8 = 0x43;
pub const GYRO_XOUT_L: u8 = 0x44;
pub const GYRO_YOUT_H: u8 = 0x45;
pub const GYRO_YOUT_L: u8 = 0x46;
pub const GYRO_ZOUT_H: u8 = 0x47;
pub const GYRO_ZOUT_L: u8 = 0x48;

pub const USER_CTRL: u8 = 0x6A;
pub const PWR_MGMT_1: u8 = 0x6B;
pub const PWR_MGMT_2: u8 = 0x6C;
pub const FIFO_COUNTH: u8 = 0x72;
pub const FIFO_COUNTL: u8 = 0x73;
pub const FIFO_R_W: u8 = 0x74;
pub const WHO_AM_I: u8 = 0x75;

/// PWR_MGMT_1 bits
pub const PWR_MGMT_1_DEVICE_RESET: u8 = 0x80;
pub const PWR_MGMT_1_SLEEP: u8 = 0x40;
pub const PWR_MGMT_1_CYCLE: u8 = 0x20;

/// USER_CTRL bits
pub const USER_CTRL_FIFO_EN: u8 = 0x40;
pub const USER_CTRL_FIFO_RESET: u8 = 0x04;

/// INT_STATUS bits
pub const INT_STATUS_FIFO_OFLOW: u8 = 0x10;

/// Sensor output window (ACCEL_XOUT_H..=GYRO_ZOUT_L)
pub fn is_sensor_output(reg: u8) -> bool {
    (ACCEL_XOUT_H..=GYRO_ZOUT_L).contains(&reg)
}

/// Registers a bus write must not modify
pub fn is_read_only(reg: u8) -> bool {
    is_sensor_output(reg) || matches!(reg, WHO_AM_I | FIFO_COUNTH | FIFO_COUNTL)
}

/// Next register address in a burst. FIFO_R_W does not auto-increment on
/// the real chip so a burst there drains the FIFO.
pub fn burst_next(reg: u8) -> u8 {
    if reg == FIFO_R_W {
        reg
    } else {
        reg.wrapping_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_window_spans_fourteen_bytes() {
        let count = (0u8..=0xFF).filter(|&r| is_sensor_output(r)).count();
        assert_eq!(count, 14);
        assert!(is_sensor_output(ACCEL_XOUT_H));
        assert!(is_sensor_output(GYRO_ZOUT_L));
        assert!(!is_sensor_output(INT_STATUS));
    }

    #[test]
    fn test_read_only_set() {
        for reg in [WHO_AM_I, FIFO_COUNTH, FIFO_COUNTL, ACCEL_XOUT_H, TEMP_OUT_L, GYRO_YOUT_H] {
            assert!(is_read_only(reg), "0x{reg:02X} should be read-only");
        }
        for reg in [PWR_MGMT_1, PWR_MGMT_2, SMPLRT_DIV, CONFIG, GYRO_CONFIG, ACCEL_CONFIG, FIFO_R_W, USER_CTRL] {
            assert!(!is_read_only(reg), "0x{reg:02X} should be writable");
        }
    }

    #[test]
    fn test_burst_addressing() {
        assert_eq!(burst_next(ACCEL_XOUT_H), ACCEL_XOUT_L);
        assert_eq!(burst_next(0xFF), 0x00);
        assert_eq!(burst_next(FIFO_R_W), FIFO_R_W);
    }
}
