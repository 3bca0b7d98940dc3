// FallWatch — MPU6050 IMU Driver
//
// Register-level driver over the ESP-IDF I2C master.  Configures ±2 g,
// ±250 °/s and the 5 Hz DLPF; reads all channels in one 14-byte burst.

use crate::config::*;
use crate::events::Sample;

// MPU6050 register addresses
pub const REG_PWR_MGMT_1: u8 = 0x6B;
pub const REG_CONFIG: u8 = 0x1A;
pub const REG_GYRO_CONFIG: u8 = 0x1B;
pub const REG_ACCEL_CONFIG: u8 = 0x1C;
pub const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 14-byte sensor burst
pub const REG_WHO_AM_I: u8 = 0x75;

// Register values
pub const PWR_RESET: u8 = 0x80;
pub const PWR_WAKE: u8 = 0x00;
pub const ACCEL_FS_2G: u8 = 0x00;
pub const GYRO_FS_250: u8 = 0x00;
pub const DLPF_5HZ: u8 = 0x06;

/// Genuine MPU6050 parts report 0x68; the MPU6500-based clones report 0x70.
pub fn is_known_device_id(id: u8) -> bool {
    matches!(id, 0x68 | 0x70)
}

#[inline]
fn be_i16(raw: &[u8], at: usize) -> f32 {
    i16::from_be_bytes([raw[at], raw[at + 1]]) as f32
}

/// Convert a burst read starting at ACCEL_XOUT_H into physical units.
pub fn decode_burst(raw: &[u8; 14], timestamp_us: u64) -> Sample {
    Sample {
        ax: be_i16(raw, 0) / ACCEL_SCALE_2G,
        ay: be_i16(raw, 2) / ACCEL_SCALE_2G,
        az: be_i16(raw, 4) / ACCEL_SCALE_2G,
        temperature: be_i16(raw, 6) / TEMP_SCALE + TEMP_OFFSET_C,
        gx: be_i16(raw, 8) / GYRO_SCALE_250,
        gy: be_i16(raw, 10) / GYRO_SCALE_250,
        gz: be_i16(raw, 12) / GYRO_SCALE_250,
        timestamp_us,
    }
}

#[cfg(target_os = "espidf")]
pub use device::Mpu6050;

#[cfg(target_os = "espidf")]
mod device {
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::i2c::I2cDriver;

    use super::*;
    use crate::drivers::SampleSource;
    use crate::error::{PipelineError, Result};

    pub struct Mpu6050 {
        bus: I2cDriver<'static>,
    }

    impl Mpu6050 {
        pub fn new(bus: I2cDriver<'static>) -> Self {
            Self { bus }
        }

        fn write_reg(&mut self, reg: u8, value: u8) -> anyhow::Result<()> {
            self.bus
                .write(I2C_ADDR_MPU6050, &[reg, value], I2C_TIMEOUT_TICKS)?;
            Ok(())
        }

        /// Verify the device is reachable on the I2C bus.
        pub fn is_connected(&mut self) -> bool {
            let mut buf = [0u8; 1];
            match self
                .bus
                .write_read(I2C_ADDR_MPU6050, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS)
            {
                Ok(()) if is_known_device_id(buf[0]) => {
                    log::info!("MPU6050 found at 0x{:02x} (id 0x{:02x})", I2C_ADDR_MPU6050, buf[0]);
                    true
                }
                Ok(()) => {
                    log::error!("Unexpected WHO_AM_I value 0x{:02x}", buf[0]);
                    false
                }
                Err(e) => {
                    log::error!("WHO_AM_I read failed: {}", e);
                    false
                }
            }
        }

        /// Probe, reset, wake and configure the sensor.
        pub fn init(&mut self) -> anyhow::Result<()> {
            if !self.is_connected() {
                anyhow::bail!("MPU6050 not found");
            }

            self.write_reg(REG_PWR_MGMT_1, PWR_RESET)?;
            thread::sleep(Duration::from_millis(100));

            self.write_reg(REG_PWR_MGMT_1, PWR_WAKE)?;
            thread::sleep(Duration::from_millis(10));

            self.write_reg(REG_ACCEL_CONFIG, ACCEL_FS_2G)?;
            self.write_reg(REG_GYRO_CONFIG, GYRO_FS_250)?;
            self.write_reg(REG_CONFIG, DLPF_5HZ)?;

            log::info!("MPU6050 initialised (±2g, ±250°/s, DLPF 5Hz)");
            Ok(())
        }
    }

    impl SampleSource for Mpu6050 {
        fn read(&mut self) -> Result<Sample> {
            let mut raw = [0u8; 14];
            self.bus
                .write_read(
                    I2C_ADDR_MPU6050,
                    &[REG_ACCEL_XOUT_H],
                    &mut raw,
                    I2C_TIMEOUT_TICKS,
                )
                .map_err(|e| PipelineError::Io(e.to_string()))?;
            Ok(decode_burst(&raw, crate::platform::now_us()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_one_g_on_z_at_rest() {
        // az = 16384 (1 g), temp raw 0, everything else 0
        let raw = [0, 0, 0, 0, 0x40, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
        let s = decode_burst(&raw, 1234);
        assert_eq!(s.az, 1.0);
        assert_eq!(s.ax, 0.0);
        assert_eq!(s.gx, 0.0);
        assert!((s.temperature - 36.53).abs() < 1e-4);
        assert_eq!(s.timestamp_us, 1234);
    }

    #[test]
    fn decodes_signed_big_endian() {
        // ax = -16384 (-1 g), gx = 131 (1 °/s), gz = -262 (-2 °/s), temp = -340 (-1 °C offset)
        let raw = [
            0xC0, 0x00, // ax
            0, 0, // ay
            0, 0, // az
            0xFE, 0xAC, // temp -340
            0x00, 0x83, // gx 131
            0, 0, // gy
            0xFE, 0xFA, // gz -262
        ];
        let s = decode_burst(&raw, 0);
        assert_eq!(s.ax, -1.0);
        assert_eq!(s.gx, 1.0);
        assert_eq!(s.gz, -2.0);
        assert!((s.temperature - 35.53).abs() < 1e-4);
    }

    #[test]
    fn accepts_both_device_ids() {
        assert!(is_known_device_id(0x68));
        assert!(is_known_device_id(0x70));
        assert!(!is_known_device_id(0x00));
        assert!(!is_known_device_id(0xFF));
    }
}
