// FallWatch — Hardware & System Configuration
// Target: ESP32-S3 DevKit + MPU6050 breakout

use std::time::Duration;

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// I2C Bus (MPU6050)
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 8;  // GPIO8
pub const PIN_I2C_SCL: i32 = 9;  // GPIO9
pub const I2C_PORT: i32 = 0;
pub const I2C_FREQ_HZ: u32 = 400_000;
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_TIMEOUT_TICKS: u32 = 100; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Model shape
// ---------------------------------------------------------------------------
pub const SEQUENCE_LENGTH: usize = 301;
pub const FEATURES: usize = 6; // accX, accY, accZ, gyroX, gyroY, gyroZ
pub const NUM_CLASSES: usize = 5;
pub const MODEL_INPUT_SIZE: usize = SEQUENCE_LENGTH * FEATURES; // 1806
pub const MODEL_OUTPUT_SIZE: usize = NUM_CLASSES;

pub const TENSOR_ARENA_SIZE: usize = 1024 * 1024; // 1 MiB, PSRAM
pub const MAX_INFERENCE_TIME_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_SAMPLER: usize = 4096;
pub const STACK_INFERENCE: usize = 8192;
pub const STACK_STATUS: usize = 4096;

// FreeRTOS priorities: sampler > inference > status.
// Applied via ThreadSpawnConfiguration before each std::thread spawn.
pub const PRIORITY_SAMPLER: u8 = 5;
pub const PRIORITY_INFERENCE: u8 = 4;
pub const PRIORITY_STATUS: u8 = 3;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
pub const HEALTH_CHECK_INTERVAL_MS: u64 = 1000;
pub const STATUS_TICK_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// MPU6050 Sensor Scale Factors
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_2G: f32 = 16384.0; // LSB/g  at ±2 g
pub const GYRO_SCALE_250: f32 = 131.0;   // LSB/°/s at ±250 °/s
pub const TEMP_SCALE: f32 = 340.0;
pub const TEMP_OFFSET_C: f32 = 36.53;

// Full-scale ranges used as normalisation divisors.
pub const ACCEL_FULL_SCALE_G: f32 = 2.0;
pub const GYRO_FULL_SCALE_DPS: f32 = 250.0;

// ---------------------------------------------------------------------------
// Runtime pipeline configuration
// ---------------------------------------------------------------------------

/// Tunables shared by the sampling, inference and status tasks.
///
/// The shape fields (`sequence_length`, `features`, `num_classes`) must agree
/// with the compiled model; they are carried here so a status dump shows the
/// full configuration in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub sample_rate_hz: u32,
    pub sequence_length: usize,
    pub features: usize,
    pub num_classes: usize,
    pub alert_threshold: f32,
    pub poll_interval: Duration,
    pub post_publish_delay: Duration,
    pub status_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 50,
            sequence_length: SEQUENCE_LENGTH,
            features: FEATURES,
            num_classes: NUM_CLASSES,
            alert_threshold: 0.7,
            poll_interval: Duration::from_millis(100),
            post_publish_delay: Duration::from_millis(500),
            status_interval: Duration::from_secs(10),
        }
    }
}

impl PipelineConfig {
    /// Sampling period, `1000 / sample_rate_hz` milliseconds (20 ms at 50 Hz).
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.sample_rate_hz.max(1)))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.sample_rate_hz == 0 || self.sample_rate_hz > 1000 {
            return Err(PipelineError::InvalidArgument(format!(
                "sample rate {} Hz outside 1..=1000",
                self.sample_rate_hz
            )));
        }
        if !(0.0..=1.0).contains(&self.alert_threshold) {
            return Err(PipelineError::InvalidArgument(format!(
                "alert threshold {} outside [0, 1]",
                self.alert_threshold
            )));
        }
        if self.sequence_length != SEQUENCE_LENGTH
            || self.features != FEATURES
            || self.num_classes != NUM_CLASSES
        {
            return Err(PipelineError::InvalidArgument(format!(
                "model shape {}x{} -> {} does not match compiled {}x{} -> {}",
                self.sequence_length,
                self.features,
                self.num_classes,
                SEQUENCE_LENGTH,
                FEATURES,
                NUM_CLASSES
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_rate_hz, 50);
        assert_eq!(config.sequence_length, 301);
        assert_eq!(config.features, 6);
        assert_eq!(config.num_classes, 5);
        assert_eq!(config.alert_threshold, 0.7);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.post_publish_delay, Duration::from_millis(500));
        assert_eq!(config.sample_interval(), Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero_rate = PipelineConfig {
            sample_rate_hz: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            zero_rate.validate(),
            Err(PipelineError::InvalidArgument(_))
        ));

        let threshold = PipelineConfig {
            alert_threshold: 1.5,
            ..PipelineConfig::default()
        };
        assert!(threshold.validate().is_err());

        let shape = PipelineConfig {
            sequence_length: 100,
            ..PipelineConfig::default()
        };
        assert!(shape.validate().is_err());
    }

    #[test]
    fn model_input_is_flattened_window() {
        assert_eq!(MODEL_INPUT_SIZE, 1806);
        assert_eq!(MODEL_OUTPUT_SIZE, 5);
    }
}
