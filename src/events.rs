// FallWatch — Pipeline Data Types

use std::time::Duration;

use crate::config::{FEATURES, NUM_CLASSES};

/// One window slot: accX, accY, accZ (g), gyroX, gyroY, gyroZ (°/s).
pub type FeatureVector = [f32; FEATURES];

/// Classifier output, one score per [`ClassLabel`] in index order.
pub type Probabilities = [f32; NUM_CLASSES];

// ---------------------------------------------------------------------------
// Sensor Data (6-axis IMU reading from MPU6050)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    /// Die temperature in °C. Informational only, never fed to the model.
    pub temperature: f32,
    /// Microseconds since boot.
    pub timestamp_us: u64,
}

impl Sample {
    pub fn features(&self) -> FeatureVector {
        [self.ax, self.ay, self.az, self.gx, self.gy, self.gz]
    }
}

// ---------------------------------------------------------------------------
// Activity Classification
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassLabel {
    #[default]
    Normal,
    Fall,
    NearFall,
    Sitting,
    Walking,
}

impl ClassLabel {
    /// Model output order.
    pub const ALL: [ClassLabel; NUM_CLASSES] = [
        Self::Normal,
        Self::Fall,
        Self::NearFall,
        Self::Sitting,
        Self::Walking,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Fall => "Fall",
            Self::NearFall => "Near Fall",
            Self::Sitting => "Sitting",
            Self::Walking => "Walking",
        }
    }
}

// ---------------------------------------------------------------------------
// Inference result — the single retained value read by the status task
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceResult {
    /// Raw classifier scores, not renormalised.
    pub probabilities: Probabilities,
    pub predicted_class: ClassLabel,
    /// Probability of `predicted_class`.
    pub confidence: f32,
    pub inference_time: Duration,
    /// Timestamp (µs since boot) of the last sample in the classified window.
    pub window_timestamp_us: u64,
    pub alert: bool,
}
