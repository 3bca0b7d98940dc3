// FallWatch — Fall-detection firmware core
//
// 50 Hz IMU sampling feeds a 301-step window; each completed window is
// normalised and classified into Normal / Fall / Near Fall / Sitting /
// Walking, and a confident Fall raises the alert flag.

pub mod classifier;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod normalize;
pub mod platform;
pub mod policy;
pub mod tasks;
pub mod telemetry;
pub mod window;

pub use error::{PipelineError, Result};
