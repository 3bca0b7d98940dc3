// FallWatch — Synthetic IMU
//
// Deterministic stand-in for the MPU6050 on desktop builds: 1 g on Z with a
// gentle gait-like sway, and an optional periodic read failure to exercise
// the sampler's skip path.

use std::f32::consts::TAU;

use crate::drivers::SampleSource;
use crate::error::{PipelineError, Result};
use crate::events::Sample;

// Gait-like sway frequency.
const STRIDE_HZ: f32 = 1.8;

pub struct SyntheticImu {
    tick: u64,
    /// Sway phase advance per sample, in turns.
    phase_step: f32,
    /// Every `fail_every`-th read fails; 0 disables failures.
    fail_every: u64,
}

impl SyntheticImu {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            tick: 0,
            phase_step: STRIDE_HZ / sample_rate_hz.max(1) as f32,
            fail_every: 0,
        }
    }

    pub fn with_failures(mut self, fail_every: u64) -> Self {
        self.fail_every = fail_every;
        self
    }
}

impl SampleSource for SyntheticImu {
    fn read(&mut self) -> Result<Sample> {
        self.tick += 1;
        if self.fail_every != 0 && self.tick % self.fail_every == 0 {
            return Err(PipelineError::Io("synthetic bus timeout".into()));
        }

        let phase = (self.tick as f32 * self.phase_step * TAU).sin();
        Ok(Sample {
            ax: 0.15 * phase,
            ay: 0.05 * phase,
            az: 1.0 + 0.1 * phase,
            gx: 12.0 * phase,
            gy: 0.0,
            gz: -4.0 * phase,
            temperature: 25.0,
            timestamp_us: crate::platform::now_us(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_are_plausible_and_timestamped() {
        let mut imu = SyntheticImu::new(50);
        let a = imu.read().expect("read");
        let b = imu.read().expect("read");
        assert!(b.timestamp_us >= a.timestamp_us);
        assert!(b.timestamp_us <= crate::platform::now_us());
        assert!((0.8..1.2).contains(&a.az));
    }

    #[test]
    fn injects_failures() {
        let mut imu = SyntheticImu::new(50).with_failures(3);
        assert!(imu.read().is_ok());
        assert!(imu.read().is_ok());
        assert!(matches!(imu.read(), Err(PipelineError::Io(_))));
        assert!(imu.read().is_ok());
    }
}
