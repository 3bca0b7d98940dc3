// FallWatch — Sampling Task
//
// Reads one 6-axis sample per period (50 Hz) and appends it to the window
// buffer.  A failed read skips the period; the buffer is left untouched.
// Completed windows are handed to the inference task without ever blocking
// on it.

use std::sync::Arc;
use std::time::Duration;

use crate::drivers::SampleSource;
use crate::telemetry::PipelineStats;
use crate::window::{BufferGauge, BufferState, Handoff, WindowBuffer, WindowExchange};

use super::{PeriodicTimer, Shared};

/// What one sampling period did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Sensor read failed; nothing was written.
    Skipped,
    Stored(BufferState),
    /// The sample completed a window, which was then offered to inference.
    Completed(Handoff),
}

pub struct Sampler<S: SampleSource> {
    source: S,
    buffer: WindowBuffer,
    exchange: Arc<WindowExchange>,
    gauge: Arc<BufferGauge>,
    stats: Arc<PipelineStats>,
}

impl<S: SampleSource> Sampler<S> {
    pub fn new(source: S, shared: &Shared) -> Self {
        let mut buffer = WindowBuffer::new();
        buffer.reset();
        Self {
            source,
            buffer,
            exchange: Arc::clone(&shared.exchange),
            gauge: Arc::clone(&shared.gauge),
            stats: Arc::clone(&shared.stats),
        }
    }

    pub fn buffer(&self) -> &WindowBuffer {
        &self.buffer
    }

    /// One sampling period.
    pub fn step(&mut self) -> SampleOutcome {
        let sample = match self.source.read() {
            Ok(sample) => sample,
            Err(e) => {
                log::warn!("IMU read error: {} (sample skipped)", e);
                PipelineStats::bump(&self.stats.samples_skipped);
                return SampleOutcome::Skipped;
            }
        };
        PipelineStats::bump(&self.stats.samples_taken);

        log::trace!(
            "Accel [{:.3} {:.3} {:.3}] g, Gyro [{:.3} {:.3} {:.3}] deg/s, Temp {:.1} C",
            sample.ax,
            sample.ay,
            sample.az,
            sample.gx,
            sample.gy,
            sample.gz,
            sample.temperature
        );

        let state = match self.buffer.append_sample(&sample) {
            Ok(state) => state,
            Err(e) => {
                log::error!("Failed to add sample to window: {}", e);
                return SampleOutcome::Skipped;
            }
        };
        self.gauge.record(&self.buffer);

        if state != BufferState::Full {
            return SampleOutcome::Stored(state);
        }

        PipelineStats::bump(&self.stats.windows_completed);
        match self.exchange.publish(&mut self.buffer) {
            Ok(Handoff::Dropped) => {
                log::warn!("Inference busy, window dropped");
                PipelineStats::bump(&self.stats.windows_dropped);
                SampleOutcome::Completed(Handoff::Dropped)
            }
            Ok(handoff) => {
                log::debug!("Window handed to inference ({:?})", handoff);
                SampleOutcome::Completed(handoff)
            }
            Err(e) => {
                log::error!("Window hand-off failed: {}", e);
                self.buffer.discard_completed();
                SampleOutcome::Stored(state)
            }
        }
    }

    /// Sample forever at `period`.
    pub fn run(mut self, period: Duration) -> ! {
        log::info!("Sampler task started ({} ms period)", period.as_millis());

        let mut timer = PeriodicTimer::new(period);
        loop {
            self.step();
            let missed = timer.wait();
            if missed > 0 {
                log::debug!("Sampler overran by {} period(s)", missed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SEQUENCE_LENGTH;
    use crate::error::{PipelineError, Result};
    use crate::events::Sample;
    use std::collections::VecDeque;

    /// Plays back scripted reads, then repeats zero samples.
    struct ScriptedSource {
        script: VecDeque<Result<Sample>>,
        tick: u64,
    }

    impl ScriptedSource {
        fn zeros() -> Self {
            Self {
                script: VecDeque::new(),
                tick: 0,
            }
        }

        fn failing(n: usize) -> Self {
            Self {
                script: (0..n)
                    .map(|_| Err(PipelineError::Io("i2c timeout".into())))
                    .collect(),
                tick: 0,
            }
        }
    }

    impl SampleSource for ScriptedSource {
        fn read(&mut self) -> Result<Sample> {
            self.tick += 1;
            self.script.pop_front().unwrap_or(Ok(Sample {
                timestamp_us: self.tick * 20_000,
                ..Sample::default()
            }))
        }
    }

    #[test]
    fn test_read_failures_skip_without_touching_buffer() {
        let shared = Shared::new();
        let mut sampler = Sampler::new(ScriptedSource::failing(5), &shared);

        for _ in 0..5 {
            assert_eq!(sampler.step(), SampleOutcome::Skipped);
        }
        assert_eq!(sampler.buffer().cursor(), 0);
        assert_eq!(PipelineStats::read(&shared.stats.samples_skipped), 5);
        assert_eq!(PipelineStats::read(&shared.stats.samples_taken), 0);

        // Recovers on the next good read.
        assert_eq!(
            sampler.step(),
            SampleOutcome::Stored(BufferState::Filling)
        );
        assert_eq!(sampler.buffer().cursor(), 1);
    }

    #[test]
    fn test_window_completes_on_last_sample() {
        let shared = Shared::new();
        let mut sampler = Sampler::new(ScriptedSource::zeros(), &shared);

        for _ in 0..SEQUENCE_LENGTH - 1 {
            assert_eq!(
                sampler.step(),
                SampleOutcome::Stored(BufferState::Filling)
            );
        }
        assert!(!shared.exchange.is_ready());

        assert_eq!(
            sampler.step(),
            SampleOutcome::Completed(Handoff::Delivered)
        );
        assert!(shared.exchange.is_ready());
        assert_eq!(sampler.buffer().cursor(), 0);
        assert_eq!(shared.gauge.cursor(), 0);
        assert_eq!(PipelineStats::read(&shared.stats.windows_completed), 1);
    }

    #[test]
    fn test_busy_consumer_counts_dropped_window() {
        let shared = Shared::new();
        let mut sampler = Sampler::new(ScriptedSource::zeros(), &shared);

        for _ in 0..SEQUENCE_LENGTH {
            sampler.step();
        }
        let _held = shared
            .exchange
            .wait_window(Duration::from_millis(1))
            .expect("window");

        for _ in 0..SEQUENCE_LENGTH - 1 {
            sampler.step();
        }
        assert_eq!(sampler.step(), SampleOutcome::Completed(Handoff::Dropped));
        assert_eq!(PipelineStats::read(&shared.stats.windows_dropped), 1);
        assert_eq!(PipelineStats::read(&shared.stats.windows_completed), 2);
    }
}
