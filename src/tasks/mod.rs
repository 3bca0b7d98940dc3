// FallWatch — Tasks
//
// sampler   (prio 5) — reads the IMU every 20 ms and fills the window.
// inference (prio 4) — classifies each completed window.
// status    (prio 3) — periodic status report.
// The boot thread stays behind as the supervisor.

pub mod inference;
pub mod sampler;
pub mod status;
pub mod supervisor;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::telemetry::{PipelineStats, ResultStore};
use crate::window::{BufferGauge, Window, WindowExchange};

/// Handles shared between the tasks, created once at boot.
#[derive(Clone)]
pub struct Shared {
    pub exchange: Arc<WindowExchange>,
    pub gauge: Arc<BufferGauge>,
    pub stats: Arc<PipelineStats>,
    pub results: Arc<ResultStore>,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            exchange: Arc::new(WindowExchange::new(Window::zeroed())),
            gauge: Arc::new(BufferGauge::default()),
            stats: Arc::new(PipelineStats::default()),
            results: Arc::new(ResultStore::new()),
        }
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute-deadline periodic wake (the `vTaskDelayUntil` pattern): each
/// deadline is the previous one plus the period, so time spent inside an
/// iteration does not shift the phase.
pub struct PeriodicTimer {
    period: Duration,
    next_wake: Instant,
}

impl PeriodicTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_wake: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next deadline. Returns how many whole periods were
    /// missed; after an overrun of more than one period the schedule is
    /// re-anchored instead of bursting to catch up.
    pub fn wait(&mut self) -> u32 {
        let now = Instant::now();
        let mut missed = 0;

        if self.next_wake > now {
            thread::sleep(self.next_wake - now);
        } else if !self.period.is_zero() {
            let behind = now - self.next_wake;
            missed = (behind.as_nanos() / self.period.as_nanos()) as u32;
            if missed > 0 {
                self.next_wake = now;
            }
        }

        self.next_wake += self.period;
        missed
    }
}
