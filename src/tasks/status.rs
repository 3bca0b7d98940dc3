// FallWatch — Status Task
//
// Lowest-priority task.  Ticks once a second on an absolute schedule and
// emits a full status report every `status_interval`.

use std::time::{Duration, Instant};

use crate::config::STATUS_TICK_MS;
use crate::platform;
use crate::telemetry::{PipelineStats, ResultSink, StatusReport};

use super::{PeriodicTimer, Shared};

/// Milliseconds from `last_ms` to `now_ms` on the wrapping u32 clock.
/// An update stamped after `now_ms` counts as zero age.
fn age_ms(now_ms: u32, last_ms: u32) -> u32 {
    let age = now_ms.wrapping_sub(last_ms);
    if age > u32::MAX / 2 {
        0
    } else {
        age
    }
}

pub struct StatusMonitor<K: ResultSink> {
    shared: Shared,
    sink: K,
    boot: Instant,
    interval: Duration,
}

impl<K: ResultSink> StatusMonitor<K> {
    pub fn new(shared: &Shared, sink: K, interval: Duration) -> Self {
        Self {
            shared: shared.clone(),
            sink,
            boot: Instant::now(),
            interval,
        }
    }

    pub fn report(&self) -> StatusReport {
        let stats = &self.shared.stats;
        let gauge = &self.shared.gauge;
        let samples_taken = PipelineStats::read(&stats.samples_taken);

        let last_update_age = (samples_taken > 0).then(|| {
            let now_ms = (platform::now_us() / 1000) as u32;
            Duration::from_millis(u64::from(age_ms(now_ms, gauge.last_update_ms())))
        });
        let heap = platform::heap_stats();

        StatusReport {
            uptime: self.boot.elapsed(),
            free_heap: heap.map(|(free, _)| free),
            min_free_heap: heap.map(|(_, min)| min),
            buffer_cursor: gauge.cursor(),
            buffer_fill: gauge.fill_fraction(),
            window_pending: self.shared.exchange.is_ready(),
            last_update_age,
            samples_taken,
            samples_skipped: PipelineStats::read(&stats.samples_skipped),
            windows_completed: PipelineStats::read(&stats.windows_completed),
            windows_dropped: PipelineStats::read(&stats.windows_dropped),
            inferences: PipelineStats::read(&stats.inferences),
            inference_failures: PipelineStats::read(&stats.inference_failures),
            last_result: self.shared.results.latest(),
        }
    }

    /// Build a report and hand it to the sink.
    pub fn emit(&mut self) {
        let report = self.report();
        self.sink.on_status(&report);
    }

    pub fn run(mut self) -> ! {
        log::info!("Status task started");

        let tick = Duration::from_millis(STATUS_TICK_MS);
        let ticks_per_report = (self.interval.as_millis() / tick.as_millis()).max(1) as u64;
        let mut timer = PeriodicTimer::new(tick);
        let mut counter: u64 = 0;

        loop {
            counter += 1;
            if counter % ticks_per_report == 0 {
                self.emit();
            }
            timer.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PlaceholderClassifier;
    use crate::config::{PipelineConfig, SEQUENCE_LENGTH};
    use crate::drivers::synthetic::SyntheticImu;
    use crate::events::ClassLabel;
    use crate::tasks::inference::InferenceWorker;
    use crate::tasks::sampler::Sampler;
    use crate::telemetry::MemorySink;

    #[test]
    fn report_before_any_sample() {
        let shared = Shared::new();
        let monitor = StatusMonitor::new(&shared, MemorySink::default(), Duration::from_secs(10));
        let report = monitor.report();

        assert_eq!(report.buffer_cursor, 0);
        assert_eq!(report.buffer_fill, 0.0);
        assert_eq!(report.last_update_age, None);
        assert!(!report.window_pending);
        assert_eq!(report.last_result, None);
    }

    #[test]
    fn age_never_wraps() {
        assert_eq!(age_ms(1_000, 400), 600);
        assert_eq!(age_ms(1_000, 1_020), 0);
        // Clock wrapped between update and report.
        assert_eq!(age_ms(5, u32::MAX - 4), 10);
    }

    #[test]
    fn last_update_age_is_fresh_after_a_sample() {
        let shared = Shared::new();
        let mut sampler = Sampler::new(SyntheticImu::new(50), &shared);
        sampler.step();

        let monitor = StatusMonitor::new(&shared, MemorySink::default(), Duration::from_secs(10));
        let age = monitor.report().last_update_age.expect("age");
        assert!(age < Duration::from_secs(1), "{age:?}");
    }

    #[test]
    fn report_reflects_pipeline_progress() {
        let shared = Shared::new();
        let config = PipelineConfig {
            poll_interval: Duration::from_millis(5),
            ..PipelineConfig::default()
        };
        let mut sampler = Sampler::new(SyntheticImu::new(50).with_failures(7), &shared);
        let mut classifier = PlaceholderClassifier::new([0.1, 0.2, 0.3, 0.4, 0.0], Duration::ZERO);
        classifier.load().expect("load");
        let mut worker = InferenceWorker::new(classifier, MemorySink::default(), &shared, &config);

        // Run until one window has completed, then classify it.
        while PipelineStats::read(&shared.stats.windows_completed) == 0 {
            sampler.step();
        }
        worker.cycle().expect("cycle").expect("result");
        for _ in 0..30 {
            sampler.step();
        }

        let mut monitor = StatusMonitor::new(&shared, MemorySink::default(), Duration::from_secs(10));
        monitor.emit();
        let report = &monitor.sink.statuses[0];

        assert_eq!(report.windows_completed, 1);
        assert_eq!(report.inferences, 1);
        assert!(report.samples_skipped > 0);
        assert_eq!(
            report.samples_taken as usize,
            SEQUENCE_LENGTH + report.buffer_cursor
        );
        assert!(report.buffer_fill > 0.0 && report.buffer_fill < 1.0);
        assert!(report.last_update_age.expect("age") < Duration::from_secs(1));
        assert_eq!(
            report.last_result.map(|r| r.predicted_class),
            Some(ClassLabel::Sitting)
        );
    }
}
