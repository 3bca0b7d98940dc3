// FallWatch — Result publication & status reporting
//
// `ResultStore` retains the single most recent inference result; `None` means
// nothing valid has been published yet.  `PipelineStats` are plain counters
// bumped by the sampler and inference tasks.  A `ResultSink` receives every
// published result and the periodic status report.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::config::{NUM_CLASSES, SEQUENCE_LENGTH};
use crate::events::{ClassLabel, InferenceResult};

// ---------------------------------------------------------------------------
// Retained last result
// ---------------------------------------------------------------------------
#[derive(Debug, Default)]
pub struct ResultStore {
    last: Mutex<Option<InferenceResult>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the retained result. Readers see either the old or the new
    /// value, never a mix.
    pub fn publish(&self, result: InferenceResult) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
    }

    pub fn latest(&self) -> Option<InferenceResult> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub samples_taken: AtomicU32,
    pub samples_skipped: AtomicU32,
    pub windows_completed: AtomicU32,
    pub windows_dropped: AtomicU32,
    pub inferences: AtomicU32,
    pub inference_failures: AtomicU32,
}

impl PipelineStats {
    pub fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Status report
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub uptime: Duration,
    /// Free heap in bytes; only known on target.
    pub free_heap: Option<u32>,
    pub min_free_heap: Option<u32>,
    pub buffer_cursor: usize,
    pub buffer_fill: f32,
    /// A completed window is waiting for the inference task.
    pub window_pending: bool,
    /// Time since the last sample landed in the buffer; `None` before the first.
    pub last_update_age: Option<Duration>,
    pub samples_taken: u32,
    pub samples_skipped: u32,
    pub windows_completed: u32,
    pub windows_dropped: u32,
    pub inferences: u32,
    pub inference_failures: u32,
    pub last_result: Option<InferenceResult>,
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------
pub trait ResultSink: Send {
    fn on_result(&mut self, result: &InferenceResult);
    fn on_status(&mut self, status: &StatusReport);
}

/// Console sink: everything goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn on_result(&mut self, result: &InferenceResult) {
        log::info!(
            "Predicted: {} ({:.3}) in {} us",
            result.predicted_class.display_name(),
            result.confidence,
            result.inference_time.as_micros()
        );
        for (label, p) in ClassLabel::ALL.iter().zip(result.probabilities.iter()) {
            log::info!("  {}: {:.3}", label.display_name(), p);
        }
        if result.alert {
            log::error!("FALL DETECTED! Confidence: {:.3}", result.confidence);
        }
    }

    fn on_status(&mut self, status: &StatusReport) {
        log::info!("=== System Status ===");
        log::info!("Uptime: {} s", status.uptime.as_secs());
        if let (Some(free), Some(min)) = (status.free_heap, status.min_free_heap) {
            log::info!("Free heap: {} bytes (min {})", free, min);
        }
        log::info!(
            "Buffer: {}/{} ({:.0}%), pending: {}",
            status.buffer_cursor,
            SEQUENCE_LENGTH,
            status.buffer_fill * 100.0,
            status.window_pending
        );
        match status.last_update_age {
            Some(age) => log::info!("Last sample: {} ms ago", age.as_millis()),
            None => log::info!("Last sample: never"),
        }
        log::info!(
            "Samples: {} taken, {} skipped | Windows: {} completed, {} dropped | Inferences: {} ok, {} failed",
            status.samples_taken,
            status.samples_skipped,
            status.windows_completed,
            status.windows_dropped,
            status.inferences,
            status.inference_failures
        );
        if let Some(result) = &status.last_result {
            log::info!(
                "Last inference: {} ({:.3})",
                result.predicted_class.display_name(),
                result.confidence
            );
        }
    }
}

/// Sink that keeps everything it receives. Used by tests and host tooling.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub results: Vec<InferenceResult>,
    pub statuses: Vec<StatusReport>,
}

impl ResultSink for MemorySink {
    fn on_result(&mut self, result: &InferenceResult) {
        self.results.push(*result);
    }

    fn on_status(&mut self, status: &StatusReport) {
        self.statuses.push(status.clone());
    }
}

impl<S: ResultSink + ?Sized> ResultSink for std::sync::Arc<Mutex<S>> {
    fn on_result(&mut self, result: &InferenceResult) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_result(result);
    }

    fn on_status(&mut self, status: &StatusReport) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_status(status);
    }
}

const _: () = assert!(NUM_CLASSES == ClassLabel::ALL.len());

#[cfg(test)]
mod tests {
    use super::*;

    fn result(confidence: f32) -> InferenceResult {
        InferenceResult {
            probabilities: [confidence, 0.0, 0.0, 0.0, 0.0],
            predicted_class: ClassLabel::Normal,
            confidence,
            inference_time: Duration::from_millis(50),
            window_timestamp_us: 0,
            alert: false,
        }
    }

    #[test]
    fn store_starts_invalid() {
        assert_eq!(ResultStore::new().latest(), None);
    }

    #[test]
    fn store_keeps_only_latest() {
        let store = ResultStore::new();
        store.publish(result(0.5));
        store.publish(result(0.9));
        assert_eq!(store.latest().map(|r| r.confidence), Some(0.9));
    }

    #[test]
    fn counters_bump() {
        let stats = PipelineStats::default();
        PipelineStats::bump(&stats.samples_skipped);
        PipelineStats::bump(&stats.samples_skipped);
        assert_eq!(PipelineStats::read(&stats.samples_skipped), 2);
        assert_eq!(PipelineStats::read(&stats.samples_taken), 0);
    }
}
