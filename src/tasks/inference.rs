// FallWatch — Inference Task
//
// WaitingForWindow -> Classifying -> Publishing -> WaitingForWindow
//
// Waits (bounded by the poll interval) for a completed window, normalises it
// in place, runs the classifier, applies the decision policy and overwrites
// the retained result.  A classifier failure is logged and the previous
// result stays in place.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::classifier::{timed_infer, Classifier};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::events::{InferenceResult, Probabilities};
use crate::normalize::normalize_in_place;
use crate::policy::DecisionPolicy;
use crate::telemetry::{PipelineStats, ResultSink, ResultStore};
use crate::window::{Window, WindowExchange};

use super::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceState {
    WaitingForWindow,
    Classifying,
    Publishing,
}

pub struct InferenceWorker<C: Classifier, K: ResultSink> {
    classifier: C,
    sink: K,
    policy: DecisionPolicy,
    exchange: Arc<WindowExchange>,
    results: Arc<ResultStore>,
    stats: Arc<PipelineStats>,
    poll_interval: Duration,
    post_publish_delay: Duration,
    state: InferenceState,
}

impl<C: Classifier, K: ResultSink> InferenceWorker<C, K> {
    pub fn new(classifier: C, sink: K, shared: &Shared, config: &PipelineConfig) -> Self {
        Self {
            classifier,
            sink,
            policy: DecisionPolicy::new(config.alert_threshold),
            exchange: Arc::clone(&shared.exchange),
            results: Arc::clone(&shared.results),
            stats: Arc::clone(&shared.stats),
            poll_interval: config.poll_interval,
            post_publish_delay: config.post_publish_delay,
            state: InferenceState::WaitingForWindow,
        }
    }

    pub fn state(&self) -> InferenceState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Normalise and classify a window the caller owns.
    pub fn classify(&mut self, window: &mut Window) -> Result<(Probabilities, Duration)> {
        normalize_in_place(window.data_mut())?;
        timed_infer(&mut self.classifier, window.data())
    }

    /// One pass through the state machine.
    ///
    /// `Ok(None)` means no window arrived within the poll interval.
    pub fn cycle(&mut self) -> Result<Option<InferenceResult>> {
        self.state = InferenceState::WaitingForWindow;
        let Some(mut window) = self.exchange.wait_window(self.poll_interval) else {
            return Ok(None);
        };

        self.state = InferenceState::Classifying;
        let completed_at_us = window.completed_at_us();
        let outcome = self.classify(&mut window);
        // Storage goes back to the sampler whatever the outcome.
        self.exchange.recycle(window);

        let (probabilities, elapsed) = match outcome {
            Ok(v) => v,
            Err(e) => {
                PipelineStats::bump(&self.stats.inference_failures);
                self.state = InferenceState::WaitingForWindow;
                return Err(e);
            }
        };

        self.state = InferenceState::Publishing;
        let result = self.policy.decide(probabilities, elapsed, completed_at_us);
        self.results.publish(result);
        PipelineStats::bump(&self.stats.inferences);
        self.sink.on_result(&result);

        self.state = InferenceState::WaitingForWindow;
        Ok(Some(result))
    }

    pub fn run(mut self) -> ! {
        log::info!("Inference task started");

        loop {
            match self.cycle() {
                Ok(Some(_)) => thread::sleep(self.post_publish_delay),
                Ok(None) => {}
                Err(e) => log::error!("Inference failed: {}", e),
            }
        }
    }
}
