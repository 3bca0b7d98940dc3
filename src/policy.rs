// FallWatch — Decision Policy
//
// Turns a probability vector into a label, a confidence and the fall alert.
// The alert threshold belongs to this layer, not to the model.

use std::time::Duration;

use crate::events::{ClassLabel, InferenceResult, Probabilities};

/// Arg-max over `probabilities`. Exact ties resolve to the lowest index.
pub fn predicted_class(probabilities: &Probabilities) -> ClassLabel {
    let mut best_idx = 0;
    let mut best = probabilities[0];
    for (i, &p) in probabilities.iter().enumerate().skip(1) {
        if p > best {
            best = p;
            best_idx = i;
        }
    }
    ClassLabel::from_index(best_idx).unwrap_or_default()
}

/// Probability of the predicted class.
pub fn confidence(probabilities: &Probabilities) -> f32 {
    probabilities[predicted_class(probabilities).index()]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    pub alert_threshold: f32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            alert_threshold: 0.7,
        }
    }
}

impl DecisionPolicy {
    pub fn new(alert_threshold: f32) -> Self {
        Self { alert_threshold }
    }

    /// Fall, and strictly more confident than the threshold.
    pub fn is_alert(&self, predicted: ClassLabel, confidence: f32) -> bool {
        predicted == ClassLabel::Fall && confidence > self.alert_threshold
    }

    pub fn decide(
        &self,
        probabilities: Probabilities,
        inference_time: Duration,
        window_timestamp_us: u64,
    ) -> InferenceResult {
        let predicted_class = predicted_class(&probabilities);
        let confidence = probabilities[predicted_class.index()];
        InferenceResult {
            probabilities,
            predicted_class,
            confidence,
            inference_time,
            window_timestamp_us,
            alert: self.is_alert(predicted_class, confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        let probs = [0.2, 0.2, 0.6, 0.0, 0.0];
        assert_eq!(predicted_class(&probs), ClassLabel::NearFall);
        assert_eq!(confidence(&probs), 0.6);

        let tied = [0.1, 0.4, 0.1, 0.4, 0.0];
        assert_eq!(predicted_class(&tied), ClassLabel::Fall);

        let flat = [0.2; 5];
        assert_eq!(predicted_class(&flat), ClassLabel::Normal);
    }

    #[test]
    fn alert_rule() {
        let policy = DecisionPolicy::default();
        assert!(policy.is_alert(ClassLabel::Fall, 0.71));
        assert!(!policy.is_alert(ClassLabel::Fall, 0.70));
        assert!(!policy.is_alert(ClassLabel::Normal, 0.95));
        assert!(!policy.is_alert(ClassLabel::NearFall, 0.99));
    }

    #[test]
    fn decide_fills_every_field() {
        let policy = DecisionPolicy::default();
        let result = policy.decide(
            [0.1, 0.75, 0.05, 0.05, 0.05],
            Duration::from_millis(50),
            6_020_000,
        );
        assert_eq!(result.predicted_class, ClassLabel::Fall);
        assert_eq!(result.confidence, 0.75);
        assert!(result.alert);
        assert_eq!(result.inference_time, Duration::from_millis(50));
        assert_eq!(result.window_timestamp_us, 6_020_000);
    }

    #[test]
    fn custom_threshold() {
        let policy = DecisionPolicy::new(0.9);
        assert!(!policy.is_alert(ClassLabel::Fall, 0.85));
        assert!(policy.is_alert(ClassLabel::Fall, 0.91));
    }
}
