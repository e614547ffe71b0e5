use tracing::info;

use crate::error::SentigateError;
use crate::inference::ClassificationResult;

pub const DEFAULT_THRESHOLD: f32 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Fallback,
}

/// Accepts a primary prediction only when its confidence clears the threshold.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Result<Self, SentigateError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SentigateError::InvalidConfig {
                field: "threshold",
                reason: format!("{threshold} is outside [0, 1]"),
            });
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn check(&self, result: &ClassificationResult) -> GateDecision {
        let conf = result.confidence();
        if conf >= self.threshold {
            GateDecision::Accept
        } else {
            info!(
                stage = "confidence_check",
                confidence = conf,
                threshold = self.threshold,
                "low confidence ({conf:.2}), triggering fallback"
            );
            GateDecision::Fallback
        }
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Label;

    fn result(conf: f32) -> ClassificationResult {
        ClassificationResult::new(Label::Positive, conf).unwrap()
    }

    #[test]
    fn accepts_at_and_above_threshold() {
        let gate = ConfidenceGate::new(0.7).unwrap();
        assert_eq!(gate.check(&result(0.92)), GateDecision::Accept);
        assert_eq!(gate.check(&result(0.7)), GateDecision::Accept);
        assert_eq!(gate.check(&result(1.0)), GateDecision::Accept);
    }

    #[test]
    fn falls_back_below_threshold() {
        let gate = ConfidenceGate::new(0.75).unwrap();
        assert_eq!(gate.check(&result(0.62)), GateDecision::Fallback);
        assert_eq!(gate.check(&result(0.7499)), GateDecision::Fallback);
    }

    #[test]
    fn zero_threshold_accepts_everything() {
        let gate = ConfidenceGate::new(0.0).unwrap();
        assert_eq!(gate.check(&result(0.0)), GateDecision::Accept);
    }

    #[test]
    fn rejects_thresholds_outside_unit_interval() {
        assert!(ConfidenceGate::new(1.5).is_err());
        assert!(ConfidenceGate::new(-0.1).is_err());
        assert!(ConfidenceGate::new(f32::NAN).is_err());
    }

    #[test]
    fn default_threshold_is_seventy_percent() {
        assert_eq!(ConfidenceGate::default().threshold(), DEFAULT_THRESHOLD);
    }
}
