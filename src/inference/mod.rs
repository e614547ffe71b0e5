pub mod device;
pub mod sentiment_classifier;
pub mod snapshot;
pub mod zero_shot;

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::error::SentigateError;

/// Fixed id map of the fine-tuned checkpoint (`LABEL_0`, `LABEL_1`).
const LABEL_MAP: [Label; 2] = [Label::Negative, Label::Positive];

/// Candidate labels offered to the zero-shot model, in display form.
pub const CANDIDATE_LABELS: &[&str] = &["POSITIVE", "NEGATIVE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Positive,
    Negative,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Positive => "POSITIVE",
            Label::Negative => "NEGATIVE",
        }
    }

    pub fn from_id(id: usize) -> Option<Self> {
        LABEL_MAP.get(id).copied()
    }

    /// Maps whatever a checkpoint calls its classes onto the binary domain.
    ///
    /// Accepts `LABEL_<n>` ids as well as named labels in any case.
    pub fn from_model_label(raw: &str) -> Result<Self, SentigateError> {
        let trimmed = raw.trim();
        if let Some(id) = trimmed
            .rsplit('_')
            .next()
            .filter(|_| trimmed.to_ascii_uppercase().starts_with("LABEL_"))
            .and_then(|n| n.parse::<usize>().ok())
        {
            return Label::from_id(id).ok_or_else(|| SentigateError::UnknownLabel(raw.to_string()));
        }
        trimmed.parse()
    }
}

impl FromStr for Label {
    type Err = SentigateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" | "POS" => Ok(Label::Positive),
            "NEGATIVE" | "NEG" => Ok(Label::Negative),
            _ => Err(SentigateError::UnknownLabel(s.to_string())),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one classifier call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationResult {
    label: Label,
    confidence: f32,
}

impl ClassificationResult {
    pub fn new(label: Label, confidence: f32) -> Result<Self, SentigateError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(SentigateError::ConfidenceOutOfRange(confidence));
        }
        Ok(Self { label, confidence })
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Anything that turns review text into a binary sentiment prediction.
pub trait Classifier {
    fn name(&self) -> &str;

    fn classify(&self, text: &str) -> Result<ClassificationResult>;
}

pub fn logits_argmax(logits: &[f32]) -> Result<(usize, f32)> {
    logits
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| anyhow!("empty logits tensor"))
}
