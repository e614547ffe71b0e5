use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::inference::{ClassificationResult, Label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionSource {
    Primary,
    Backup,
    User,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionSource::Primary => "PRIMARY",
            DecisionSource::Backup => "BACKUP",
            DecisionSource::User => "USER",
        };
        f.write_str(name)
    }
}

/// Everything the pipeline concluded about one input.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineDecision {
    pub id: Uuid,
    pub input: String,
    pub final_label: Label,
    pub primary: ClassificationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<ClassificationResult>,
    pub source: DecisionSource,
    pub threshold: f32,
    pub decided_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl PipelineDecision {
    /// The one-line summary printed after every review.
    pub fn summary_line(&self) -> String {
        let (backup_label, backup_conf) = match &self.backup {
            Some(b) => (b.label().as_str(), b.confidence()),
            None => ("N/A", 0.0),
        };
        format!(
            "Final Label: {} (main conf: {:.2}, backup: {} ({:.2}))",
            self.final_label,
            self.primary.confidence(),
            backup_label,
            backup_conf
        )
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}
