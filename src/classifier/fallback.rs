use anyhow::Result;
use tracing::{info, warn};

use super::clarify::Clarifier;
use super::decision::DecisionSource;
use crate::error::SentigateError;
use crate::inference::{ClassificationResult, Label};

/// One invalid answer keeps the backup label unless more attempts are configured.
pub const DEFAULT_CLARIFY_ATTEMPTS: usize = 1;

const CLARIFY_PROMPT: &str = "They disagree. Please clarify (POSITIVE/NEGATIVE): ";

/// Settles a low-confidence primary prediction using the backup model and,
/// when the two disagree, the operator.
#[derive(Debug, Clone, Copy)]
pub struct FallbackResolver {
    clarify_attempts: usize,
}

impl FallbackResolver {
    pub fn new(clarify_attempts: usize) -> Result<Self, SentigateError> {
        if clarify_attempts == 0 {
            return Err(SentigateError::InvalidConfig {
                field: "clarify_attempts",
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self { clarify_attempts })
    }

    pub fn resolve<C: Clarifier>(
        &self,
        primary: &ClassificationResult,
        backup: &ClassificationResult,
        clarifier: &mut C,
    ) -> Result<(Label, DecisionSource)> {
        clarifier.notify(&format!(
            "[FallbackNode] Backup Model suggests: {} (conf: {:.2})",
            backup.label(),
            backup.confidence()
        ))?;

        if backup.label() == primary.label() {
            info!(
                stage = "fallback",
                label = %backup.label(),
                "backup agrees with main model, accepting"
            );
            return Ok((backup.label(), DecisionSource::Backup));
        }

        clarifier.notify(&format!(
            "[FallbackNode] Main model = {} (conf: {:.2}), Backup model = {} (conf: {:.2})",
            primary.label(),
            primary.confidence(),
            backup.label(),
            backup.confidence()
        ))?;

        for attempt in 1..=self.clarify_attempts {
            let Some(answer) = clarifier.ask(CLARIFY_PROMPT)? else {
                warn!(stage = "fallback", "input closed while waiting for clarification");
                break;
            };
            if is_full_label(&answer) {
                let label: Label = answer.parse()?;
                info!(stage = "fallback", label = %label, attempt, "user clarified");
                return Ok((label, DecisionSource::User));
            }
            warn!(stage = "fallback", answer = %answer.trim(), attempt, "invalid clarification");
            if attempt < self.clarify_attempts {
                clarifier.notify("Invalid input. Please answer POSITIVE or NEGATIVE.")?;
            }
        }

        clarifier.notify("Invalid input. Keeping backup model prediction.")?;
        info!(
            stage = "fallback",
            label = %backup.label(),
            "no valid clarification, keeping backup prediction"
        );
        Ok((backup.label(), DecisionSource::Backup))
    }
}

impl Default for FallbackResolver {
    fn default() -> Self {
        Self {
            clarify_attempts: DEFAULT_CLARIFY_ATTEMPTS,
        }
    }
}

/// Operators must type the whole label; the short model aliases don't count.
fn is_full_label(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_uppercase().as_str(),
        "POSITIVE" | "NEGATIVE"
    )
}
