pub mod clarify;
pub mod decision;
pub mod fallback;
pub mod gate;

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::inference::{ClassificationResult, Classifier};

use clarify::Clarifier;
use decision::{DecisionSource, PipelineDecision};
use fallback::FallbackResolver;
use gate::{ConfidenceGate, GateDecision};

/// Primary model → confidence gate → fallback resolver, one input at a time.
pub struct SentimentPipeline<P, B> {
    primary: P,
    backup: B,
    gate: ConfidenceGate,
    resolver: FallbackResolver,
}

impl<P: Classifier, B: Classifier> SentimentPipeline<P, B> {
    pub fn new(primary: P, backup: B, gate: ConfidenceGate, resolver: FallbackResolver) -> Self {
        Self {
            primary,
            backup,
            gate,
            resolver,
        }
    }

    pub fn run<C: Clarifier>(&self, text: &str, clarifier: &mut C) -> Result<PipelineDecision> {
        let started = Instant::now();
        let id = Uuid::new_v4();
        let span = info_span!("decision", decision_id = %id);
        let _enter = span.enter();

        let primary = self.infer(text)?;

        let (final_label, backup, source) = match self.gate.check(&primary) {
            GateDecision::Accept => {
                info!(stage = "fallback", label = %primary.label(), "accepted prediction");
                (primary.label(), None, DecisionSource::Primary)
            }
            GateDecision::Fallback => {
                let backup = self
                    .backup
                    .classify(text)
                    .with_context(|| format!("{} classifier failed", self.backup.name()))?;
                info!(
                    stage = "fallback",
                    label = %backup.label(),
                    confidence = backup.confidence(),
                    "backup model prediction"
                );
                let (label, source) = self.resolver.resolve(&primary, &backup, clarifier)?;
                (label, Some(backup), source)
            }
        };

        info!(
            stage = "decision",
            label = %final_label,
            %source,
            "final label"
        );

        Ok(PipelineDecision {
            id,
            input: text.to_string(),
            final_label,
            primary,
            backup,
            source,
            threshold: self.gate.threshold(),
            decided_at: Utc::now(),
            elapsed: started.elapsed(),
        })
    }

    fn infer(&self, text: &str) -> Result<ClassificationResult> {
        let result = self
            .primary
            .classify(text)
            .with_context(|| format!("{} classifier failed", self.primary.name()))?;
        info!(
            stage = "inference",
            input = %text,
            label = %result.label(),
            confidence = result.confidence(),
            "predicted {} ({:.2})",
            result.label(),
            result.confidence()
        );
        Ok(result)
    }
}
