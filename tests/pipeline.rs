use std::collections::HashMap;
use std::io::Cursor;

use anyhow::{anyhow, Result};
use sentigate::classifier::clarify::TerminalClarifier;
use sentigate::classifier::decision::DecisionSource;
use sentigate::classifier::fallback::FallbackResolver;
use sentigate::classifier::gate::ConfidenceGate;
use sentigate::classifier::SentimentPipeline;
use sentigate::cli::{self, OutputFormat, BANNER};
use sentigate::inference::{ClassificationResult, Classifier, Label};

/// Canned predictions keyed by input text.
struct Lookup {
    name: &'static str,
    table: HashMap<&'static str, (Label, f32)>,
}

impl Lookup {
    fn new(name: &'static str, entries: &[(&'static str, Label, f32)]) -> Self {
        Self {
            name,
            table: entries.iter().map(|(t, l, c)| (*t, (*l, *c))).collect(),
        }
    }
}

impl Classifier for Lookup {
    fn name(&self) -> &str {
        self.name
    }

    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let (label, conf) = self
            .table
            .get(text)
            .ok_or_else(|| anyhow!("no canned prediction for '{text}'"))?;
        Ok(ClassificationResult::new(*label, *conf)?)
    }
}

fn pipeline() -> SentimentPipeline<Lookup, Lookup> {
    let primary = Lookup::new(
        "primary",
        &[
            ("Best movie of the year", Label::Positive, 0.92),
            ("It was fine I guess", Label::Positive, 0.62),
            ("Not my cup of tea", Label::Negative, 0.58),
        ],
    );
    let backup = Lookup::new(
        "backup",
        &[
            ("It was fine I guess", Label::Negative, 0.81),
            ("Not my cup of tea", Label::Negative, 0.77),
        ],
    );
    SentimentPipeline::new(
        primary,
        backup,
        ConfidenceGate::new(0.70).unwrap(),
        FallbackResolver::new(2).unwrap(),
    )
}

#[test]
fn confident_review_is_accepted_from_primary() {
    let pipeline = pipeline();
    let mut out = Vec::new();
    let mut terminal = TerminalClarifier::new(Cursor::new(""), &mut out);
    let decision = cli::run_once(
        &pipeline,
        &mut terminal,
        "Best movie of the year",
        OutputFormat::Summary,
    )
    .unwrap();
    assert_eq!(decision.final_label, Label::Positive);
    assert_eq!(decision.source, DecisionSource::Primary);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Final Label: POSITIVE (main conf: 0.92, backup: N/A (0.00))\n"
    );
}

#[test]
fn disagreement_uses_operator_answer() {
    let pipeline = pipeline();
    let mut out = Vec::new();
    let mut terminal = TerminalClarifier::new(Cursor::new("NEGATIVE\n"), &mut out);
    let decision = cli::run_once(
        &pipeline,
        &mut terminal,
        "It was fine I guess",
        OutputFormat::Summary,
    )
    .unwrap();
    assert_eq!(decision.final_label, Label::Negative);
    assert_eq!(decision.source, DecisionSource::User);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("[FallbackNode] Backup Model suggests: NEGATIVE (conf: 0.81)"));
    assert!(printed.contains("They disagree. Please clarify (POSITIVE/NEGATIVE): "));
    assert!(printed.ends_with("Final Label: NEGATIVE (main conf: 0.62, backup: NEGATIVE (0.81))\n"));
}

#[test]
fn repl_handles_a_session_until_quit() {
    let pipeline = pipeline();
    let script = "Best movie of the year\n\nNot my cup of tea\nunknown review\nIt was fine I guess\nmaybe\npositive\nQUIT\nnever reached\n";
    let mut out = Vec::new();
    let mut terminal = TerminalClarifier::new(Cursor::new(script), &mut out);

    let handled = cli::run_repl(&pipeline, &mut terminal, OutputFormat::Summary).unwrap();
    assert_eq!(handled, 3);

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with(BANNER));
    assert!(printed.contains("Final Label: POSITIVE (main conf: 0.92, backup: N/A (0.00))"));
    assert!(printed.contains("Final Label: NEGATIVE (main conf: 0.58, backup: NEGATIVE (0.77))"));
    assert!(printed.contains("Error: primary classifier failed"));
    assert!(printed.contains("Invalid input. Please answer POSITIVE or NEGATIVE."));
    assert!(printed.contains("Final Label: POSITIVE (main conf: 0.62, backup: NEGATIVE (0.81))"));
    assert!(printed.trim_end().ends_with("Exiting..."));
}

#[test]
fn repl_stops_at_end_of_input() {
    let pipeline = pipeline();
    let mut out = Vec::new();
    let mut terminal = TerminalClarifier::new(Cursor::new("Best movie of the year\n"), &mut out);
    let handled = cli::run_repl(&pipeline, &mut terminal, OutputFormat::Summary).unwrap();
    assert_eq!(handled, 1);
    assert!(String::from_utf8(out).unwrap().trim_end().ends_with("Exiting..."));
}

#[test]
fn json_output_carries_the_whole_decision() {
    let pipeline = pipeline();
    let mut out = Vec::new();
    let mut terminal = TerminalClarifier::new(Cursor::new(""), &mut out);
    cli::run_once(&pipeline, &mut terminal, "Not my cup of tea", OutputFormat::Json).unwrap();

    let printed = String::from_utf8(out).unwrap();
    let json_line = printed.lines().last().unwrap();
    let value: serde_json::Value = serde_json::from_str(json_line).unwrap();
    assert_eq!(value["final_label"], "NEGATIVE");
    assert_eq!(value["source"], "BACKUP");
    assert_eq!(value["primary"]["label"], "NEGATIVE");
    assert_eq!(value["backup"]["label"], "NEGATIVE");
    assert_eq!(value["input"], "Not my cup of tea");
}
