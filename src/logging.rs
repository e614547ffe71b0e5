use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Routes all tracing output to `path`, appending so earlier sessions survive.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(path: &Path) -> Result<()> {
    let file = open_log_file(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer(file))
        .try_init()
        .context("failed to install tracing subscriber")
}

/// Plain-text lines with span fields such as `decision_id` prefixed to each event.
fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Arc::new(file))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log dir {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    use crate::classifier::clarify::TerminalClarifier;
    use crate::classifier::fallback::FallbackResolver;
    use crate::classifier::gate::ConfidenceGate;
    use crate::classifier::SentimentPipeline;
    use crate::inference::{ClassificationResult, Classifier, Label};

    struct Fixed(Label, f32);

    impl Classifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn classify(&self, _text: &str) -> anyhow::Result<ClassificationResult> {
            Ok(ClassificationResult::new(self.0, self.1)?)
        }
    }

    #[test]
    fn log_file_is_appended_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("pipeline.log");

        let mut first = open_log_file(&path).unwrap();
        writeln!(first, "first session").unwrap();
        drop(first);

        let mut second = open_log_file(&path).unwrap();
        writeln!(second, "second session").unwrap();
        drop(second);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first session\nsecond session\n");
    }

    #[test]
    fn decisions_are_written_to_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.log");
        let subscriber = tracing_subscriber::registry().with(file_layer(open_log_file(&path).unwrap()));

        let pipeline = SentimentPipeline::new(
            Fixed(Label::Negative, 0.55),
            Fixed(Label::Negative, 0.8),
            ConfidenceGate::default(),
            FallbackResolver::default(),
        );
        let mut out = Vec::new();
        let mut terminal = TerminalClarifier::new(Cursor::new(""), &mut out);
        let decision = tracing::subscriber::with_default(subscriber, || {
            pipeline.run("Not my cup of tea", &mut terminal)
        })
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains(&format!("decision_id={}", decision.id)));
        assert!(contents.contains("input=Not my cup of tea"));
        assert!(contents.contains("confidence=0.55"));
        assert!(contents.contains("stage=\"fallback\""));
        assert!(contents.contains("source=BACKUP"));
        assert!(contents.contains("label=NEGATIVE"));
        assert!(!contents.contains('\u{1b}'));
    }
}
