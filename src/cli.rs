use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::classifier::clarify::TerminalClarifier;
use crate::classifier::decision::PipelineDecision;
use crate::classifier::SentimentPipeline;
use crate::inference::Classifier;

pub const BANNER: &str = "Sentiment Classification CLI with Backup Fallback (type 'quit' to exit)";
const REVIEW_PROMPT: &str = "\nEnter a review: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

/// Interactive loop: one review per line until `quit` or end of input.
///
/// A failed classification is reported and the loop keeps going.
pub fn run_repl<P, B, R, W>(
    pipeline: &SentimentPipeline<P, B>,
    terminal: &mut TerminalClarifier<R, W>,
    format: OutputFormat,
) -> Result<usize>
where
    P: Classifier,
    B: Classifier,
    R: BufRead,
    W: Write,
{
    writeln!(terminal.writer_mut(), "{BANNER}")?;
    let mut handled = 0usize;

    loop {
        let Some(line) = terminal.read_line(REVIEW_PROMPT)? else {
            break;
        };
        let text = line.trim();
        if text.eq_ignore_ascii_case("quit") {
            break;
        }
        if text.is_empty() {
            continue;
        }

        match pipeline.run(text, terminal) {
            Ok(decision) => {
                let rendered = render(&decision, format)?;
                writeln!(terminal.writer_mut(), "{rendered}")?;
                handled += 1;
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(error = %message, "classification failed");
                writeln!(terminal.writer_mut(), "Error: {message}")?;
            }
        }
    }

    writeln!(terminal.writer_mut(), "Exiting...")?;
    terminal.writer_mut().flush()?;
    info!(handled, "session finished");
    Ok(handled)
}

/// Classifies a single review, prints the result and returns.
pub fn run_once<P, B, R, W>(
    pipeline: &SentimentPipeline<P, B>,
    terminal: &mut TerminalClarifier<R, W>,
    text: &str,
    format: OutputFormat,
) -> Result<PipelineDecision>
where
    P: Classifier,
    B: Classifier,
    R: BufRead,
    W: Write,
{
    let decision = pipeline.run(text.trim(), terminal)?;
    let rendered = render(&decision, format)?;
    writeln!(terminal.writer_mut(), "{rendered}")?;
    terminal.writer_mut().flush()?;
    Ok(decision)
}

pub fn render(decision: &PipelineDecision, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Summary => Ok(decision.summary_line()),
        OutputFormat::Json => {
            serde_json::to_string(decision).context("failed to serialize decision")
        }
    }
}
