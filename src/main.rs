use anyhow::{Context, Result};

use sentigate::classifier::clarify::TerminalClarifier;
use sentigate::classifier::fallback::FallbackResolver;
use sentigate::classifier::gate::ConfidenceGate;
use sentigate::classifier::SentimentPipeline;
use sentigate::cli::{self, OutputFormat};
use sentigate::config::Config;
use sentigate::inference::device::build_device;
use sentigate::inference::sentiment_classifier::SentimentClassifier;
use sentigate::inference::zero_shot::ZeroShotClassifier;
use sentigate::logging;

fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.log_file)?;

    let device = build_device(config.device_preference()?)?;
    println!("Loading models on {device:?}...");

    let primary = SentimentClassifier::load(&config.primary_model, device.clone(), config.max_len)
        .with_context(|| {
            format!(
                "failed to load primary model from {}",
                config.primary_model.display()
            )
        })?;
    let backup = ZeroShotClassifier::load(&config.backup_model, device, config.max_len)
        .with_context(|| format!("failed to load backup model {}", config.backup_model))?;

    let pipeline = SentimentPipeline::new(
        primary,
        backup,
        ConfidenceGate::new(config.threshold)?,
        FallbackResolver::new(config.clarify_attempts)?,
    );

    let format = if config.json {
        OutputFormat::Json
    } else {
        OutputFormat::Summary
    };
    let mut terminal = TerminalClarifier::stdio();

    match config.text.as_deref() {
        Some(text) => {
            cli::run_once(&pipeline, &mut terminal, text, format)?;
        }
        None => {
            cli::run_repl(&pipeline, &mut terminal, format)?;
        }
    }

    Ok(())
}
