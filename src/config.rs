use std::path::PathBuf;

use clap::Parser;

use crate::classifier::fallback::DEFAULT_CLARIFY_ATTEMPTS;
use crate::classifier::gate::DEFAULT_THRESHOLD;
use crate::error::SentigateError;
use crate::inference::device::DevicePreference;

pub const DEFAULT_PRIMARY_MODEL: &str = "fine_tuned_imdb";
pub const DEFAULT_BACKUP_MODEL: &str = "MoritzLaurer/ModernBERT-base-zeroshot-v2.0";
const MIN_SEQ_LEN: usize = 16;

/// Sentiment classification with a zero-shot second opinion and operator fallback.
#[derive(Debug, Clone, Parser)]
#[command(name = "sentigate", version, about)]
pub struct Config {
    /// Snapshot directory of the fine-tuned sentiment model
    #[arg(long, env = "SENTIGATE_PRIMARY_MODEL", default_value = DEFAULT_PRIMARY_MODEL)]
    pub primary_model: PathBuf,

    /// Local directory or Hugging Face repo id of the zero-shot backup model
    #[arg(long, env = "SENTIGATE_BACKUP_MODEL", default_value = DEFAULT_BACKUP_MODEL)]
    pub backup_model: String,

    /// Minimum primary confidence accepted without fallback
    #[arg(long, env = "SENTIGATE_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f32,

    /// auto, cpu, cuda or cuda:N
    #[arg(long, env = "SENTIGATE_DEVICE", default_value = "auto")]
    pub device: String,

    /// Token budget per input
    #[arg(long, env = "SENTIGATE_MAX_LEN", default_value_t = 256)]
    pub max_len: usize,

    /// How many times to ask the operator before keeping the backup label
    #[arg(long, env = "SENTIGATE_CLARIFY_ATTEMPTS", default_value_t = DEFAULT_CLARIFY_ATTEMPTS)]
    pub clarify_attempts: usize,

    /// File that receives the structured log
    #[arg(long, env = "SENTIGATE_LOG_FILE", default_value = "pipeline.log")]
    pub log_file: PathBuf,

    /// Classify a single review and exit
    #[arg(long)]
    pub text: Option<String>,

    /// Print decisions as JSON instead of the summary line
    #[arg(long)]
    pub json: bool,
}

impl Config {
    /// Parses flags after pulling `.env` into the environment.
    pub fn load() -> Result<Self, SentigateError> {
        dotenvy::dotenv().ok();
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SentigateError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SentigateError::InvalidConfig {
                field: "threshold",
                reason: format!("{} is outside [0, 1]", self.threshold),
            });
        }
        if self.max_len < MIN_SEQ_LEN {
            return Err(SentigateError::InvalidConfig {
                field: "max_len",
                reason: format!("must be at least {MIN_SEQ_LEN}"),
            });
        }
        if self.clarify_attempts == 0 {
            return Err(SentigateError::InvalidConfig {
                field: "clarify_attempts",
                reason: "must be at least 1".into(),
            });
        }
        self.device_preference()?;
        Ok(())
    }

    pub fn device_preference(&self) -> Result<DevicePreference, SentigateError> {
        DevicePreference::parse(&self.device)
    }
}
