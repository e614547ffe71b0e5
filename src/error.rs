use thiserror::Error;

/// Domain errors raised while classifying or validating configuration.
///
/// Model loading and I/O go through `anyhow` with context; these variants cover
/// the cases callers may want to match on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SentigateError {
    #[error("unknown sentiment label '{0}'")]
    UnknownLabel(String),

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f32),

    #[error("invalid config value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("{0} returned no predictions")]
    EmptyOutput(String),
}
