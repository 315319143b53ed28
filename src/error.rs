//! Error types for smx.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SmxError>;

#[derive(Debug, Error)]
pub enum SmxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// The top-level matrix document is unusable; the whole load is rejected.
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    /// A skill is missing a field it cannot be used without.
    #[error("skill '{skill}' is missing required field '{field}'")]
    MissingField { skill: String, field: &'static str },

    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("timed out after {secs}s fetching {url}")]
    FetchTimeout { url: String, secs: u64 },

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// A check ran and reported failures; the report has already been printed.
    #[error("{0}")]
    ValidationFailed(String),
}

impl SmxError {
    /// Stable machine-readable code used in robot output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Yaml(_) => "yaml",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
            Self::MissingConfig(_) => "missing_config",
            Self::InvalidMatrix(_) => "invalid_matrix",
            Self::MissingField { .. } => "missing_field",
            Self::Fetch { .. } => "fetch_failed",
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::SkillNotFound(_) => "skill_not_found",
            Self::UnknownCategory(_) => "unknown_category",
            Self::ValidationFailed(_) => "validation_failed",
        }
    }
}
