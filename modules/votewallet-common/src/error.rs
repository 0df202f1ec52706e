use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    /// Network or API failure from a data source. Retryable failures are
    /// retried up to the orchestrator's policy, then recorded and skipped.
    #[error("Source error from {source_id}: {message}")]
    Source {
        source_id: String,
        message: String,
        retryable: bool,
    },

    /// A source reported throttling or blocking. Retried with a longer
    /// backoff; repeated signals disable the source for the rest of the run.
    #[error("Rate limited by {source_id}")]
    RateLimited { source_id: String },

    /// Record failed data-quality validation. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed registry entry or missing required configuration.
    /// Fatal — aborts the run before any network calls.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog sink failure.
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl HarvestError {
    /// Convenience constructor for retryable source failures.
    pub fn source(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        HarvestError::Source {
            source_id: source_id.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// Convenience constructor for permanent source failures (bad request,
    /// auth rejection) that retrying cannot fix.
    pub fn source_permanent(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        HarvestError::Source {
            source_id: source_id.into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Whether the orchestrator's retry policy applies to this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            HarvestError::Source { retryable, .. } => *retryable,
            HarvestError::RateLimited { .. } => true,
            _ => false,
        }
    }

    /// Whether this is a throttling signal that should use the longer backoff.
    pub fn is_throttle(&self) -> bool {
        matches!(self, HarvestError::RateLimited { .. })
    }
}
