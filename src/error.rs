use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    /// Transport failure reaching a remote endpoint. Retryable by the caller.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The remote answered, but not with anything resembling the expected page.
    #[error("Unexpected response shape: {0}")]
    UnexpectedResponseShape(String),

    #[error("Unparsable document for region '{region}': {reason}")]
    UnparsableDocument { region: String, reason: String },

    #[error("Cache key '{key}' for region '{incoming}' collides with region '{existing}'")]
    CacheKeyCollision {
        key: String,
        existing: String,
        incoming: String,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScraperError {
    /// Whether a layer above this crate may reasonably retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScraperError::UpstreamUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
