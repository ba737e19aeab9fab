// Error types shared by every extractor, collector and resolver

use thiserror::Error;

use super::diagnostics::UnavailableReason;

pub type Result<T> = std::result::Result<T, ExtractionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// URL belongs to the platform (or not at all) but not to the expected scope
    #[error("URL not handled by this link handler: {0}")]
    NotFound(String),

    /// Identifier does not satisfy the platform's id shape
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Transport-level failure, including non-2xx where 2xx was required
    #[error("Network error: {message}")]
    Network { status: Option<u16>, message: String },

    /// Response received but it did not match the expected structure
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Resource exists but is gated by upstream policy
    #[error("Content not available ({reason}): {message}")]
    ContentUnavailable {
        reason: UnavailableReason,
        message: String,
    },

    /// Resource exists and is not gated, but has no playable media yet
    #[error("Not streamable: {0}")]
    NotStreamable(String),

    /// Accessor called before a successful fetch
    #[error("Extractor not ready: {0}")]
    NotReady(String),

    /// Caller cancelled the operation between or during network hops
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractionError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, url: &str) -> Self {
        Self::Network {
            status: Some(status),
            message: format!("HTTP {} for {}", status, url),
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Missing required field in an upstream payload
    pub fn missing_field(field: &str) -> Self {
        Self::Extraction(format!("Missing required field `{}`", field))
    }

    /// Only transport failures are worth retrying; the core never retries itself
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Signals that the upstream format changed under us
    pub fn is_upstream_drift(&self) -> bool {
        matches!(self, Self::Extraction(_))
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::ContentUnavailable { reason, .. } => reason
                .user_explanation()
                .unwrap_or(reason.description())
                .to_string(),
            Self::NotStreamable(_) => {
                "This track has not been processed yet and cannot be played.".to_string()
            }
            Self::Network { .. } => {
                "Could not reach the service. Check your connection and try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ExtractionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Extraction(format!("Could not parse JSON: {}", e))
    }
}

impl From<url::ParseError> for ExtractionError {
    fn from(e: url::ParseError) -> Self {
        Self::NotFound(format!("Malformed URL: {}", e))
    }
}
