//! Error types for Skillset

use thiserror::Error;

/// Result type alias using Skillset's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Skillset error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Resource errors (E001-E099)
    #[error("Skillset '{0}' not found. Run `skillset list` to see all skillsets.")]
    NotFound(String),

    #[error("Skillset '{0}' already exists. Use `skillset apply` to update it.")]
    AlreadyExists(String),

    #[error("Precondition failed for skillset '{0}': the ETag no longer matches the service.")]
    PreconditionFailed(String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check the service endpoint and your connection.")]
    Network(#[from] reqwest::Error),

    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("Service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // Payload errors (E200-E299)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E001",
            Self::AlreadyExists(_) => "E002",
            Self::PreconditionFailed(_) => "E003",
            Self::Network(_) => "E100",
            Self::Unauthorized { .. } => "E101",
            Self::RateLimited(_) => "E102",
            Self::Http { .. } => "E103",
            Self::Serialization(_) => "E200",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound(_) => Some("skillset list".to_string()),
            Self::AlreadyExists(_) => Some("skillset apply <file>".to_string()),
            Self::PreconditionFailed(name) => Some(format!("skillset get {}", name)),
            Self::Network(_) => Some("skillset config get service.endpoint".to_string()),
            Self::Unauthorized { .. } => Some("Set SKILLSET_API_KEY".to_string()),
            Self::ConfigError(_) => Some("skillset config list".to_string()),
            _ => None,
        }
    }

    /// Whether the request may succeed if sent again unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Http { status, .. } => *status == 503,
            _ => false,
        }
    }
}
