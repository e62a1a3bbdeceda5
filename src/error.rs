// Error types for ghdash.
// Covers GitHub API failures, device-flow failures, and general errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhdashError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("Missing GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("Device authorization failed: {0}")]
    DeviceFlow(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl GhdashError {
    /// Whether this error means the remote resource does not exist.
    /// Existence checks turn this into `false` instead of failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GhdashError::NotFound(_))
    }

    /// Short message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            GhdashError::Unauthorized => "Your token is invalid or has expired.".to_string(),
            GhdashError::MissingToken => "No GitHub token configured.".to_string(),
            GhdashError::NotFound(_) => "That resource could not be found.".to_string(),
            GhdashError::RateLimited { reset_at } => {
                format!("GitHub rate limit reached, try again after {reset_at}.")
            }
            GhdashError::Api(_) => "Could not reach GitHub.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GhdashError>;
