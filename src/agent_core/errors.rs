//! Agent Core error types.

use thiserror::Error;

/// Errors that can occur while storing and applying recommendations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No pending recommendations for this request (never stored, applied,
    /// rejected, cleared, or expired).
    #[error("no recommendations found for request '{request_id}'")]
    RecommendationsNotFound { request_id: String },

    /// The request has pending recommendations, but none for this path.
    #[error("no recommendation for '{path}' in request '{request_id}'")]
    RecommendationNotFound { request_id: String, path: String },

    /// Configuration could not be loaded.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl AgentError {
    /// Whether this is a store miss rather than a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AgentError::RecommendationsNotFound { .. } | AgentError::RecommendationNotFound { .. }
        )
    }
}

impl From<serde_yaml::Error> for AgentError {
    fn from(e: serde_yaml::Error) -> Self {
        AgentError::ConfigError {
            reason: format!("failed to parse config: {e}"),
        }
    }
}
