//! Error taxonomy for remote orchestration.
//!
//! Every terminal failure carries a human-readable status line through
//! [`OrchestratorError::status_text`], distinct from both the in-progress
//! and the success strings shown by the front-end.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the orchestration core
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or semantically invalid response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A remote call exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// No capture hardware present
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Captured samples could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Nothing was captured
    #[error("No input captured")]
    EmptyInput,

    /// The remote accept call for a job failed
    #[error("Job submission failed: {0}")]
    Submission(String),

    /// The component already has an outstanding operation for this caller
    #[error("Operation already in progress")]
    Busy,
}

impl OrchestratorError {
    /// Short line suitable for a status label
    pub fn status_text(&self) -> String {
        match self {
            Self::Transport(cause) => format!("Network error: {}", cause),
            Self::Protocol(cause) => format!("Bad response: {}", cause),
            Self::Timeout(_) => "Request timed out. Try again.".to_string(),
            Self::DeviceUnavailable(_) => "No microphone detected".to_string(),
            Self::Encoding(cause) => format!("Could not encode capture: {}", cause),
            Self::EmptyInput => "No input captured. Tap to retry.".to_string(),
            Self::Submission(cause) => format!("Error: {}", cause),
            Self::Busy => "Busy. Please wait.".to_string(),
        }
    }
}

impl From<reqwest::Error> for OrchestratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Result alias for the orchestration core
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_is_distinct_per_variant() {
        let errors = [
            OrchestratorError::Transport("refused".into()),
            OrchestratorError::Protocol("missing field".into()),
            OrchestratorError::Timeout(Duration::from_secs(1)),
            OrchestratorError::DeviceUnavailable("none".into()),
            OrchestratorError::Encoding("bad".into()),
            OrchestratorError::EmptyInput,
            OrchestratorError::Submission("500".into()),
            OrchestratorError::Busy,
        ];

        let texts: std::collections::HashSet<String> =
            errors.iter().map(|e| e.status_text()).collect();
        assert_eq!(texts.len(), errors.len());
        assert!(!texts.contains("Processing"));
    }

    #[test]
    fn test_json_error_maps_to_protocol() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        assert!(matches!(
            OrchestratorError::from(err),
            OrchestratorError::Protocol(_)
        ));
    }
}
