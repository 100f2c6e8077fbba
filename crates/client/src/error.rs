//! Client error handling

use emr_core::{MappingError, OperationOutcome};
use thiserror::Error;

/// Errors raised by the FHIR client. The cache-integration layer turns
/// every one of these into a [`QueryError`](crate::query::QueryError).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection or timeout failure before any response arrived. Custom
    /// [`Transport`](crate::transport::Transport)s report theirs here too.
    #[error("Network error: {0}")]
    Network(String),

    #[error("FHIR server returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        outcome: Option<OperationOutcome>,
    },

    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl ClientError {
    /// Build a status error from a non-2xx response body
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let outcome = OperationOutcome::from_body(body);
        let message = outcome
            .as_ref()
            .and_then(OperationOutcome::summary)
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    format!("HTTP {status}")
                } else {
                    text
                }
            });

        ClientError::Status {
            status,
            message,
            outcome,
        }
    }

    /// HTTP status, for status errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
