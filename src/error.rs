//! Chat session failure classification.
//!
//! Unary API calls report errors through `anyhow` like the rest of the CLI;
//! a chat session needs its terminal states to stay distinguishable (the
//! timeout path and the mid-stream failure path resolve the transcript
//! differently), so its failures are an enum.

use std::time::Duration;
use thiserror::Error;

/// Why a chat session ended without completing.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request failed before response headers arrived.
    #[error("network failure: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered outside the 2xx range. The body is not read.
    #[error("backend returned HTTP {status}")]
    HttpStatus { status: reqwest::StatusCode },

    /// Reading the body failed after a successful status.
    #[error("stream read failure: {source}")]
    StreamRead {
        #[source]
        source: reqwest::Error,
    },

    /// No complete response within the session's wall-clock bound.
    #[error("no complete response within {timeout:?}")]
    TimedOut { timeout: Duration },

    /// The session was cancelled by the operator. Not a failure.
    #[error("cancelled")]
    Cancelled,
}

impl ChatError {
    /// Message shown to the user. Cancellation is operator-initiated and
    /// surfaces nothing.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ChatError::Network { .. } => {
                Some("Network error. Please check your connection.".to_string())
            }
            ChatError::HttpStatus { status } => Some(format!(
                "The backend returned an error (HTTP {}). Please try again.",
                status.as_u16()
            )),
            ChatError::StreamRead { .. } => {
                Some("Streaming response interrupted. Please try again.".to_string())
            }
            ChatError::TimedOut { .. } => Some("Request timed out. Please try again.".to_string()),
            ChatError::Cancelled => None,
        }
    }
}
