//! Error types for saidebar-ai

use thiserror::Error;

/// Result type alias using saidebar-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a Messages API endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The transport could not send the request or read the body
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint answered with a non-2xx status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The stream carried an `error` event
    #[error("{0}")]
    Stream(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,
}

/// Coarse classification of an [`Error`], used to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable credentials, detected before any network call
    Configuration,
    /// The request could not be sent or the body could not be read
    Transport,
    /// Non-2xx status or an in-stream error event
    Protocol,
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Build the error for a non-2xx response from its (possibly empty) body.
    ///
    /// Prefers `error.message` from a JSON body and falls back to the status code.
    pub fn from_response_body(status: u16, body: &[u8]) -> Self {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            error: Option<ErrorDetail>,
        }
        #[derive(serde::Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
        }

        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("API error: {}", status));
        Self::api(status, message)
    }

    /// Map this error onto the reporting taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidApiKey => ErrorKind::Configuration,
            Error::Http(_) | Error::Transport(_) => ErrorKind::Transport,
            Error::Json(_) | Error::Api { .. } | Error::Stream(_) => ErrorKind::Protocol,
        }
    }
}
