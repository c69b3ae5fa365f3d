//! Error types for saidebar-core

use saidebar_ai::ErrorKind;
use thiserror::Error;

/// Result type alias using saidebar-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the API layer
    #[error(transparent)]
    Ai(#[from] saidebar_ai::Error),

    /// Settings could not be written
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be serialized
    #[error("Settings serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The page-content source gave nothing back in time
    #[error("Could not get the page content")]
    PageContentUnavailable,
}

impl Error {
    /// Taxonomy class for API-layer errors
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Ai(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Text shown to the user for this error
    pub fn user_message(&self) -> String {
        match self {
            Error::Ai(saidebar_ai::Error::InvalidApiKey) => {
                "API key is not set. Configure it in the settings.".to_string()
            }
            other => format!("Error: {}", other),
        }
    }
}
