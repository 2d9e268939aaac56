use std::error::Error as StdError;

use thiserror::Error;

/// Boxed cause carried by configuration and backend errors
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Main error type for adapter operations
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    /// The copy half of a rename succeeded but the source could not be
    /// removed, so both paths now exist.
    #[error("Rename copied {from} to {to} but failed to delete the source: {source}")]
    PartialRename {
        from: String,
        to: String,
        #[source]
        source: Box<AdapterError>,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl AdapterError {
    pub fn config(message: impl Into<String>) -> Self {
        AdapterError::Configuration {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        AdapterError::Configuration {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        AdapterError::Backend {
            message: message.into(),
            source: None,
        }
    }

    pub fn backend_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        AdapterError::Backend {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AdapterError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, AdapterError::AlreadyExists(_))
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;
