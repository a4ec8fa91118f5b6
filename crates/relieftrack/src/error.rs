//! Error types for relieftrack.
//!
//! This module defines all error types used throughout the relieftrack crate,
//! providing detailed context for debugging and user-friendly error messages.

use thiserror::Error;

use relieftrack_store::StoreError;

/// The main error type for relieftrack operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Remote Store Errors ===
    /// A remote call never completed at the transport level.
    #[error("network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// The remote store answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code of the response.
        status: u16,
        /// Response body text, verbatim.
        body: String,
    },

    /// A successful response body could not be decoded.
    #[error("failed to decode response from '{context}': {source}")]
    Decode {
        /// Table, view, or endpoint that was queried.
        context: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    // === Input Errors ===
    /// Required input is missing or malformed.
    #[error("invalid input: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    // === Geolocation Errors ===
    /// A device position could not be determined.
    #[error("geolocation failed: {message}")]
    Geolocation {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },
}

/// A specialized Result type for relieftrack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Network(source) => Self::Network {
                message: source.to_string(),
            },
            StoreError::Http { status, body } => Self::Http { status, body },
            StoreError::Decode { table, source } => Self::Decode {
                context: table,
                source,
            },
            StoreError::Settings { message } => Self::ConfigValidation { message },
        }
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new geolocation error.
    #[must_use]
    pub fn geolocation(message: impl Into<String>) -> Self {
        Self::Geolocation {
            message: message.into(),
        }
    }

    /// Create a new HTTP error from a status code and body text.
    #[must_use]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Check if this error is a non-success HTTP response.
    #[must_use]
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    /// Check if this error is a validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// The HTTP status code, if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
