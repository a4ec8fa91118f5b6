//! Error types for the tabular store client.
//!
//! Every failure a remote call can produce is one of these variants, so
//! callers can tell transport problems apart from the store rejecting a
//! request or answering with something undecodable.

use thiserror::Error;

/// The error type for store client operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never completed at the transport level.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The store answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code of the response.
        status: u16,
        /// Response body text, verbatim.
        body: String,
    },

    /// A successful response body could not be decoded into the expected rows.
    #[error("failed to decode response from '{table}': {source}")]
    Decode {
        /// Table or view that was queried.
        table: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The client could not be constructed from the given settings.
    #[error("invalid store settings: {message}")]
    Settings {
        /// Description of the bad setting.
        message: String,
    },
}

/// A specialized Result type for store client operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create an HTTP error from a status code and body text.
    #[must_use]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error for the given table.
    #[must_use]
    pub fn decode(table: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            table: table.into(),
            source,
        }
    }

    /// Create a settings error.
    #[must_use]
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }

    /// Check if this error is a non-success HTTP response.
    #[must_use]
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http { .. })
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
