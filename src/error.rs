// Client Error Types
use thiserror::Error;

use crate::session::store::StoreError;

/// Errors surfaced by the Bookstore client to its callers.
///
/// `Gateway::fetch` itself only produces `Transport`, `Unauthorized`,
/// `InvalidUrl` and `Storage`. Non-2xx responses are interpreted into `Http`
/// by the typed endpoint helpers in `api::*`.
#[derive(Debug, Error)]
pub enum ClientError {
    // Network call could not complete (DNS, connection, timeout)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    // Refresh procedure could not produce a new access token
    #[error("Unauthorized")]
    Unauthorized,

    // Non-2xx, non-401 response read by an endpoint helper
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Invalid role selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => "TRANSPORT_ERROR",
            ClientError::Unauthorized => "UNAUTHORIZED",
            ClientError::Http { .. } => "HTTP_ERROR",
            ClientError::Decode(_) => "INVALID_RESPONSE",
            ClientError::InvalidUrl(_) => "INVALID_URL",
            ClientError::Storage(_) => "STORAGE_ERROR",
            ClientError::InvalidSelection(_) => "INVALID_SELECTION",
            ClientError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    /// True when the caller should force a logout / re-login
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Unauthorized => Some(401),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// Static constructor methods
impl ClientError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        ClientError::Http {
            status,
            body: body.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        ClientError::Decode(message.into())
    }

    pub fn invalid_selection(message: impl Into<String>) -> Self {
        ClientError::InvalidSelection(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ClientError::InvalidInput(message.into())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
