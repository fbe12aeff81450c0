//! Identity-related errors.

use thiserror::Error;

use crate::http::TransportError;

/// Errors that can occur when interacting with the identity admin API.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Request never produced a response.
    #[error("Identity request failed: {0}")]
    Transport(#[from] TransportError),

    /// User lookup answered with a non-success status.
    #[error("Identity lookup error: {status} - {message}")]
    Lookup { status: u16, message: String },

    /// Failed to parse response.
    #[error("Identity response error: {0}")]
    Response(String),
}
