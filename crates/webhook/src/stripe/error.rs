//! Stripe-related errors.

use thiserror::Error;

use crate::http::TransportError;

/// Reasons a webhook delivery fails verification.
///
/// Messages follow the wording of Stripe's own SDKs so operators can search
/// for them in Stripe's documentation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The request carried no signature header.
    #[error("No stripe-signature header value was provided.")]
    MissingHeader,

    /// The header has no usable timestamp.
    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    /// The header has no `v1` signatures.
    #[error("No signatures found with expected scheme")]
    NoSignatures,

    /// The signed timestamp is too far from the current time.
    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,

    /// None of the `v1` signatures match the payload.
    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,

    /// The signed body is not a Stripe event.
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

/// Errors that can occur when calling the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// Request never produced a response.
    #[error("Stripe request failed: {0}")]
    Transport(#[from] TransportError),

    /// Stripe answered with a non-success status.
    #[error("Stripe API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Stripe response error: {0}")]
    Response(String),
}
