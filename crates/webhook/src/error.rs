//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Signature failures become a
//! 400 with the verification message so Stripe's dashboard shows why a
//! delivery was refused. Upstream failures become a 502 so Stripe retries the
//! delivery later.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::identity::IdentityError;
use crate::stripe::{SignatureError, StripeError};

/// Application-level error type for the webhook.
#[derive(Debug, Error)]
pub enum AppError {
    /// Delivery failed signature verification.
    #[error("Webhook error: {0}")]
    Signature(#[from] SignatureError),

    /// Stripe API operation failed.
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Identity API operation failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Stripe(_) | Self::Identity(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Webhook request error"
            );
        } else {
            tracing::warn!(error = %self, "Rejected webhook delivery");
        }

        let status = match &self {
            Self::Signature(_) => StatusCode::BAD_REQUEST,
            Self::Stripe(_) | Self::Identity(_) => StatusCode::BAD_GATEWAY,
        };

        // Don't expose upstream error details to callers
        let message = match &self {
            Self::Signature(_) => self.to_string(),
            Self::Stripe(_) | Self::Identity(_) => "External service error".to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
