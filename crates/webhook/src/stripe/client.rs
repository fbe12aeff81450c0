//! Stripe REST API client.
//!
//! Only line-item listing is needed: it backs the optional price allow-list.

use std::sync::Arc;

use reqwest::Method;
use secrecy::SecretString;
use subscriber_sync_core::CheckoutSessionId;
use tracing::{debug, error, instrument};

use super::error::StripeError;
use super::types::{LineItem, List};
use crate::http::{HttpRequest, HttpTransport};

/// Page size for line item lookups. Later pages are never fetched.
pub const LINE_ITEM_PAGE_LIMIT: u8 = 10;

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a client for `api_base` (e.g. `https://api.stripe.com/v1`).
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_base: impl Into<String>,
        secret_key: SecretString,
    ) -> Self {
        Self {
            transport,
            api_base: api_base.into(),
            secret_key,
        }
    }

    /// List the first page of line items for a checkout session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, Stripe answers with a non-success
    /// status, or the body is not a line item list.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn list_line_items(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<List<LineItem>, StripeError> {
        let url = format!(
            "{}/checkout/sessions/{}/line_items?limit={LINE_ITEM_PAGE_LIMIT}",
            self.api_base,
            urlencoding::encode(session_id.as_str())
        );

        let request = HttpRequest::new(Method::GET, url).bearer(&self.secret_key);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            error!(status = response.status, "Stripe API error listing line items");
            return Err(StripeError::Api {
                status: response.status,
                message: response.body,
            });
        }

        let items: List<LineItem> = serde_json::from_str(&response.body)
            .map_err(|e| StripeError::Response(e.to_string()))?;

        debug!(
            count = items.data.len(),
            has_more = items.has_more,
            "Fetched checkout line items"
        );

        Ok(items)
    }
}
