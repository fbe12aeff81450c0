//! Stripe event and checkout types.
//!
//! Only the fields the webhook reads are modelled. Everything is optional
//! where Stripe may omit or null a value, so an unexpected shape degrades to
//! "nothing to do" instead of a hard failure.

use serde::Deserialize;
use serde_json::Value;
use subscriber_sync_core::{CheckoutSessionId, Email, EventId, PriceId, ProductId};

/// The single event type that triggers provisioning.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<EventId>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub data: Option<EventData>,
}

/// Envelope around the event's subject object.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: Value,
}

impl Event {
    /// Returns `true` for `checkout.session.completed`.
    #[must_use]
    pub fn is_checkout_completed(&self) -> bool {
        self.kind == CHECKOUT_SESSION_COMPLETED
    }

    /// Read `data.object` as a checkout session.
    ///
    /// A missing or non-object subject yields an empty session.
    #[must_use]
    pub fn checkout_session(&self) -> CheckoutSession {
        self.data
            .as_ref()
            .map(|data| CheckoutSession::from_object(&data.object))
            .unwrap_or_default()
    }
}

/// The parts of a Checkout Session needed to find the buyer.
///
/// Each field is read on its own from the raw object, so a sibling field of
/// an unexpected type never hides a usable email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: Option<CheckoutSessionId>,
    /// `customer_details.email`, collected during checkout.
    pub customer_details_email: Option<String>,
    /// Legacy top-level email, set when the session was created with one.
    pub customer_email: Option<String>,
    /// `metadata.email`.
    pub metadata_email: Option<String>,
}

impl CheckoutSession {
    /// Pick the session fields out of a raw `checkout.session` object.
    ///
    /// Values that are not strings count as absent.
    #[must_use]
    pub fn from_object(object: &Value) -> Self {
        let text = |pointer: &str| object.pointer(pointer).and_then(Value::as_str);

        Self {
            id: text("/id").map(CheckoutSessionId::from),
            customer_details_email: text("/customer_details/email").map(str::to_owned),
            customer_email: text("/customer_email").map(str::to_owned),
            metadata_email: text("/metadata/email").map(str::to_owned),
        }
    }

    /// Email candidates in priority order: collected customer details, the
    /// legacy `customer_email`, then `metadata.email`.
    pub fn email_candidates(&self) -> impl Iterator<Item = &str> {
        [
            self.customer_details_email.as_deref(),
            self.customer_email.as_deref(),
            self.metadata_email.as_deref(),
        ]
        .into_iter()
        .flatten()
    }

    /// First candidate that is a usable email.
    ///
    /// Blank values are skipped silently; non-blank values that fail
    /// validation are skipped with a warning.
    #[must_use]
    pub fn resolve_email(&self) -> Option<Email> {
        self.email_candidates()
            .filter(|raw| !raw.trim().is_empty())
            .find_map(|raw| match Email::parse(raw) {
                Ok(email) => Some(email),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Ignoring malformed checkout email");
                    None
                }
            })
    }
}

/// A page of objects from a Stripe list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// One purchased line of a checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub price: Option<LineItemPrice>,
}

/// The price a line item was bought at.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemPrice {
    #[serde(default)]
    pub id: Option<PriceId>,
    /// Product id, or the expanded product object.
    #[serde(default)]
    pub product: Option<Value>,
}

impl LineItemPrice {
    /// The product id whether or not the product was expanded.
    #[must_use]
    pub fn product_id(&self) -> Option<ProductId> {
        let id = match self.product.as_ref()? {
            Value::String(id) => id.as_str(),
            Value::Object(product) => product.get("id")?.as_str()?,
            _ => return None,
        };
        Some(ProductId::from(id))
    }
}

impl LineItem {
    /// Returns `true` if the price id, or its product id, is in `allowed`.
    ///
    /// A line item without a price, or whose price has no id, never matches
    /// by price.
    #[must_use]
    pub fn matches_any(&self, allowed: &[PriceId]) -> bool {
        let Some(price) = &self.price else {
            return false;
        };
        let product = price.product_id();
        allowed.iter().any(|id| {
            price.id.as_ref() == Some(id)
                || product.as_ref().is_some_and(|p| p.as_str() == id.as_str())
        })
    }
}
