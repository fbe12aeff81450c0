//! Stripe integration.
//!
//! This module provides:
//! - [`WebhookVerifier`] for checking `Stripe-Signature` headers against the raw body
//! - [`StripeClient`] for listing checkout line items (price allow-list)
//! - Event and checkout session types covering the fields the webhook reads
//!
//! # Flow
//!
//! 1. Stripe posts an event with a `Stripe-Signature` header
//! 2. The verifier recomputes the HMAC over `"{t}.{body}"` and parses the event
//! 3. Only `checkout.session.completed` events are acted on
//! 4. When an allow-list is configured, line items are fetched to check the price

mod client;
mod error;
mod signature;
mod types;

pub use client::{LINE_ITEM_PAGE_LIMIT, StripeClient};
pub use error::{SignatureError, StripeError};
pub use signature::{SIGNATURE_HEADER, WebhookVerifier};
pub use types::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSession, Event, EventData, LineItem,
    LineItemPrice, List,
};
