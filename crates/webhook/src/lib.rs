//! Subscriber Sync webhook library.
//!
//! Receives Stripe webhooks and provisions Netlify Identity roles for paying
//! customers. Exposed as a library so the router can be driven in tests with
//! a scripted [`http::HttpTransport`].
//!
//! # Security
//!
//! This crate holds the Stripe webhook secret, an optional Stripe API key and
//! the identity admin token. Every event is verified against the raw request
//! body before any field of it is read.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod provisioning;
pub mod routes;
pub mod state;
pub mod stripe;
