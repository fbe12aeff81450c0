//! Subscriber Sync Core - Shared types library.
//!
//! This crate provides the domain types used by the webhook service:
//! - `webhook` - Payment webhook receiver that provisions identity roles
//! - `integration-tests` - End-to-end tests against the webhook router
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Everything
//! here is pure and can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, external ids, and role sets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
