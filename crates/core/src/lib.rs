//! PrepBox Core - Shared types library.
//!
//! This crate provides common types used across all PrepBox client components:
//! - `client` - SDK talking to the PrepBox REST API
//! - `integration-tests` - End-to-end tests against a mock API
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
