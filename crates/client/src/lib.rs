//! PrepBox client SDK library.
//!
//! Talks to the PrepBox REST API and owns everything that lives on the
//! customer's device: the session and token-refresh lifecycle, the request
//! pipeline, the offline entity cache, reactive state containers, and the
//! event bus that decouples state changes from UI reactions.
//!
//! # Architecture
//!
//! - [`state::AppState`] is the composition root: it constructs one instance
//!   of every component and wires them together. No ambient globals.
//! - [`session::SessionManager`] owns the token pair and proactive renewal.
//! - [`http::ApiClient`] is the single outbound pipeline (bearer attachment,
//!   envelope unwrapping, 401 refresh-and-retry).
//! - [`stores`] hold in-memory reactive state; [`services`] orchestrate the
//!   API, the stores, and the caches.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod http;
pub mod models;
pub mod obfuscate;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;
pub mod stores;
