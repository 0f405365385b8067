//! Driftwood Core - Shared types library.
//!
//! This crate provides common types used across all Driftwood components:
//! - `checkout` - Headless checkout orchestration service
//! - `integration-tests` - End-to-end checkout flow tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. Every type parses its input up front and is valid by
//! construction afterwards, so the checkout crate never re-validates what
//! already made it into one of these wrappers.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for money, contact details, addresses,
//!   delivery methods, statuses, and type-safe IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
