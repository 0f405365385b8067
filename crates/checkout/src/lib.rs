//! Driftwood Checkout library.
//!
//! This crate provides the checkout wizard as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod flow;
pub mod orchestrator;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod view;
