//! Core types and trait definitions for the finquest progress-integrity
//! engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod analytics;
pub mod clock;
pub mod error;
pub mod incident;
pub mod outcome;
pub mod policy;
pub mod progress;
pub mod quest;
pub mod store;

pub use error::{Error, Result};
