//! Core types and services for the Lobby visitor check-in system.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::RecordStore`] and
//! [`store::PhotoStore`]; the gateway talks to [`workflow::Workflow`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod approval;
pub mod directory;
pub mod error;
pub mod store;
pub mod visitor;
pub mod workflow;

pub use error::{Error, ErrorKind, Result};
