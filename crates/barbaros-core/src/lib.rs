//! Core types and trait definitions for the Barbaros client store.
//!
//! This crate is deliberately free of HTTP, database and imaging
//! dependencies. All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod client;
pub mod error;
pub mod id;
pub mod loyalty;
pub mod page;
pub mod service;
pub mod store;
pub mod visit;

pub use error::{Error, Result};
