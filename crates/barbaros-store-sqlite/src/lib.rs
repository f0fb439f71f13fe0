//! SQLite backend for the Barbaros client store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The store is opened once at process
//! start, handed to whoever needs it, and closed explicitly at shutdown.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
