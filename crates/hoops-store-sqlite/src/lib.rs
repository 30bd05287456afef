//! SQLite backend for the hoops league store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every write runs inside a
//! single `BEGIN IMMEDIATE` transaction on that thread, which also serializes
//! replays against each other and against game writes.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
