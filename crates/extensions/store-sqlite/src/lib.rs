//! SQLite key-value store for Retrace.
//!
//! Persists recordings (and any other keyed JSON documents) in a single
//! SQLite table.

mod schema;
mod store;

pub use store::SqliteStore;
