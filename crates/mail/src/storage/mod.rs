//! Connection storage
//!
//! Stores the provider connections the action layer resolves drivers from,
//! and the early-access waitlist. The trait lets the action layer run against
//! an in-memory store in tests and SQLite everywhere else.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryConnectionStore;
pub use sqlite::SqliteConnectionStore;
pub use traits::{ConnectionStore, EarlyAccessOutcome, normalize_early_access_email};
