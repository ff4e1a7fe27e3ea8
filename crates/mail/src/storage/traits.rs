//! Storage trait definitions

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::models::Connection;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*@([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}$"#)
        .expect("email pattern is valid")
});

/// Result of a waitlist registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyAccessOutcome {
    Registered,
    /// The address was already on the list; not an error
    AlreadyRegistered,
}

/// Storage for provider connections
///
/// Connections are always addressed by (user, connection) so one user can
/// never read or drop another user's record.
pub trait ConnectionStore: Send + Sync {
    /// Insert or replace a connection
    fn upsert_connection(&self, connection: Connection) -> Result<()>;

    /// Get a connection owned by `user_id`
    fn get_connection(&self, user_id: &str, connection_id: &str) -> Result<Option<Connection>>;

    /// Most recently created record matching (user, connection)
    fn latest_connection(&self, user_id: &str, connection_id: &str)
    -> Result<Option<Connection>>;

    /// Delete a connection; returns whether a record was removed
    fn delete_connection(&self, user_id: &str, connection_id: &str) -> Result<bool>;

    /// All connections of a user, newest first
    fn list_connections(&self, user_id: &str) -> Result<Vec<Connection>>;

    /// Add an address to the early-access waitlist
    fn register_early_access(&self, email: &str) -> Result<EarlyAccessOutcome>;
}

/// Trim, lower-case and validate a waitlist address
pub fn normalize_early_access_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(Error::validation("Email is required"));
    }
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(Error::validation("Invalid email format"));
    }
    Ok(email)
}
