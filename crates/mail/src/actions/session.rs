//! Session and cache-revalidation seams
//!
//! Identity comes from an outer authentication layer; the action layer only
//! needs to read the current session and sign it out. Revalidation tells
//! whatever caches rendered views that a path is stale.

use log::info;
use std::sync::{Mutex, RwLock};

use crate::error::{Error, ErrorKind, Result};
use crate::models::Session;

/// View revalidated after a connection is torn down
pub const INBOX_PATH: &str = "/mail/inbox";

/// Source of the authenticated caller
pub trait SessionProvider: Send + Sync {
    /// Current session, if the caller is signed in
    fn current_session(&self) -> Option<Session>;

    /// End the current session
    fn sign_out(&self) -> Result<()>;
}

/// Receives "this path is stale" notifications
pub trait Revalidator: Send + Sync {
    fn revalidate(&self, path: &str);
}

/// Session fixed at construction, cleared by [`SessionProvider::sign_out`]
#[derive(Debug, Default)]
pub struct StaticSession {
    session: RwLock<Option<Session>>,
}

impl StaticSession {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    pub fn signed_in(user_id: impl Into<String>, connection_id: impl Into<String>) -> Self {
        Self::new(Some(Session::new(user_id, Some(connection_id.into()))))
    }
}

impl SessionProvider for StaticSession {
    fn current_session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    fn sign_out(&self) -> Result<()> {
        let mut session = self
            .session
            .write()
            .map_err(|_| Error::new(ErrorKind::InvalidSession, "session lock poisoned"))?;
        if let Some(s) = session.take() {
            info!("Signed out user {}", s.user_id);
        }
        Ok(())
    }
}

/// Records revalidated paths in order
#[derive(Debug, Default)]
pub struct RevalidationLog {
    paths: Mutex<Vec<String>>,
}

impl RevalidationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths revalidated so far
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths().iter().any(|p| p == path)
    }
}

impl Revalidator for RevalidationLog {
    fn revalidate(&self, path: &str) {
        info!("Revalidating {}", path);
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path.to_string());
        }
    }
}
