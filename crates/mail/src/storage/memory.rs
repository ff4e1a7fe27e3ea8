//! In-memory storage implementation
//!
//! Used by tests and by front ends that keep no state between runs.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::{ConnectionStore, EarlyAccessOutcome, normalize_early_access_email};
use crate::error::{Error, ErrorKind, Result};
use crate::models::Connection;

/// In-memory implementation of [`ConnectionStore`]
#[derive(Default)]
pub struct InMemoryConnectionStore {
    /// Keyed by (user_id, connection_id)
    connections: RwLock<HashMap<(String, String), Connection>>,
    early_access: RwLock<HashSet<String>>,
}

fn poisoned() -> Error {
    Error::new(ErrorKind::Storage, "connection store lock poisoned")
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<(String, String), Connection>>> {
        self.connections.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<(String, String), Connection>>> {
        self.connections.write().map_err(|_| poisoned())
    }
}

fn key(user_id: &str, connection_id: &str) -> (String, String) {
    (user_id.to_string(), connection_id.to_string())
}

impl ConnectionStore for InMemoryConnectionStore {
    fn upsert_connection(&self, connection: Connection) -> Result<()> {
        let key = key(&connection.user_id, &connection.id);
        self.write()?.insert(key, connection);
        Ok(())
    }

    fn get_connection(&self, user_id: &str, connection_id: &str) -> Result<Option<Connection>> {
        Ok(self.read()?.get(&key(user_id, connection_id)).cloned())
    }

    fn latest_connection(
        &self,
        user_id: &str,
        connection_id: &str,
    ) -> Result<Option<Connection>> {
        // One record per key, so the latest is the only one
        self.get_connection(user_id, connection_id)
    }

    fn delete_connection(&self, user_id: &str, connection_id: &str) -> Result<bool> {
        Ok(self.write()?.remove(&key(user_id, connection_id)).is_some())
    }

    fn list_connections(&self, user_id: &str) -> Result<Vec<Connection>> {
        let mut connections: Vec<Connection> = self
            .read()?
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        connections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(connections)
    }

    fn register_early_access(&self, email: &str) -> Result<EarlyAccessOutcome> {
        let email = normalize_early_access_email(email)?;
        let mut list = self.early_access.write().map_err(|_| poisoned())?;
        if list.insert(email) {
            Ok(EarlyAccessOutcome::Registered)
        } else {
            Ok(EarlyAccessOutcome::AlreadyRegistered)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn connection(id: &str, user: &str) -> Connection {
        Connection::new(id, user, "google", format!("{id}@example.com")).with_tokens("a", "r")
    }

    #[test]
    fn test_upsert_and_get() {
        let store = InMemoryConnectionStore::new();
        store.upsert_connection(connection("c1", "u1")).unwrap();

        let found = store.get_connection("u1", "c1").unwrap().unwrap();
        assert_eq!(found.email, "c1@example.com");
        assert!(store.get_connection("u2", "c1").unwrap().is_none());
        assert!(store.latest_connection("u1", "c1").unwrap().is_some());
    }

    #[test]
    fn test_delete_is_scoped_to_user() {
        let store = InMemoryConnectionStore::new();
        store.upsert_connection(connection("c1", "u1")).unwrap();

        assert!(!store.delete_connection("u2", "c1").unwrap());
        assert!(store.delete_connection("u1", "c1").unwrap());
        assert!(store.get_connection("u1", "c1").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let store = InMemoryConnectionStore::new();
        let mut old = connection("old", "u1");
        old.created_at = Utc::now() - Duration::days(1);
        store.upsert_connection(old).unwrap();
        store.upsert_connection(connection("new", "u1")).unwrap();
        store.upsert_connection(connection("other", "u2")).unwrap();

        let ids: Vec<_> = store
            .list_connections("u1")
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_early_access_duplicate() {
        let store = InMemoryConnectionStore::new();
        assert_eq!(
            store.register_early_access("Ada@Example.com").unwrap(),
            EarlyAccessOutcome::Registered
        );
        assert_eq!(
            store.register_early_access(" ada@example.com").unwrap(),
            EarlyAccessOutcome::AlreadyRegistered
        );
        assert!(store.register_early_access("nope").is_err());
    }
}
