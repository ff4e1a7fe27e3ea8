//! Cache of full threads for the detail view

use log::debug;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::Result;
use crate::models::{Session, ThreadDetail};

/// Cache key of one thread detail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    pub user_id: String,
    pub thread_id: String,
    pub connection_id: String,
}

/// Key for a thread, or `None` without a signed-in connection or thread
pub fn thread_key(session: Option<&Session>, thread_id: &str) -> Option<ThreadKey> {
    let session = session?;
    let connection_id = session.active_connection_id()?;
    if thread_id.is_empty() {
        return None;
    }
    Some(ThreadKey {
        user_id: session.user_id.clone(),
        thread_id: thread_id.to_string(),
        connection_id: connection_id.to_string(),
    })
}

/// Thread details keyed by (user, thread, connection)
#[derive(Debug, Default)]
pub struct ThreadDetailCache {
    entries: HashMap<ThreadKey, ThreadDetail>,
}

impl ThreadDetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ThreadKey) -> Option<&ThreadDetail> {
        self.entries.get(key)
    }

    /// Cached detail, fetching it on a miss. Errors are not cached.
    pub fn get_or_fetch(
        &mut self,
        key: ThreadKey,
        fetch: impl FnOnce(&str) -> Result<ThreadDetail>,
    ) -> Result<&ThreadDetail> {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                debug!("Fetching thread {}", entry.key().thread_id);
                let detail = fetch(&entry.key().thread_id)?;
                Ok(&*entry.insert(detail))
            }
        }
    }

    /// Warm the cache; returns whether a fetch happened
    pub fn preload(
        &mut self,
        key: ThreadKey,
        fetch: impl FnOnce(&str) -> Result<ThreadDetail>,
    ) -> Result<bool> {
        if self.entries.contains_key(&key) {
            return Ok(false);
        }
        self.get_or_fetch(key, fetch)?;
        Ok(true)
    }

    pub fn invalidate(&mut self, key: &ThreadKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every cached thread of a connection
    pub fn invalidate_connection(&mut self, connection_id: &str) {
        self.entries.retain(|k, _| k.connection_id != connection_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use std::cell::Cell;

    fn session() -> Session {
        Session::new("u1", Some("c1".to_string()))
    }

    #[test]
    fn test_thread_key() {
        assert!(thread_key(None, "t1").is_none());
        assert!(thread_key(Some(&session()), "").is_none());
        let key = thread_key(Some(&session()), "t1").unwrap();
        assert_eq!((key.user_id.as_str(), key.connection_id.as_str()), ("u1", "c1"));
    }

    #[test]
    fn test_fetches_once() {
        let mut cache = ThreadDetailCache::new();
        let key = thread_key(Some(&session()), "t1").unwrap();
        let fetches = Cell::new(0);
        let fetch = |_: &str| {
            fetches.set(fetches.get() + 1);
            Ok(ThreadDetail::from_messages(Vec::new()))
        };

        assert!(cache.preload(key.clone(), fetch).unwrap());
        assert!(!cache.preload(key.clone(), fetch).unwrap());
        cache.get_or_fetch(key.clone(), fetch).unwrap();
        assert_eq!(fetches.get(), 1);

        assert!(cache.invalidate(&key));
        cache.get_or_fetch(key, fetch).unwrap();
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache = ThreadDetailCache::new();
        let key = thread_key(Some(&session()), "t1").unwrap();
        let err = cache
            .get_or_fetch(key.clone(), |_| Err(Error::new(ErrorKind::Network, "down")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(cache.is_empty());

        cache.invalidate_connection("c1");
        assert!(cache.get(&key).is_none());
    }
}
