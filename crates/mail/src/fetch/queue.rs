//! Items hidden while an asynchronous removal is pending

use std::collections::BTreeSet;

use crate::driver::THREAD_KEY_PREFIX;

/// Exclusion set of `thread:{id}` keys
///
/// A thread added here disappears from list output immediately, before the
/// server confirms the removal.
#[derive(Debug, Clone, Default)]
pub struct BackgroundQueue {
    keys: BTreeSet<String>,
}

impl BackgroundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(id: &str) -> String {
        if id.starts_with(THREAD_KEY_PREFIX) {
            id.to_string()
        } else {
            format!("{THREAD_KEY_PREFIX}{id}")
        }
    }

    /// Queue a thread; accepts a bare ID or a `thread:` key
    pub fn add(&mut self, id: &str) {
        self.keys.insert(Self::key(id));
    }

    pub fn remove(&mut self, id: &str) {
        self.keys.remove(&Self::key(id));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.keys.contains(&Self::key(id))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
