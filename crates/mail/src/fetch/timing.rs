//! Timers driven by the owning view's clock
//!
//! Both timers take the current [`Instant`] as an argument so the view's
//! event loop decides when they are polled.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Trailing-edge debounce
///
/// Each trigger pushes the deadline out; the action fires once after the
/// quiet period.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Fire a pending trigger immediately
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Per-row hover timers that prefetch a thread once
#[derive(Debug, Clone)]
pub struct HoverPrefetch {
    delay: Duration,
    timers: HashMap<String, Instant>,
    prefetched: HashSet<String>,
}

impl HoverPrefetch {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: HashMap::new(),
            prefetched: HashSet::new(),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Start the timer for a row; ignored outside single-select mode and for
    /// threads already prefetched
    pub fn hover_start(&mut self, id: &str, now: Instant, single_mode: bool) {
        if !single_mode || self.prefetched.contains(id) {
            return;
        }
        self.timers.insert(id.to_string(), now + self.delay);
    }

    pub fn hover_end(&mut self, id: &str) {
        self.timers.remove(id);
    }

    /// Threads whose hover lasted long enough, each reported once
    pub fn poll(&mut self, now: Instant) -> Vec<String> {
        let mut due: Vec<String> = self
            .timers
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(id, _)| id.clone())
            .collect();
        due.sort();

        for id in &due {
            self.timers.remove(id);
            self.prefetched.insert(id.clone());
        }
        due
    }

    pub fn is_prefetched(&self, id: &str) -> bool {
        self.prefetched.contains(id)
    }

    /// Allow a thread to be prefetched again, e.g. after its cached detail
    /// went stale
    pub fn forget(&mut self, id: &str) {
        self.prefetched.remove(id);
    }

    /// Drop timers and prefetch history, for a new list
    pub fn reset(&mut self) {
        self.timers.clear();
        self.prefetched.clear();
    }
}
