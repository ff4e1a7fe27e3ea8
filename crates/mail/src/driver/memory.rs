//! In-memory driver
//!
//! Holds a mailbox in memory and records every capability invoked on it.
//! Used by tests and by the CLI's offline mode.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use super::{DriverAuth, DriverFactory, LabelDelta, ListParams, MailDriver};
use crate::error::{Error, ErrorKind, Result};
use crate::models::{
    Draft, DraftPage, Label, LabelId, MessageId, ParsedMessage, ThreadDetail, ThreadId,
    ThreadPage, ThreadSummary,
};

/// A capability invocation seen by [`InMemoryDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    List {
        folder: String,
        page_token: Option<String>,
    },
    ListDrafts {
        page_token: Option<String>,
    },
    Get(ThreadId),
    MarkAsRead(Vec<ThreadId>),
    MarkAsUnread(Vec<ThreadId>),
    ModifyLabels(Vec<ThreadId>, LabelDelta),
    Delete(ThreadId),
}

/// Mailbox held in memory
#[derive(Default)]
pub struct InMemoryDriver {
    threads: RwLock<Vec<ThreadSummary>>,
    drafts: RwLock<Vec<Draft>>,
    calls: Mutex<Vec<DriverCall>>,
    /// Provider error code every capability fails with
    failure: RwLock<Option<String>>,
    /// Threads whose `get` fails
    failing_gets: RwLock<HashSet<ThreadId>>,
}

fn poisoned() -> Error {
    Error::new(ErrorKind::Provider, "mailbox lock poisoned")
}

impl InMemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailbox seeded with threads in listing order
    pub fn with_threads(threads: Vec<ThreadSummary>) -> Self {
        let driver = Self::new();
        if let Ok(mut stored) = driver.threads.write() {
            *stored = threads;
        }
        driver
    }

    pub fn add_draft(&self, draft: Draft) {
        if let Ok(mut drafts) = self.drafts.write() {
            drafts.push(draft);
        }
    }

    /// Make every subsequent call fail with a provider error `code`
    pub fn fail_with(&self, code: impl Into<String>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = Some(code.into());
        }
    }

    pub fn clear_failure(&self) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = None;
        }
    }

    /// Make `get` fail for one thread
    pub fn fail_get(&self, id: impl Into<ThreadId>) {
        if let Ok(mut failing) = self.failing_gets.write() {
            failing.insert(id.into());
        }
    }

    /// Capabilities invoked so far
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Current state of a thread
    pub fn thread(&self, id: &str) -> Option<ThreadSummary> {
        self.threads
            .read()
            .ok()?
            .iter()
            .find(|t| t.id.as_str() == id)
            .cloned()
    }

    fn record(&self, call: DriverCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match self.failure.read().map_err(|_| poisoned())?.as_deref() {
            Some(code) => Err(Error::provider(code)),
            None => Ok(()),
        }
    }
}

/// Whether a thread belongs in a folder listing
fn in_folder(thread: &ThreadSummary, folder: &str) -> bool {
    let has = |label: &str| thread.tags.iter().any(|t| t.eq_ignore_ascii_case(label));
    match folder.to_lowercase().as_str() {
        "" | "inbox" => has(LabelId::INBOX),
        "bin" | "trash" => has(LabelId::TRASH),
        "archive" => !has(LabelId::INBOX) && !has(LabelId::TRASH) && !has(LabelId::SPAM),
        other => has(other),
    }
}

fn matches_query(thread: &ThreadSummary, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || thread.subject.to_lowercase().contains(&query)
        || thread.sender.email.to_lowercase().contains(&query)
}

/// Offset-based page tokens
fn page_bounds(
    page_token: Option<&str>,
    max: usize,
    total: usize,
) -> (usize, usize, Option<String>) {
    let start = page_token
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(0)
        .min(total);
    let end = start.saturating_add(max.max(1)).min(total);
    let next = (end < total).then(|| end.to_string());
    (start, end, next)
}

fn detail_of(thread: &ThreadSummary) -> ThreadDetail {
    let mut message = ParsedMessage::new(MessageId::new(thread.id.as_str()), thread.id.clone());
    message.sender = thread.sender.clone();
    message.subject = thread.subject.clone();
    message.received_on = thread.received_on;
    message.unread = thread.unread;
    message.tags = thread.tags.iter().map(|t| Label::new(t.as_str(), t.as_str())).collect();
    ThreadDetail::from_messages(vec![message])
}

fn apply_delta(thread: &mut ThreadSummary, delta: &LabelDelta) {
    thread
        .tags
        .retain(|t| !delta.remove_labels.iter().any(|r| r.eq_ignore_ascii_case(t)));
    for label in &delta.add_labels {
        if !thread.tags.iter().any(|t| t.eq_ignore_ascii_case(label)) {
            thread.tags.push(label.clone());
        }
    }
    if delta.add_labels.iter().any(|l| l == LabelId::UNREAD) {
        thread.unread = true;
    }
    if delta.remove_labels.iter().any(|l| l == LabelId::UNREAD) {
        thread.unread = false;
    }
}

impl MailDriver for InMemoryDriver {
    fn list(&self, params: &ListParams) -> Result<ThreadPage> {
        self.record(DriverCall::List {
            folder: params.folder.clone(),
            page_token: params.page_token.clone(),
        })?;

        let threads = self.threads.read().map_err(|_| poisoned())?;
        let matching: Vec<&ThreadSummary> = threads
            .iter()
            .filter(|t| in_folder(t, &params.folder))
            .filter(|t| matches_query(t, &params.query))
            .filter(|t| {
                params
                    .label_ids
                    .as_ref()
                    .is_none_or(|labels| labels.iter().all(|l| t.tags.contains(l)))
            })
            .collect();

        let (start, end, next) =
            page_bounds(params.page_token.as_deref(), params.max, matching.len());

        Ok(ThreadPage {
            threads: matching[start..end].iter().map(|t| (*t).clone()).collect(),
            next_page_token: next,
            result_size_estimate: matching.len() as u32,
        })
    }

    fn list_drafts(&self, query: &str, max: usize, page_token: Option<&str>) -> Result<DraftPage> {
        self.record(DriverCall::ListDrafts {
            page_token: page_token.map(str::to_string),
        })?;

        let query = query.trim().to_lowercase();
        let drafts = self.drafts.read().map_err(|_| poisoned())?;
        let matching: Vec<&Draft> = drafts
            .iter()
            .filter(|d| query.is_empty() || d.subject.to_lowercase().contains(&query))
            .collect();

        let (start, end, next) = page_bounds(page_token, max, matching.len());

        Ok(DraftPage {
            drafts: matching[start..end].iter().map(|d| (*d).clone()).collect(),
            next_page_token: next,
        })
    }

    fn get(&self, id: &ThreadId) -> Result<ThreadDetail> {
        self.record(DriverCall::Get(id.clone()))?;
        if self.failing_gets.read().map_err(|_| poisoned())?.contains(id) {
            return Err(Error::provider(format!("failed to fetch thread {}", id)));
        }

        let threads = self.threads.read().map_err(|_| poisoned())?;
        threads
            .iter()
            .find(|t| &t.id == id)
            .map(detail_of)
            .ok_or_else(|| Error::provider("Requested entity was not found."))
    }

    fn mark_as_read(&self, ids: &[ThreadId]) -> Result<()> {
        self.record(DriverCall::MarkAsRead(ids.to_vec()))?;
        let mut threads = self.threads.write().map_err(|_| poisoned())?;
        for thread in threads.iter_mut().filter(|t| ids.contains(&t.id)) {
            apply_delta(thread, &LabelDelta::remove(LabelId::UNREAD));
        }
        Ok(())
    }

    fn mark_as_unread(&self, ids: &[ThreadId]) -> Result<()> {
        self.record(DriverCall::MarkAsUnread(ids.to_vec()))?;
        let mut threads = self.threads.write().map_err(|_| poisoned())?;
        for thread in threads.iter_mut().filter(|t| ids.contains(&t.id)) {
            apply_delta(thread, &LabelDelta::add(LabelId::UNREAD));
        }
        Ok(())
    }

    fn modify_labels(&self, ids: &[ThreadId], delta: &LabelDelta) -> Result<()> {
        self.record(DriverCall::ModifyLabels(ids.to_vec(), delta.clone()))?;
        let mut threads = self.threads.write().map_err(|_| poisoned())?;
        for thread in threads.iter_mut().filter(|t| ids.contains(&t.id)) {
            apply_delta(thread, delta);
        }
        Ok(())
    }

    fn delete(&self, id: &ThreadId) -> Result<()> {
        self.record(DriverCall::Delete(id.clone()))?;
        let mut threads = self.threads.write().map_err(|_| poisoned())?;
        threads.retain(|t| &t.id != id);
        Ok(())
    }
}

/// Factory handing out one shared driver for every provider
#[derive(Clone)]
pub struct FixedDriverFactory {
    driver: Arc<dyn MailDriver>,
}

impl FixedDriverFactory {
    pub fn new(driver: Arc<dyn MailDriver>) -> Self {
        Self { driver }
    }
}

impl DriverFactory for FixedDriverFactory {
    fn create(&self, _provider_id: &str, _auth: DriverAuth) -> Result<Arc<dyn MailDriver>> {
        Ok(Arc::clone(&self.driver))
    }
}
