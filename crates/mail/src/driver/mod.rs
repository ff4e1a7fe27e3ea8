//! Mail provider drivers
//!
//! A driver exposes one uniform capability set over a provider's native API.
//! The action layer only ever talks to [`MailDriver`]; [`create_driver`]
//! picks the concrete implementation from a connection's provider ID.
//!
//! This module provides:
//! - The driver trait and its request/response types
//! - A Gmail implementation over the REST API
//! - An in-memory mailbox for tests and offline use
//! - Body decoding helpers shared by drivers

mod api;
mod auth;
mod gmail;
mod memory;
mod normalize;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GmailCredentials;
use crate::error::{Error, Result};
use crate::models::{DraftPage, ThreadDetail, ThreadId, ThreadPage};

pub use auth::TokenRefresher;
pub use gmail::GmailDriver;
pub use memory::{DriverCall, FixedDriverFactory, InMemoryDriver};
pub use normalize::{find_html_body, from_base64_url, from_binary};

/// Prefix used by the background queue for thread keys
pub const THREAD_KEY_PREFIX: &str = "thread:";

/// Label changes applied uniformly to a batch of threads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDelta {
    #[serde(default)]
    pub add_labels: Vec<String>,
    #[serde(default)]
    pub remove_labels: Vec<String>,
}

impl LabelDelta {
    pub fn new(add_labels: Vec<String>, remove_labels: Vec<String>) -> Self {
        Self {
            add_labels,
            remove_labels,
        }
    }

    pub fn add(label: &str) -> Self {
        Self::new(vec![label.to_string()], Vec::new())
    }

    pub fn remove(label: &str) -> Self {
        Self::new(Vec::new(), vec![label.to_string()])
    }

    pub fn is_empty(&self) -> bool {
        self.add_labels.is_empty() && self.remove_labels.is_empty()
    }
}

/// Result of [`MailDriver::normalize_ids`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedIds {
    pub thread_ids: Vec<ThreadId>,
}

/// Parameters of a thread listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub folder: String,
    pub query: String,
    pub max: usize,
    pub label_ids: Option<Vec<String>>,
    pub page_token: Option<String>,
}

impl ListParams {
    pub fn new(folder: impl Into<String>, max: usize) -> Self {
        Self {
            folder: folder.into(),
            query: String::new(),
            max,
            label_ids: None,
            page_token: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_page_token(mut self, token: Option<String>) -> Self {
        self.page_token = token.filter(|t| !t.is_empty());
        self
    }
}

/// Uniform capability set over a mail provider
pub trait MailDriver: Send + Sync {
    /// List one page of threads in a folder
    fn list(&self, params: &ListParams) -> Result<ThreadPage>;

    /// List one page of drafts
    fn list_drafts(&self, query: &str, max: usize, page_token: Option<&str>) -> Result<DraftPage>;

    /// Fetch a full thread with message bodies and labels
    fn get(&self, id: &ThreadId) -> Result<ThreadDetail>;

    fn mark_as_read(&self, ids: &[ThreadId]) -> Result<()>;

    fn mark_as_unread(&self, ids: &[ThreadId]) -> Result<()>;

    /// Apply one label delta to every thread in `ids`
    fn modify_labels(&self, ids: &[ThreadId], delta: &LabelDelta) -> Result<()>;

    fn delete(&self, id: &ThreadId) -> Result<()>;

    /// Map caller-supplied identifiers to provider thread IDs
    fn normalize_ids(&self, ids: &[String]) -> NormalizedIds {
        normalize_thread_ids(ids)
    }
}

/// Strip the `thread:` key prefix and drop empty identifiers
pub fn normalize_thread_ids(ids: &[String]) -> NormalizedIds {
    let thread_ids = ids
        .iter()
        .map(|id| id.strip_prefix(THREAD_KEY_PREFIX).unwrap_or(id))
        .filter(|id| !id.is_empty())
        .map(ThreadId::new)
        .collect();
    NormalizedIds { thread_ids }
}

/// Credentials a driver is created with
#[derive(Debug, Clone)]
pub struct DriverAuth {
    pub access_token: String,
    pub refresh_token: String,
    pub email: String,
}

/// Builds drivers for stored connections
pub trait DriverFactory: Send + Sync {
    fn create(&self, provider_id: &str, auth: DriverAuth) -> Result<Arc<dyn MailDriver>>;
}

/// Factory for the built-in provider drivers
#[derive(Debug, Clone, Default)]
pub struct ProviderDrivers {
    credentials: Option<GmailCredentials>,
}

impl ProviderDrivers {
    /// Use explicit OAuth client credentials for token refresh
    pub fn new(credentials: Option<GmailCredentials>) -> Self {
        Self { credentials }
    }

    /// Load OAuth client credentials from the usual locations, if any
    pub fn from_env() -> Self {
        Self::new(GmailCredentials::load().ok())
    }
}

impl DriverFactory for ProviderDrivers {
    fn create(&self, provider_id: &str, auth: DriverAuth) -> Result<Arc<dyn MailDriver>> {
        create_driver(provider_id, auth, self.credentials.clone())
    }
}

/// Create the driver for a provider ID
pub fn create_driver(
    provider_id: &str,
    auth: DriverAuth,
    credentials: Option<GmailCredentials>,
) -> Result<Arc<dyn MailDriver>> {
    match provider_id {
        "google" | "gmail" => Ok(Arc::new(GmailDriver::new(auth, credentials))),
        other => {
            log::warn!("No driver for provider {}", other);
            Err(Error::invalid_connection())
        }
    }
}
