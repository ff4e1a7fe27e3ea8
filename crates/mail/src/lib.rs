//! Mail crate - Client-side core of the Zero mail client
//!
//! This crate provides platform-independent mail functionality including:
//! - Domain models (threads, drafts, connections)
//! - A driver interface over mail providers, with a Gmail implementation
//! - Connection storage (SQLite and in-memory)
//! - The server action layer exposing mutations as `{success, error}` results
//! - Paged list fetching with request supersession and background removal
//! - Renderer-independent list views: virtualization, selection, rows
//! - The style-matched composition prompt builder
//!
//! Nothing here depends on a UI toolkit; front ends drive the view state
//! with events and render what it exposes.

pub mod actions;
pub mod compose;
pub mod config;
pub mod driver;
pub mod error;
pub mod fetch;
pub mod models;
pub mod storage;
pub mod view;

pub use actions::{
    ActionContext, ActionResult, INBOX_PATH, ListRequest, MailActions, RevalidationLog,
    Revalidator, SessionProvider, StaticSession,
};
pub use compose::{ComposeContext, StyleMetrics, build_compose_prompt};
pub use config::{DEFAULT_PAGE_SIZE, GmailCredentials, Settings};
pub use driver::{
    DriverAuth, DriverFactory, GmailDriver, InMemoryDriver, LabelDelta, ListParams, MailDriver,
    ProviderDrivers,
};
pub use error::{Error, ErrorKind, Result};
pub use fetch::{ActionPageFetcher, HttpPageFetcher, InfiniteList, ListKey, PageFetcher, list_key};
pub use models::{
    Connection, Draft, DraftPage, EmailAddress, Label, LabelId, Session, ThreadDetail, ThreadId,
    ThreadPage, ThreadSummary,
};
pub use storage::{ConnectionStore, InMemoryConnectionStore, SqliteConnectionStore};
pub use view::{DraftsListView, SelectionEvent, SelectionState, ThreadListView};
