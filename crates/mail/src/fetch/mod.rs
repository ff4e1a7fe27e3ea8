//! Fetch/cache layer
//!
//! Client-side paging over the list endpoint. A list is keyed by session,
//! folder, query, page size and label filter; pages grow one at a time along
//! the continuation cursor and stop at the first page without one.
//!
//! This module provides:
//! - List keys and page fetchers (HTTP or direct action calls)
//! - [`InfiniteList`], the paged cache with request supersession
//! - The background removal queue, debounce and hover prefetch timers
//! - A cache of full threads for the detail view

mod cache;
mod fetcher;
mod infinite;
mod key;
mod queue;
mod timing;

pub use cache::{ThreadDetailCache, ThreadKey, thread_key};
pub use fetcher::{ActionPageFetcher, HttpPageFetcher, PageFetcher};
pub use infinite::{InfiniteList, PageRequest, Paged};
pub use key::{DRAFTS_FOLDER, ListKey, list_key};
pub use queue::BackgroundQueue;
pub use timing::{Debounce, HoverPrefetch};
