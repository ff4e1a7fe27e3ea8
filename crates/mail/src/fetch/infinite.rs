//! Paged list cache with incremental growth
//!
//! Pages are fetched one at a time along the continuation cursor. At most one
//! request per list is outstanding: asking again while one is in flight
//! coalesces onto it, and starting a revalidation or navigating supersedes
//! it so its late result is dropped. Requests are handed out as
//! [`PageRequest`] tickets so the caller decides how and where to perform
//! the fetch.

use log::debug;

use super::fetcher::PageFetcher;
use super::key::ListKey;
use super::queue::BackgroundQueue;
use crate::error::Result;
use crate::models::{Draft, DraftPage, ThreadId, ThreadPage, ThreadSummary};

/// A page type with items and a continuation cursor
pub trait Paged {
    type Item;

    fn items(&self) -> &[Self::Item];

    fn items_mut(&mut self) -> &mut Vec<Self::Item>;

    /// Cursor of the next page; `None` marks the terminal page
    fn next_cursor(&self) -> Option<&str>;
}

impl Paged for ThreadPage {
    type Item = ThreadSummary;

    fn items(&self) -> &[ThreadSummary] {
        &self.threads
    }

    fn items_mut(&mut self) -> &mut Vec<ThreadSummary> {
        &mut self.threads
    }

    fn next_cursor(&self) -> Option<&str> {
        ThreadPage::next_cursor(self)
    }
}

impl Paged for DraftPage {
    type Item = Draft;

    fn items(&self) -> &[Draft] {
        &self.drafts
    }

    fn items_mut(&mut self) -> &mut Vec<Draft> {
        &mut self.drafts
    }

    fn next_cursor(&self) -> Option<&str> {
        DraftPage::next_cursor(self)
    }
}

/// Ticket for one outstanding page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub key: ListKey,
    /// Position the fetched page will take
    pub index: usize,
    pub page_token: Option<String>,
    generation: u64,
    seq: u64,
}

/// Ordered pages of one list key
#[derive(Debug)]
pub struct InfiniteList<P> {
    key: Option<ListKey>,
    pages: Vec<P>,
    /// Bumped whenever outstanding requests become stale
    generation: u64,
    next_seq: u64,
    in_flight: Option<PageRequest>,
    last_error: Option<String>,
}

impl<P> Default for InfiniteList<P> {
    fn default() -> Self {
        Self {
            key: None,
            pages: Vec::new(),
            generation: 0,
            next_seq: 0,
            in_flight: None,
            last_error: None,
        }
    }
}

impl<P: Paged> InfiniteList<P> {
    pub fn new(key: Option<ListKey>) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn key(&self) -> Option<&ListKey> {
        self.key.as_ref()
    }

    /// Switch to another key, dropping pages and any outstanding request.
    /// A no-op when the key is unchanged.
    pub fn reset(&mut self, key: Option<ListKey>) {
        if self.key == key {
            return;
        }
        debug!("List key changed, discarding {} pages", self.pages.len());
        self.key = key;
        self.pages.clear();
        self.generation += 1;
        self.in_flight = None;
        self.last_error = None;
    }

    pub fn pages(&self) -> &[P] {
        &self.pages
    }

    /// Number of loaded pages
    pub fn size(&self) -> usize {
        self.pages.len()
    }

    /// Items of all loaded pages in order
    pub fn items(&self) -> impl Iterator<Item = &P::Item> {
        self.pages.iter().flat_map(|p| p.items().iter())
    }

    /// First page is being fetched
    pub fn is_loading(&self) -> bool {
        self.pages.is_empty() && self.in_flight.is_some()
    }

    /// Any request is outstanding
    pub fn is_validating(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&PageRequest> {
        self.in_flight.as_ref()
    }

    /// The last loaded page carries no continuation cursor
    pub fn is_reaching_end(&self) -> bool {
        self.pages.last().is_some_and(|p| p.next_cursor().is_none())
    }

    pub fn next_page_token(&self) -> Option<&str> {
        self.pages.last().and_then(|p| p.next_cursor())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ticket(&mut self, key: ListKey, index: usize, page_token: Option<String>) -> PageRequest {
        self.next_seq += 1;
        let ticket = PageRequest {
            key,
            index,
            page_token,
            generation: self.generation,
            seq: self.next_seq,
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// Request the next page
    ///
    /// Returns `None` without a key, after the terminal page, or while a
    /// request is already outstanding (the caller shares that one).
    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        let key = self.key.clone()?;
        if self.in_flight.is_some() || self.is_reaching_end() {
            return None;
        }
        let index = self.pages.len();
        let page_token = self.next_page_token().map(str::to_string);
        Some(self.ticket(key, index, page_token))
    }

    /// Refetch from the first page, superseding any outstanding request
    pub fn revalidate(&mut self) -> Option<PageRequest> {
        let key = self.key.clone()?;
        self.generation += 1;
        Some(self.ticket(key, 0, None))
    }

    /// Apply the result of a ticket
    ///
    /// Returns `Ok(false)` when the ticket was superseded and its result
    /// dropped. A fetch error clears the request and is passed through.
    pub fn complete(&mut self, request: PageRequest, result: Result<P>) -> Result<bool> {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|r| r.seq == request.seq && r.generation == request.generation);
        if !current || request.generation != self.generation {
            debug!(
                "Dropping superseded page {} for {}",
                request.index, request.key.folder
            );
            return Ok(false);
        }
        self.in_flight = None;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.last_error = Some(e.message().to_string());
                return Err(e);
            }
        };
        self.last_error = None;

        if request.index >= self.pages.len() {
            self.pages.push(page);
        } else if request.index == 0 {
            // A fresh first page with a different cursor invalidates the chain
            let same_chain = self.pages[0].next_cursor() == page.next_cursor();
            self.pages[0] = page;
            if !same_chain {
                self.pages.truncate(1);
            }
        } else {
            self.pages[request.index] = page;
        }
        Ok(true)
    }

    /// Fetch and apply the next page; `Ok(false)` when nothing was requested
    pub fn load_more<F: PageFetcher<P> + ?Sized>(&mut self, fetcher: &F) -> Result<bool> {
        let Some(request) = self.begin_load_more() else {
            return Ok(false);
        };
        let result = fetcher.fetch_page(&request.key, request.page_token.as_deref());
        self.complete(request, result)
    }

    /// Refetch the first page and apply it
    pub fn revalidate_with<F: PageFetcher<P> + ?Sized>(&mut self, fetcher: &F) -> Result<bool> {
        let Some(request) = self.revalidate() else {
            return Ok(false);
        };
        let result = fetcher.fetch_page(&request.key, request.page_token.as_deref());
        self.complete(request, result)
    }
}

impl InfiniteList<ThreadPage> {
    /// Loaded threads minus those pending background removal
    pub fn threads(&self, queue: &BackgroundQueue) -> Vec<&ThreadSummary> {
        self.items()
            .filter(|t| !queue.contains(t.id.as_str()))
            .collect()
    }

    /// Optimistically update a loaded thread; returns whether it was found
    pub fn update_thread(&mut self, id: &ThreadId, update: impl FnOnce(&mut ThreadSummary)) -> bool {
        let thread = self
            .pages
            .iter_mut()
            .flat_map(|p| p.threads.iter_mut())
            .find(|t| &t.id == id);
        match thread {
            Some(thread) => {
                update(thread);
                true
            }
            None => false,
        }
    }
}
