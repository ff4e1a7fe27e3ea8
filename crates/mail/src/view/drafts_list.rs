//! Drafts list view state
//!
//! Same paging and selection as the thread list; a plain click opens the
//! draft in the composer instead of the detail pane.

use chrono::Local;
use log::{debug, error};

use super::row::RowView;
use super::selection::{Effect, Notice, SelectionEvent, SelectionState};
use super::virtual_list::{Virtualizer, should_load_more};
use crate::actions::MailActions;
use crate::config::Settings;
use crate::error::Result;
use crate::fetch::{DRAFTS_FOLDER, InfiniteList, PageFetcher, list_key};
use crate::models::{Draft, DraftPage};

/// State of the drafts list
pub struct DraftsListView {
    actions: MailActions,
    fetcher: Box<dyn PageFetcher<DraftPage>>,
    query: String,
    max: usize,
    list: InfiniteList<DraftPage>,
    row_height: f32,
    virtualizer: Virtualizer,
    selection: SelectionState,
    /// Draft opened in the composer
    editing: Option<String>,
}

impl DraftsListView {
    pub fn new(
        actions: MailActions,
        fetcher: Box<dyn PageFetcher<DraftPage>>,
        settings: &Settings,
        compact: bool,
    ) -> Self {
        let row_height = settings.row_height(compact);
        let mut view = Self {
            actions,
            fetcher,
            query: String::new(),
            max: settings.default_page_size,
            list: InfiniteList::default(),
            row_height,
            virtualizer: Virtualizer::new(0, row_height, 0.0).with_overscan(settings.overscan),
            selection: SelectionState::new(),
            editing: None,
        };
        view.rekey();
        view
    }

    pub fn with_page_size(mut self, max: usize) -> Self {
        self.max = max;
        self.rekey();
        self
    }

    pub fn drafts(&self) -> Vec<&Draft> {
        self.list.items().collect()
    }

    pub fn list(&self) -> &InfiniteList<DraftPage> {
        &self.list
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    fn rekey(&mut self) {
        let session = self.actions.context().session();
        let key = list_key(session.as_ref(), DRAFTS_FOLDER, &self.query, self.max, None);
        self.list.reset(key);
        self.sync_items();
    }

    fn sync_items(&mut self) {
        let items: Vec<&Draft> = self.list.items().collect();
        self.virtualizer.set_count(items.len());
        self.selection.apply(SelectionEvent::ItemsChanged, &items);
    }

    /// Filter drafts by a search query
    pub fn search(&mut self, query: &str) {
        if self.query == query {
            return;
        }
        self.query = query.to_string();
        let no_items: &[Draft] = &[];
        self.selection.apply(SelectionEvent::Navigate, no_items);
        self.editing = None;
        self.virtualizer.scroll_to(0.0);
        self.rekey();
    }

    pub fn load_more(&mut self) -> Result<bool> {
        let loaded = self.list.load_more(self.fetcher.as_ref())?;
        if loaded {
            self.sync_items();
        }
        Ok(loaded)
    }

    pub fn on_scroll(&mut self, scroll_top: f32, client_height: f32) -> Result<bool> {
        self.virtualizer.resize(client_height);
        self.virtualizer.scroll_to(scroll_top);

        let near_bottom = should_load_more(
            scroll_top,
            self.virtualizer.total_size(),
            client_height,
            self.row_height,
            self.list.is_validating(),
        );
        if near_bottom && !self.list.is_reaching_end() {
            debug!("Loading more drafts");
            return self.load_more();
        }
        Ok(false)
    }

    pub fn visible_rows(&self) -> Vec<RowView> {
        let drafts = self.drafts();
        let now = Local::now();
        self.virtualizer
            .virtual_items()
            .iter()
            .filter_map(|item| drafts.get(item.index))
            .map(|draft| RowView::for_draft(draft, &self.selection, &self.query, now))
            .collect()
    }

    pub fn handle(&mut self, event: SelectionEvent) -> Result<Vec<Notice>> {
        let effects = {
            let items: Vec<&Draft> = self.list.items().collect();
            self.selection.apply(event, &items)
        };

        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::Open(id) => self.editing = Some(id),
                Effect::Close => self.editing = None,
                Effect::Notice(notice) => notices.push(notice),
                // Opening a draft does not mark it read
                Effect::MarkRead(ids) if ids.len() == 1 && self.selection.bulk().is_empty() => {}
                Effect::MarkRead(ids) => notices.push(self.bulk_mark(ids, false)),
                Effect::MarkUnread(ids) => notices.push(self.bulk_mark(ids, true)),
            }
        }
        Ok(notices)
    }

    fn bulk_mark(&mut self, ids: Vec<String>, unread: bool) -> Notice {
        let result = if unread {
            self.actions.mark_as_unread(&ids)
        } else {
            self.actions.mark_as_read(&ids)
        };
        match (result, unread) {
            (Ok(r), true) if r.success => {
                self.selection.clear_bulk();
                Notice::MarkedAsUnread
            }
            (Ok(r), false) if r.success => {
                self.selection.clear_bulk();
                Notice::MarkedAsRead
            }
            (result, unread) => {
                if let Err(e) = result {
                    error!("Marking {} drafts failed: {}", ids.len(), e);
                }
                if unread {
                    Notice::FailedToMarkAsUnread
                } else {
                    Notice::FailedToMarkAsRead
                }
            }
        }
    }
}
