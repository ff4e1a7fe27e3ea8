//! Thread list view state
//!
//! Owns everything one mail list needs between UI events: the paged cache,
//! the row virtualizer, the selection, the background removal queue and the
//! timers. Front ends feed it scroll, pointer and key events and render
//! [`RowView`]s back out.

use chrono::Local;
use log::{debug, error, info};
use std::time::Instant;

use super::row::RowView;
use super::selection::{Effect, Notice, SelectMode, SelectionEvent, SelectionState};
use super::virtual_list::{Virtualizer, should_load_more};
use crate::actions::{ActionResult, MailActions};
use crate::config::Settings;
use crate::error::Result;
use crate::fetch::{
    BackgroundQueue, Debounce, HoverPrefetch, InfiniteList, PageFetcher, ThreadDetailCache,
    list_key, thread_key,
};
use crate::models::{ThreadDetail, ThreadId, ThreadPage, ThreadSummary};

/// What to show when the list has no rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyState {
    /// A search matched nothing
    Search,
    /// The folder itself is empty
    Folder(String),
}

/// State of one thread list
pub struct ThreadListView {
    actions: MailActions,
    fetcher: Box<dyn PageFetcher<ThreadPage>>,
    folder: String,
    query: String,
    max: usize,
    list: InfiniteList<ThreadPage>,
    row_height: f32,
    virtualizer: Virtualizer,
    selection: SelectionState,
    queue: BackgroundQueue,
    revalidate: Debounce,
    hover: HoverPrefetch,
    details: ThreadDetailCache,
    opened: Option<String>,
}

impl ThreadListView {
    pub fn new(
        actions: MailActions,
        fetcher: Box<dyn PageFetcher<ThreadPage>>,
        folder: impl Into<String>,
        settings: &Settings,
        compact: bool,
    ) -> Self {
        let row_height = settings.row_height(compact);
        let mut view = Self {
            actions,
            fetcher,
            folder: folder.into(),
            query: String::new(),
            max: settings.default_page_size,
            list: InfiniteList::default(),
            row_height,
            virtualizer: Virtualizer::new(0, row_height, settings.list_gap)
                .with_overscan(settings.overscan),
            selection: SelectionState::new(),
            queue: BackgroundQueue::new(),
            revalidate: Debounce::from_millis(settings.revalidate_debounce_ms),
            hover: HoverPrefetch::from_millis(settings.hover_prefetch_delay_ms),
            details: ThreadDetailCache::new(),
            opened: None,
        };
        view.rekey();
        view
    }

    pub fn with_page_size(mut self, max: usize) -> Self {
        self.max = max;
        self.rekey();
        self
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn list(&self) -> &InfiniteList<ThreadPage> {
        &self.list
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    pub fn queue(&self) -> &BackgroundQueue {
        &self.queue
    }

    /// Thread shown in the detail pane
    pub fn opened(&self) -> Option<&str> {
        self.opened.as_deref()
    }

    /// Loaded threads in list order, minus pending removals
    pub fn threads(&self) -> Vec<&ThreadSummary> {
        self.list.threads(&self.queue)
    }

    fn rekey(&mut self) {
        let session = self.actions.context().session();
        let key = list_key(session.as_ref(), &self.folder, &self.query, self.max, None);
        if key.is_none() {
            debug!("No active connection, list disabled");
        }
        self.list.reset(key);
        self.sync_items();
    }

    /// Keep the virtualizer and selection in step with the loaded rows
    fn sync_items(&mut self) {
        let items = self.list.threads(&self.queue);
        self.virtualizer.set_count(items.len());
        self.selection.apply(SelectionEvent::ItemsChanged, &items);
    }

    /// Move to another folder or search; drops pages, selection and scroll
    pub fn navigate(&mut self, folder: &str, query: &str) {
        if self.folder == folder && self.query == query {
            return;
        }
        info!("Navigating to {} (q={:?})", folder, query);
        self.folder = folder.to_string();
        self.query = query.to_string();
        let no_items: &[ThreadSummary] = &[];
        self.selection.apply(SelectionEvent::Navigate, no_items);
        self.revalidate.cancel();
        self.hover.reset();
        self.opened = None;
        self.virtualizer.scroll_to(0.0);
        self.rekey();
    }

    /// Fetch the next page; `Ok(false)` at the end or with nothing to fetch
    pub fn load_more(&mut self) -> Result<bool> {
        let loaded = self.list.load_more(self.fetcher.as_ref())?;
        if loaded {
            debug!("Loaded page {} of {}", self.list.size(), self.folder);
            self.sync_items();
        }
        Ok(loaded)
    }

    /// Refetch the first page now, dropping cached thread details
    pub fn refresh(&mut self) -> Result<bool> {
        if self.revalidate.flush() {
            debug!("Running the pending revalidation of {} now", self.folder);
        }
        if let Some(connection) = self.active_connection() {
            self.details.invalidate_connection(&connection);
        }
        self.hover.reset();
        self.revalidate_now()
    }

    fn revalidate_now(&mut self) -> Result<bool> {
        let connection = self.active_connection();
        let applied = self.list.revalidate_with(self.fetcher.as_ref());
        self.drop_connection_details(connection.as_deref(), &applied);
        if applied? {
            self.sync_items();
            return Ok(true);
        }
        Ok(false)
    }

    fn active_connection(&self) -> Option<String> {
        self.actions
            .context()
            .session()
            .and_then(|s| s.active_connection_id().map(str::to_string))
    }

    /// Forget cached details of threads that were just changed
    fn invalidate_details(&mut self, ids: &[String]) {
        let session = self.actions.context().session();
        for id in ids {
            if let Some(key) = thread_key(session.as_ref(), id) {
                self.details.invalidate(&key);
            }
            self.hover.forget(id);
        }
    }

    /// After a fatal provider error the connection is gone, and so are its
    /// cached details
    fn drop_connection_details<T>(&mut self, connection: Option<&str>, result: &Result<T>) {
        if let (Some(connection), Err(e)) = (connection, result)
            && e.is_fatal()
        {
            info!("Connection {} was torn down, dropping cached threads", connection);
            self.details.invalidate_connection(connection);
            self.hover.reset();
        }
    }

    /// Record the scroll position; loads the next page near the bottom
    pub fn on_scroll(&mut self, scroll_top: f32, client_height: f32) -> Result<bool> {
        self.virtualizer.resize(client_height);
        self.virtualizer.scroll_to(scroll_top);

        let busy = self.list.is_loading() || self.list.is_validating();
        let near_bottom = should_load_more(
            scroll_top,
            self.virtualizer.total_size(),
            client_height,
            self.row_height,
            busy,
        );
        if near_bottom && !self.list.is_reaching_end() {
            return self.load_more();
        }
        Ok(false)
    }

    /// Rows intersecting the viewport
    pub fn visible_rows(&self) -> Vec<RowView> {
        let threads = self.threads();
        let now = Local::now();
        self.virtualizer
            .virtual_items()
            .iter()
            .filter_map(|item| threads.get(item.index))
            .map(|thread| RowView::for_thread(thread, &self.selection, &self.query, now))
            .collect()
    }

    /// Empty-state to show, if the list has finished loading with no rows
    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.list.size() == 0 || self.list.is_validating() || !self.threads().is_empty() {
            return None;
        }
        if self.query.trim().is_empty() {
            Some(EmptyState::Folder(self.folder.clone()))
        } else {
            Some(EmptyState::Search)
        }
    }

    /// Feed a selection event and carry out the resulting effects
    pub fn handle(&mut self, event: SelectionEvent, now: Instant) -> Result<Vec<Notice>> {
        let effects = {
            let items = self.list.threads(&self.queue);
            self.selection.apply(event, &items)
        };

        let mut notices = Vec::new();
        for effect in effects {
            if let Some(notice) = self.perform(effect, now)? {
                notices.push(notice);
            }
        }
        Ok(notices)
    }

    /// Shorthand for a click on a row
    pub fn click(&mut self, id: &str, now: Instant) -> Result<Vec<Notice>> {
        self.handle(SelectionEvent::Click(id.to_string()), now)
    }

    fn perform(&mut self, effect: Effect, now: Instant) -> Result<Option<Notice>> {
        match effect {
            Effect::Open(id) => {
                self.hover.hover_end(&id);
                self.opened = Some(id);
                Ok(None)
            }
            Effect::Close => {
                self.opened = None;
                Ok(None)
            }
            Effect::Notice(notice) => Ok(Some(notice)),
            Effect::MarkRead(ids) => self.mark(ids, false, now),
            Effect::MarkUnread(ids) => self.mark(ids, true, now),
        }
    }

    /// Mark threads read or unread
    ///
    /// A bulk mark reports its outcome and clears the bulk set on success;
    /// the implicit mark-read on open is silent. Either way the list is
    /// refetched after the debounce delay.
    fn mark(&mut self, ids: Vec<String>, unread: bool, now: Instant) -> Result<Option<Notice>> {
        let bulk = !self.selection.bulk().is_empty() && self.selection.bulk() == ids.as_slice();
        let connection = self.active_connection();
        let result = if unread {
            self.actions.mark_as_unread(&ids)
        } else {
            self.actions.mark_as_read(&ids)
        };
        self.drop_connection_details(connection.as_deref(), &result);

        let outcome = match result {
            Ok(ActionResult { success: true, .. }) => {
                for id in &ids {
                    self.list
                        .update_thread(&ThreadId::new(id.as_str()), |t| t.set_unread(unread));
                }
                self.invalidate_details(&ids);
                self.revalidate.trigger(now);
                true
            }
            Ok(ActionResult { error, .. }) => {
                error!("Marking {} threads failed: {:?}", ids.len(), error);
                false
            }
            Err(e) if !bulk => return Err(e),
            Err(e) => {
                error!("Marking {} threads failed: {}", ids.len(), e);
                false
            }
        };

        if !bulk {
            return Ok(None);
        }
        if outcome {
            self.selection.clear_bulk();
        }
        Ok(Some(match (outcome, unread) {
            (true, true) => Notice::MarkedAsUnread,
            (true, false) => Notice::MarkedAsRead,
            (false, true) => Notice::FailedToMarkAsUnread,
            (false, false) => Notice::FailedToMarkAsRead,
        }))
    }

    /// Start the hover timer on a row; prefetching only happens in single mode
    pub fn hover_start(&mut self, id: &str, now: Instant) {
        let single = self.selection.mode() == SelectMode::Single;
        self.hover.hover_start(id, now, single);
    }

    pub fn hover_end(&mut self, id: &str) {
        self.hover.hover_end(id);
    }

    /// Run due timers: the debounced refetch and hover prefetches
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        if self.revalidate.poll(now) {
            debug!("Revalidating {}", self.folder);
            self.revalidate_now()?;
        }

        for id in self.hover.poll(now) {
            let session = self.actions.context().session();
            let Some(key) = thread_key(session.as_ref(), &id) else {
                continue;
            };
            let connection = key.connection_id.clone();
            let actions = &self.actions;
            let preloaded = self.details.preload(key, |id| actions.get_mail(id));
            self.drop_connection_details(Some(connection.as_str()), &preloaded);
            if preloaded? {
                debug!("Prefetched thread {}", id);
            }
        }
        Ok(())
    }

    /// Full thread for the detail pane, served from cache when possible
    pub fn detail(&mut self, id: &str) -> Result<Option<&ThreadDetail>> {
        let session = self.actions.context().session();
        let Some(key) = thread_key(session.as_ref(), id) else {
            return Ok(None);
        };
        let connection = key.connection_id.clone();
        let actions = &self.actions;
        let fetched = self.details.preload(key.clone(), |id| actions.get_mail(id));
        self.drop_connection_details(Some(connection.as_str()), &fetched);
        fetched?;
        Ok(self.details.get(&key))
    }

    /// Archive threads, hiding them until the refetch confirms the move
    pub fn archive(&mut self, ids: &[String]) -> Result<ActionResult> {
        let actions = self.actions.clone();
        self.remove_in_background(ids, |ids| actions.bulk_archive(ids))
    }

    /// Move threads to the bin, hiding them until the refetch confirms it
    pub fn trash(&mut self, ids: &[String]) -> Result<ActionResult> {
        let actions = self.actions.clone();
        self.remove_in_background(ids, |ids| actions.bulk_delete_thread(ids))
    }

    fn remove_in_background(
        &mut self,
        ids: &[String],
        op: impl FnOnce(&[String]) -> Result<ActionResult>,
    ) -> Result<ActionResult> {
        for id in ids {
            self.queue.add(id);
        }
        self.sync_items();

        let connection = self.active_connection();
        let result = op(ids);
        self.drop_connection_details(connection.as_deref(), &result);
        let refreshed = match &result {
            Ok(ActionResult { success: true, .. }) => {
                self.invalidate_details(ids);
                self.revalidate_now().map(|_| ())
            }
            _ => Ok(()),
        };

        for id in ids {
            self.queue.remove(id);
        }
        self.sync_items();
        refreshed?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionContext, RevalidationLog, StaticSession};
    use crate::driver::{DriverCall, FixedDriverFactory, InMemoryDriver};
    use crate::fetch::ActionPageFetcher;
    use crate::models::{Connection, EmailAddress, LabelId};
    use crate::storage::{ConnectionStore, InMemoryConnectionStore};
    use crate::view::selection::{Chord, Key};
    use std::sync::Arc;
    use std::time::Duration;

    fn thread(id: &str, unread: bool) -> ThreadSummary {
        ThreadSummary::new(id, EmailAddress::new("ada@example.com"), format!("About {id}"))
            .with_tags(vec![LabelId::INBOX.to_string()])
            .with_unread(unread)
    }

    fn setup(threads: Vec<ThreadSummary>, page_size: usize) -> (ThreadListView, Arc<InMemoryDriver>) {
        let driver = Arc::new(InMemoryDriver::with_threads(threads));
        let store = Arc::new(InMemoryConnectionStore::new());
        store
            .upsert_connection(
                Connection::new("c1", "u1", "google", "me@example.com").with_tokens("a", "r"),
            )
            .unwrap();
        let context = ActionContext::new(
            Arc::new(StaticSession::signed_in("u1", "c1")),
            store,
            Arc::new(FixedDriverFactory::new(driver.clone())),
            Arc::new(RevalidationLog::new()),
        );
        let actions = MailActions::new(context);
        let fetcher = Box::new(ActionPageFetcher::new(actions.clone()));
        let view = ThreadListView::new(actions, fetcher, "inbox", &Settings::default(), false)
            .with_page_size(page_size);
        (view, driver)
    }

    fn ids(view: &ThreadListView) -> Vec<&str> {
        view.threads().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_scroll_near_bottom_loads_next_page() {
        let threads = (0..6).map(|i| thread(&format!("t{i}"), false)).collect();
        let (mut view, _) = setup(threads, 3);

        assert!(view.load_more().unwrap());
        assert_eq!(ids(&view), vec!["t0", "t1", "t2"]);

        // Far from the bottom of three 96px rows
        assert!(!view.on_scroll(0.0, 50.0).unwrap());
        assert!(view.on_scroll(100.0, 200.0).unwrap());
        assert_eq!(view.threads().len(), 6);
        assert!(view.list().is_reaching_end());
        assert!(!view.on_scroll(400.0, 200.0).unwrap());
    }

    #[test]
    fn test_click_unread_marks_read_and_schedules_refetch() {
        let (mut view, driver) = setup(vec![thread("t1", true)], 20);
        view.load_more().unwrap();
        driver.clear_calls();

        let start = Instant::now();
        let notices = view.click("t1", start).unwrap();
        assert!(notices.is_empty());
        assert_eq!(view.opened(), Some("t1"));
        assert!(!view.threads()[0].unread);
        assert_eq!(driver.calls(), vec![DriverCall::MarkAsRead(vec![ThreadId::new("t1")])]);

        view.tick(start + Duration::from_millis(100)).unwrap();
        assert_eq!(driver.calls().len(), 1);
        view.tick(start + Duration::from_millis(Settings::default().revalidate_debounce_ms)).unwrap();
        assert!(matches!(driver.calls()[1], DriverCall::List { .. }));
    }

    #[test]
    fn test_bulk_mark_unread_clears_bulk() {
        let (mut view, driver) = setup(vec![thread("a", false), thread("b", false)], 20);
        view.load_more().unwrap();
        let now = Instant::now();

        view.handle(SelectionEvent::KeyDown(Chord::key(Key::Meta)), now).unwrap();
        view.click("a", now).unwrap();
        view.click("b", now).unwrap();
        assert_eq!(view.selection().bulk().len(), 2);

        let notices = view
            .handle(SelectionEvent::KeyDown(Chord::parse("Meta+Shift+u").unwrap()), now)
            .unwrap();
        assert_eq!(notices, vec![Notice::MarkedAsUnread]);
        assert!(view.selection().bulk().is_empty());
        assert!(driver.thread("a").unwrap().unread);
    }

    #[test]
    fn test_bulk_mark_failure_keeps_bulk() {
        let (mut view, driver) = setup(vec![thread("a", true)], 20);
        view.load_more().unwrap();
        let now = Instant::now();
        view.handle(SelectionEvent::SelectAll, now).unwrap();

        driver.fail_with("backend unavailable");
        let notices = view
            .handle(SelectionEvent::KeyDown(Chord::parse("Control+Shift+i").unwrap()), now)
            .unwrap();
        assert_eq!(notices, vec![Notice::FailedToMarkAsRead]);
        assert_eq!(view.selection().bulk(), ["a".to_string()]);
    }

    #[test]
    fn test_archive_hides_then_refetches() {
        let (mut view, driver) = setup(vec![thread("a", false), thread("b", false)], 20);
        view.load_more().unwrap();

        let result = view.archive(&["a".to_string()]).unwrap();
        assert!(result.success);
        assert_eq!(ids(&view), vec!["b"]);
        assert!(view.queue().is_empty());
        assert!(!driver.thread("a").unwrap().tags.iter().any(|t| t == LabelId::INBOX));
    }

    #[test]
    fn test_empty_states() {
        let (mut view, _) = setup(vec![], 20);
        view.load_more().unwrap();
        assert_eq!(view.empty_state(), Some(EmptyState::Folder("inbox".to_string())));

        view.navigate("inbox", "nothing matches");
        view.load_more().unwrap();
        assert_eq!(view.empty_state(), Some(EmptyState::Search));
    }

    #[test]
    fn test_navigate_clears_selection() {
        let (mut view, _) = setup(vec![thread("a", false)], 20);
        view.load_more().unwrap();
        view.handle(SelectionEvent::SelectAll, Instant::now()).unwrap();
        assert_eq!(view.selection().bulk().len(), 1);

        view.navigate("sent", "");
        assert!(view.selection().bulk().is_empty());
        assert_eq!(view.list().size(), 0);
    }

    #[test]
    fn test_hover_prefetches_detail_once() {
        let (mut view, driver) = setup(vec![thread("a", false)], 20);
        view.load_more().unwrap();
        driver.clear_calls();

        let delay = Duration::from_millis(Settings::default().hover_prefetch_delay_ms);
        let start = Instant::now();
        view.hover_start("a", start);
        view.tick(start + delay).unwrap();
        view.tick(start + delay * 2).unwrap();
        assert_eq!(driver.calls(), vec![DriverCall::Get(ThreadId::new("a"))]);

        assert!(view.detail("a").unwrap().is_some());
        assert_eq!(driver.calls().len(), 1);
    }

    #[test]
    fn test_mark_read_refetches_prefetched_detail() {
        let (mut view, driver) = setup(vec![thread("t1", true)], 20);
        view.load_more().unwrap();

        let delay = Duration::from_millis(Settings::default().hover_prefetch_delay_ms);
        let start = Instant::now();
        view.hover_start("t1", start);
        view.tick(start + delay).unwrap();
        assert!(view.detail("t1").unwrap().unwrap().has_unread);

        view.click("t1", start + delay).unwrap();
        driver.clear_calls();
        let detail = view.detail("t1").unwrap().unwrap();
        assert!(!detail.has_unread);
        assert_eq!(driver.calls(), vec![DriverCall::Get(ThreadId::new("t1"))]);
    }

    #[test]
    fn test_refresh_runs_pending_revalidation_once() {
        let (mut view, driver) = setup(vec![thread("t1", true), thread("t2", false)], 20);
        view.load_more().unwrap();
        let start = Instant::now();
        view.click("t1", start).unwrap();
        view.detail("t2").unwrap();

        driver.clear_calls();
        view.refresh().unwrap();
        view.tick(start + Duration::from_secs(60)).unwrap();
        let lists = driver
            .calls()
            .into_iter()
            .filter(|c| matches!(c, DriverCall::List { .. }))
            .count();
        assert_eq!(lists, 1);
        assert!(view.details.is_empty());
    }

    #[test]
    fn test_fatal_error_drops_cached_details() {
        let (mut view, driver) = setup(vec![thread("a", false), thread("b", true)], 20);
        view.load_more().unwrap();
        view.detail("a").unwrap();
        assert_eq!(view.details.len(), 1);

        driver.fail_with("invalid_grant");
        let err = view.click("b", Instant::now()).unwrap_err();
        assert!(err.is_fatal());
        assert!(view.details.is_empty());
        assert!(view.detail("a").unwrap().is_none());
    }

    #[test]
    fn test_shrinking_refresh_keeps_rows_visible() {
        let threads = (0..10).map(|i| thread(&format!("t{i}"), false)).collect();
        let (mut view, driver) = setup(threads, 5);
        view.load_more().unwrap();
        view.load_more().unwrap();
        view.on_scroll(700.0, 200.0).unwrap();
        assert!(!view.visible_rows().is_empty());

        let removed: Vec<String> = (2..10).map(|i| format!("t{i}")).collect();
        driver.clear_calls();
        view.archive(&removed).unwrap();
        assert_eq!(ids(&view), vec!["t0", "t1"]);
        assert_eq!(view.virtualizer().scroll_offset(), 0.0);
        assert_eq!(view.visible_rows().len(), 2);
    }
}
