//! Mail actions
//!
//! Reads and mutations invoked from the list views. Label-changing actions
//! are declarative [`LabelDelta`]s applied to the whole batch in one driver
//! call; a failing batch fails the action.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::context::ActionContext;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::driver::{LabelDelta, ListParams, MailDriver};
use crate::error::Result;
use crate::models::{DraftPage, LabelId, ThreadDetail, ThreadId, ThreadPage};

/// Uniform `{success, error?}` envelope returned by mutating actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Parameters of the thread list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub folder: String,
    pub page_token: String,
    pub query: String,
    pub max: usize,
    pub label_ids: Option<Vec<String>>,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            folder: "inbox".to_string(),
            page_token: String::new(),
            query: String::new(),
            max: DEFAULT_PAGE_SIZE,
            label_ids: None,
        }
    }
}

impl ListRequest {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    /// Parse `folder`, `pageToken`, `q`, `max` and `labelIds` from a query
    /// string. Missing, empty or unparseable values fall back to defaults.
    pub fn from_query(query: &str) -> Self {
        let mut request = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "folder" => request.folder = value.into_owned(),
                "pageToken" => request.page_token = value.into_owned(),
                "q" => request.query = value.into_owned(),
                "max" => {
                    if let Ok(max) = value.parse::<usize>()
                        && max > 0
                    {
                        request.max = max;
                    }
                }
                "labelIds" => {
                    request.label_ids = Some(
                        value
                            .split(',')
                            .filter(|l| !l.is_empty())
                            .map(str::to_string)
                            .collect(),
                    )
                }
                other => debug!("Ignoring list parameter {}", other),
            }
        }
        request
    }

    /// Driver parameters for this request
    pub fn to_params(&self) -> ListParams {
        let mut params = ListParams::new(self.folder.clone(), self.max)
            .with_query(self.query.clone())
            .with_page_token(Some(self.page_token.clone()));
        params.label_ids = self.label_ids.clone();
        params
    }
}

fn thread_ids(ids: &[String]) -> Vec<ThreadId> {
    ids.iter().map(ThreadId::new).collect()
}

/// The action set exposed to views
#[derive(Clone)]
pub struct MailActions {
    context: ActionContext,
}

impl MailActions {
    pub fn new(context: ActionContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    /// Resolve the driver and run `op`; log failures and tear the connection
    /// down when the provider reports a fatal error.
    fn run<T>(&self, action: &str, op: impl FnOnce(&dyn MailDriver) -> Result<T>) -> Result<T> {
        let result = self
            .context
            .get_active_driver()
            .and_then(|driver| op(driver.as_ref()));

        if let Err(e) = &result {
            error!("Error {}: {}", action, e);
            if e.is_fatal()
                && let Err(teardown) = self.context.delete_active_connection()
            {
                warn!("Failed to tear down connection: {}", teardown);
            }
        }
        result
    }

    fn apply_delta(&self, action: &str, ids: &[String], delta: LabelDelta) -> Result<ActionResult> {
        self.run(action, |driver| {
            driver.modify_labels(&thread_ids(ids), &delta)?;
            Ok(ActionResult::ok())
        })
    }

    /// Full thread for the detail view
    pub fn get_mail(&self, id: &str) -> Result<ThreadDetail> {
        self.run("getting mail", |driver| driver.get(&ThreadId::new(id)))
    }

    /// One page of the thread list
    pub fn get_mails(&self, request: &ListRequest) -> Result<ThreadPage> {
        self.run("getting threads", |driver| driver.list(&request.to_params()))
    }

    /// One page of the drafts list
    pub fn get_drafts(&self, query: &str, max: usize, page_token: Option<&str>) -> Result<DraftPage> {
        self.run("getting drafts", |driver| {
            driver.list_drafts(query, max, page_token)
        })
    }

    pub fn mark_as_read(&self, ids: &[String]) -> Result<ActionResult> {
        self.run("marking message as read", |driver| {
            driver.mark_as_read(&thread_ids(ids))?;
            Ok(ActionResult::ok())
        })
    }

    pub fn mark_as_unread(&self, ids: &[String]) -> Result<ActionResult> {
        self.run("marking message as unread", |driver| {
            driver.mark_as_unread(&thread_ids(ids))?;
            Ok(ActionResult::ok())
        })
    }

    pub fn mark_as_important(&self, ids: &[String]) -> Result<ActionResult> {
        self.apply_delta(
            "marking message as important",
            ids,
            LabelDelta::add(LabelId::IMPORTANT),
        )
    }

    /// Apply a label delta after normalizing the identifiers
    ///
    /// Fails softly with "No label changes specified" when no identifier
    /// survives normalization. An empty delta is still sent.
    pub fn modify_labels(&self, ids: &[String], delta: &LabelDelta) -> Result<ActionResult> {
        debug!(
            "modify_labels for {:?}: +{:?} -{:?}",
            ids, delta.add_labels, delta.remove_labels
        );
        self.run("updating thread labels", |driver| {
            let normalized = driver.normalize_ids(ids);
            if normalized.thread_ids.is_empty() {
                info!("No label changes specified");
                return Ok(ActionResult::failure("No label changes specified"));
            }

            driver.modify_labels(&normalized.thread_ids, delta)?;
            info!("Updated labels on {} threads", normalized.thread_ids.len());
            Ok(ActionResult::ok())
        })
    }

    /// Star the batch unless any thread in it is already starred, in which
    /// case unstar all of them.
    ///
    /// Threads that fail to load are skipped when deciding. The read and the
    /// write are not atomic with respect to other clients.
    pub fn toggle_star(&self, ids: &[String]) -> Result<ActionResult> {
        self.run("toggling star", |driver| {
            let normalized = driver.normalize_ids(ids);
            if normalized.thread_ids.is_empty() {
                return Ok(ActionResult::failure("No thread IDs provided"));
            }

            let mut processed = 0;
            let mut any_starred = false;
            for id in &normalized.thread_ids {
                let thread = match driver.get(id) {
                    Ok(thread) if !thread.messages.is_empty() => thread,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!("Skipping thread {} while toggling star: {}", id, e);
                        continue;
                    }
                };
                processed += 1;
                if thread.is_starred() {
                    any_starred = true;
                    break;
                }
            }

            let should_star = processed > 0 && !any_starred;
            let delta = if should_star {
                LabelDelta::add(LabelId::STARRED)
            } else {
                LabelDelta::remove(LabelId::STARRED)
            };
            driver.modify_labels(&normalized.thread_ids, &delta)?;
            Ok(ActionResult::ok())
        })
    }

    pub fn delete_thread(&self, id: &str) -> Result<ActionResult> {
        info!("Deleting thread {}", id);
        self.run("deleting thread", |driver| {
            driver.delete(&ThreadId::new(id))?;
            Ok(ActionResult::ok())
        })
    }

    /// Move threads to the trash
    pub fn bulk_delete_thread(&self, ids: &[String]) -> Result<ActionResult> {
        self.apply_delta("moving threads to trash", ids, LabelDelta::add(LabelId::TRASH))
    }

    /// Remove threads from the inbox
    pub fn bulk_archive(&self, ids: &[String]) -> Result<ActionResult> {
        self.apply_delta("archiving threads", ids, LabelDelta::remove(LabelId::INBOX))
    }

    pub fn bulk_star(&self, ids: &[String]) -> Result<ActionResult> {
        self.apply_delta("starring threads", ids, LabelDelta::add(LabelId::STARRED))
    }

    pub fn bulk_unstar(&self, ids: &[String]) -> Result<ActionResult> {
        self.apply_delta("unstarring threads", ids, LabelDelta::remove(LabelId::STARRED))
    }

    pub fn mute_thread(&self, ids: &[String]) -> Result<ActionResult> {
        self.apply_delta("muting threads", ids, LabelDelta::add(LabelId::MUTE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{INBOX_PATH, RevalidationLog, SessionProvider, StaticSession};
    use crate::driver::{DriverCall, FixedDriverFactory, InMemoryDriver};
    use crate::error::ErrorKind;
    use crate::models::{Connection, EmailAddress, ThreadSummary};
    use crate::storage::{ConnectionStore, InMemoryConnectionStore};
    use std::sync::Arc;

    struct Harness {
        actions: MailActions,
        driver: Arc<InMemoryDriver>,
        store: Arc<InMemoryConnectionStore>,
        sessions: Arc<StaticSession>,
        revalidations: Arc<RevalidationLog>,
    }

    fn thread(id: &str, tags: &[&str]) -> ThreadSummary {
        ThreadSummary::new(id, EmailAddress::new("ada@example.com"), format!("About {id}"))
            .with_tags(tags.iter().map(|t| t.to_string()).collect())
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn harness_with(connection: Connection, threads: Vec<ThreadSummary>) -> Harness {
        let driver = Arc::new(InMemoryDriver::with_threads(threads));
        let store = Arc::new(InMemoryConnectionStore::new());
        store.upsert_connection(connection).unwrap();
        let sessions = Arc::new(StaticSession::signed_in("u1", "c1"));
        let revalidations = Arc::new(RevalidationLog::new());

        let context = ActionContext::new(
            sessions.clone(),
            store.clone(),
            Arc::new(FixedDriverFactory::new(driver.clone())),
            revalidations.clone(),
        );
        Harness {
            actions: MailActions::new(context),
            driver,
            store,
            sessions,
            revalidations,
        }
    }

    fn harness(threads: Vec<ThreadSummary>) -> Harness {
        harness_with(
            Connection::new("c1", "u1", "google", "me@example.com").with_tokens("a", "r"),
            threads,
        )
    }

    #[test]
    fn test_missing_session_is_invalid_session() {
        let h = harness(vec![]);
        h.sessions.sign_out().unwrap();
        let err = h.actions.mark_as_read(&ids(&["t1"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSession);
        assert_eq!(err.message(), "Invalid session");
        assert!(h.driver.calls().is_empty());
    }

    #[test]
    fn test_connection_without_tokens_is_invalid_connection() {
        let h = harness_with(
            Connection::new("c1", "u1", "google", "me@example.com"),
            vec![],
        );
        let err = h.actions.get_mail("t1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConnection);
    }

    #[test]
    fn test_mark_as_read() {
        let h = harness(vec![thread("t1", &["INBOX", "UNREAD"]).with_unread(true)]);
        assert_eq!(h.actions.mark_as_read(&ids(&["t1"])).unwrap(), ActionResult::ok());
        assert!(!h.driver.thread("t1").unwrap().unread);
    }

    #[test]
    fn test_modify_labels_empty_ids_is_soft_failure() {
        let h = harness(vec![]);
        let result = h
            .actions
            .modify_labels(&ids(&["thread:"]), &LabelDelta::default())
            .unwrap();
        assert_eq!(result, ActionResult::failure("No label changes specified"));
        assert!(h.driver.calls().is_empty());
    }

    #[test]
    fn test_modify_labels_with_empty_delta_proceeds() {
        let h = harness(vec![thread("t1", &["INBOX"])]);
        let result = h
            .actions
            .modify_labels(&ids(&["thread:t1"]), &LabelDelta::default())
            .unwrap();
        assert!(result.success);
        assert_eq!(
            h.driver.calls(),
            vec![DriverCall::ModifyLabels(
                vec![ThreadId::new("t1")],
                LabelDelta::default()
            )]
        );
    }

    #[test]
    fn test_toggle_star_flips_then_flips_back() {
        let h = harness(vec![thread("t1", &["INBOX"]), thread("t2", &["INBOX"])]);
        let batch = ids(&["t1", "t2"]);

        h.actions.toggle_star(&batch).unwrap();
        assert!(h.driver.thread("t1").unwrap().is_starred());
        assert!(h.driver.thread("t2").unwrap().is_starred());

        h.actions.toggle_star(&batch).unwrap();
        assert!(!h.driver.thread("t1").unwrap().is_starred());
        assert!(!h.driver.thread("t2").unwrap().is_starred());
    }

    #[test]
    fn test_toggle_star_any_starred_unstars_all() {
        let h = harness(vec![thread("t1", &["INBOX"]), thread("t2", &["Starred"])]);
        h.actions.toggle_star(&ids(&["t1", "t2"])).unwrap();
        assert!(!h.driver.thread("t2").unwrap().is_starred());
        assert!(!h.driver.thread("t1").unwrap().is_starred());
    }

    #[test]
    fn test_toggle_star_skips_failed_gets() {
        let h = harness(vec![thread("t1", &["INBOX"]), thread("t2", &["STARRED"])]);
        h.driver.fail_get("t2");
        h.actions.toggle_star(&ids(&["t1", "t2"])).unwrap();
        // t2's star was invisible, so the batch is treated as unstarred
        assert!(h.driver.thread("t1").unwrap().is_starred());
    }

    #[test]
    fn test_toggle_star_nothing_processed_unstars() {
        let h = harness(vec![]);
        h.actions.toggle_star(&ids(&["gone"])).unwrap();
        assert_eq!(
            h.driver.calls().last(),
            Some(&DriverCall::ModifyLabels(
                vec![ThreadId::new("gone")],
                LabelDelta::remove("STARRED")
            ))
        );
    }

    #[test]
    fn test_toggle_star_requires_ids() {
        let h = harness(vec![]);
        assert_eq!(
            h.actions.toggle_star(&[]).unwrap(),
            ActionResult::failure("No thread IDs provided")
        );
    }

    #[test]
    fn test_bulk_actions_send_label_deltas() {
        let h = harness(vec![thread("t1", &["INBOX"])]);
        let batch = ids(&["t1"]);
        h.actions.bulk_archive(&batch).unwrap();
        h.actions.mute_thread(&batch).unwrap();
        h.actions.mark_as_important(&batch).unwrap();
        h.actions.bulk_delete_thread(&batch).unwrap();

        let deltas: Vec<LabelDelta> = h
            .driver
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::ModifyLabels(_, delta) => Some(delta),
                _ => None,
            })
            .collect();
        assert_eq!(
            deltas,
            vec![
                LabelDelta::remove("INBOX"),
                LabelDelta::add("MUTE"),
                LabelDelta::add("IMPORTANT"),
                LabelDelta::add("TRASH"),
            ]
        );
        assert_eq!(h.driver.thread("t1").unwrap().tags, vec!["MUTE", "IMPORTANT", "TRASH"]);
    }

    #[test]
    fn test_fatal_error_tears_down_connection() {
        let h = harness(vec![thread("t1", &["INBOX"])]);
        h.driver.fail_with("invalid_grant");

        let err = h.actions.bulk_star(&ids(&["t1"])).unwrap_err();
        assert_eq!(err.message(), "invalid_grant");
        assert!(err.is_fatal());
        assert!(h.store.get_connection("u1", "c1").unwrap().is_none());
        assert!(h.sessions.current_session().is_none());
        assert_eq!(h.revalidations.paths(), vec![INBOX_PATH]);
    }

    #[test]
    fn test_provider_error_keeps_connection() {
        let h = harness(vec![thread("t1", &["INBOX"])]);
        h.driver.fail_with("backendError");

        let err = h.actions.delete_thread("t1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert!(h.store.get_connection("u1", "c1").unwrap().is_some());
        assert!(h.revalidations.paths().is_empty());
    }

    #[test]
    fn test_list_request_defaults() {
        let request = ListRequest::from_query("");
        assert_eq!(request, ListRequest::default());
        assert_eq!(request.folder, "inbox");
        assert_eq!(request.max, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_list_request_parses_query() {
        let request =
            ListRequest::from_query("?folder=sent&pageToken=abc&q=from%3Aada&max=50&labelIds=A,B");
        assert_eq!(request.folder, "sent");
        assert_eq!(request.page_token, "abc");
        assert_eq!(request.query, "from:ada");
        assert_eq!(request.max, 50);
        assert_eq!(request.label_ids, Some(ids(&["A", "B"])));

        let fallback = ListRequest::from_query("max=zero&folder=");
        assert_eq!(fallback.max, DEFAULT_PAGE_SIZE);
        assert_eq!(fallback.folder, "inbox");
    }

    #[test]
    fn test_get_mails_pages_through_driver() {
        let threads = (0..3).map(|i| thread(&format!("t{i}"), &["INBOX"])).collect();
        let h = harness(threads);
        let mut request = ListRequest::new("inbox");
        request.max = 2;

        let first = h.actions.get_mails(&request).unwrap();
        assert_eq!(first.threads.len(), 2);
        request.page_token = first.next_page_token.unwrap();
        let second = h.actions.get_mails(&request).unwrap();
        assert_eq!(second.threads.len(), 1);
        assert!(second.is_last());
    }
}
