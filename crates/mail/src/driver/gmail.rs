//! Gmail driver
//!
//! Talks to the Gmail REST API with synchronous HTTP (ureq). Thread listings
//! fetch per-thread metadata in parallel to build list rows. A 401 triggers
//! one token refresh and a retry; nothing else is retried.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use std::sync::RwLock;

use super::api::{
    ApiErrorResponse, GmailDraft, GmailThread, ListDraftsResponse, ListThreadsResponse,
    ModifyThreadRequest,
};
use super::auth::TokenRefresher;
use super::normalize::{normalize_thread, summarize_draft, summarize_thread};
use super::{DriverAuth, LabelDelta, ListParams, MailDriver};
use crate::config::GmailCredentials;
use crate::error::{Error, ErrorKind, Result};
use crate::models::{DraftPage, LabelId, ThreadDetail, ThreadId, ThreadPage};

/// HTTP method of an API call
#[derive(Debug, Clone, Copy)]
enum Method<'a> {
    Get,
    Delete,
    PostJson(&'a serde_json::Value),
}

/// Gmail implementation of [`MailDriver`]
pub struct GmailDriver {
    agent: ureq::Agent,
    access_token: RwLock<String>,
    refresh_token: String,
    email: String,
    refresher: Option<TokenRefresher>,
}

impl GmailDriver {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1/users/me";

    /// Metadata headers needed for list rows
    const METADATA_HEADERS: &'static str =
        "metadataHeaders=From&metadataHeaders=To&metadataHeaders=Subject&metadataHeaders=Date";

    pub fn new(auth: DriverAuth, credentials: Option<GmailCredentials>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            access_token: RwLock::new(auth.access_token),
            refresh_token: auth.refresh_token,
            email: auth.email,
            refresher: credentials.map(TokenRefresher::new),
        }
    }

    /// Mailbox address this driver acts for
    pub fn email(&self) -> &str {
        &self.email
    }

    fn token(&self) -> String {
        self.access_token
            .read()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    /// Perform a call, refreshing the access token once on 401
    fn call(&self, method: Method<'_>, url: &str) -> Result<String> {
        let (status, body) = self.send(method, url)?;
        if status != 401 {
            return check_status(status, body);
        }

        let Some(refresher) = &self.refresher else {
            warn!("Access token rejected and no OAuth client configured for refresh");
            return Err(Error::new(ErrorKind::Auth, "Access token expired"));
        };

        let token = refresher.refresh(&self.agent, &self.refresh_token)?;
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }

        let (status, body) = self.send(method, url)?;
        check_status(status, body)
    }

    fn send(&self, method: Method<'_>, url: &str) -> Result<(u16, String)> {
        let auth = format!("Bearer {}", self.token());
        let result = match method {
            Method::Get => self.agent.get(url).header("Authorization", &auth).call(),
            Method::Delete => self.agent.delete(url).header("Authorization", &auth).call(),
            Method::PostJson(body) => self
                .agent
                .post(url)
                .header("Authorization", &auth)
                .send_json(body),
        };

        let mut response = result.map_err(|e| Error::with_source(ErrorKind::Network, e.into()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::with_source(ErrorKind::Network, e.into()))?;
        Ok((status, body))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.call(Method::Get, url)?;
        serde_json::from_str(&body).map_err(|e| Error::with_source(ErrorKind::Provider, e.into()))
    }

    fn thread_metadata(&self, id: &str) -> Result<GmailThread> {
        let url = format!(
            "{}/threads/{}?format=metadata&{}",
            Self::BASE_URL,
            urlencoding::encode(id),
            Self::METADATA_HEADERS
        );
        self.get_json(&url)
    }

    fn modify_thread(&self, id: &ThreadId, delta: &LabelDelta) -> Result<()> {
        let request = ModifyThreadRequest {
            add_label_ids: &delta.add_labels,
            remove_label_ids: &delta.remove_labels,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| Error::with_source(ErrorKind::Provider, e.into()))?;
        let url = format!(
            "{}/threads/{}/modify",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );
        self.call(Method::PostJson(&body), &url)?;
        Ok(())
    }
}

/// Turn a non-2xx response into a provider error carrying the API message
fn check_status(status: u16, body: String) -> Result<String> {
    if (200..300).contains(&status) {
        return Ok(body);
    }

    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Gmail API returned status {}", status));

    match status {
        401 | 403 => Err(Error::new(ErrorKind::Auth, message)),
        _ => Err(Error::provider(message)),
    }
}

/// Map a folder and search text to Gmail label filters and query
fn normalize_search(folder: &str, query: &str) -> (Vec<String>, String) {
    let query = query.trim();
    let scoped = |scope: &str| {
        if query.is_empty() {
            scope.to_string()
        } else {
            format!("{} {}", scope, query)
        }
    };

    match folder.to_lowercase().as_str() {
        "" | "inbox" => (vec![LabelId::INBOX.to_string()], query.to_string()),
        "bin" | "trash" => (Vec::new(), scoped("in:trash")),
        "archive" => (Vec::new(), scoped("-in:inbox -in:trash -in:spam")),
        other => (Vec::new(), scoped(&format!("in:{}", other))),
    }
}

fn list_url(params: &ListParams) -> String {
    let (mut label_ids, query) = normalize_search(&params.folder, &params.query);
    if let Some(extra) = &params.label_ids {
        label_ids.extend(extra.iter().cloned());
    }

    let mut url = format!("{}/threads?maxResults={}", GmailDriver::BASE_URL, params.max.min(500));
    if !query.is_empty() {
        url.push_str(&format!("&q={}", urlencoding::encode(&query)));
    }
    for label in &label_ids {
        url.push_str(&format!("&labelIds={}", urlencoding::encode(label)));
    }
    if let Some(token) = &params.page_token {
        url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
    }
    url
}

impl MailDriver for GmailDriver {
    fn list(&self, params: &ListParams) -> Result<ThreadPage> {
        let url = list_url(params);
        debug!("Listing threads: folder={} q={:?}", params.folder, params.query);

        let list: ListThreadsResponse = self.get_json(&url)?;
        let refs = list.threads.unwrap_or_default();

        let threads = refs
            .par_iter()
            .map(|r| self.thread_metadata(&r.id).map(|t| summarize_thread(&t)))
            .collect::<Result<Vec<_>>>()?;

        Ok(ThreadPage {
            threads,
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
            result_size_estimate: list.result_size_estimate.unwrap_or(0),
        })
    }

    fn list_drafts(&self, query: &str, max: usize, page_token: Option<&str>) -> Result<DraftPage> {
        let mut url = format!("{}/drafts?maxResults={}", Self::BASE_URL, max.min(500));
        if !query.trim().is_empty() {
            url.push_str(&format!("&q={}", urlencoding::encode(query.trim())));
        }
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let list: ListDraftsResponse = self.get_json(&url)?;
        let drafts = list
            .drafts
            .unwrap_or_default()
            .par_iter()
            .map(|d| {
                let url = format!(
                    "{}/drafts/{}?format=metadata",
                    Self::BASE_URL,
                    urlencoding::encode(&d.id)
                );
                self.get_json::<GmailDraft>(&url).map(|d| summarize_draft(&d))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DraftPage {
            drafts,
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    fn get(&self, id: &ThreadId) -> Result<ThreadDetail> {
        let url = format!(
            "{}/threads/{}?format=full",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );
        let thread: GmailThread = self.get_json(&url)?;
        Ok(normalize_thread(&thread))
    }

    fn mark_as_read(&self, ids: &[ThreadId]) -> Result<()> {
        self.modify_labels(ids, &LabelDelta::remove(LabelId::UNREAD))
    }

    fn mark_as_unread(&self, ids: &[ThreadId]) -> Result<()> {
        self.modify_labels(ids, &LabelDelta::add(LabelId::UNREAD))
    }

    fn modify_labels(&self, ids: &[ThreadId], delta: &LabelDelta) -> Result<()> {
        for id in ids {
            self.modify_thread(id, delta)?;
        }
        info!(
            "Modified labels on {} threads (+{:?} -{:?})",
            ids.len(),
            delta.add_labels,
            delta.remove_labels
        );
        Ok(())
    }

    fn delete(&self, id: &ThreadId) -> Result<()> {
        let url = format!(
            "{}/threads/{}",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );
        self.call(Method::Delete, &url)?;
        info!("Deleted thread {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_search_inbox() {
        let (labels, q) = normalize_search("inbox", "  from:ada ");
        assert_eq!(labels, vec!["INBOX"]);
        assert_eq!(q, "from:ada");
    }

    #[test]
    fn test_normalize_search_other_folders() {
        assert_eq!(normalize_search("bin", ""), (vec![], "in:trash".to_string()));
        assert_eq!(
            normalize_search("sent", "report"),
            (vec![], "in:sent report".to_string())
        );
        assert_eq!(
            normalize_search("archive", ""),
            (vec![], "-in:inbox -in:trash -in:spam".to_string())
        );
    }

    #[test]
    fn test_list_url() {
        let params = ListParams::new("inbox", 20)
            .with_query("is:unread")
            .with_page_token(Some("next page".to_string()));
        let url = list_url(&params);
        assert!(url.ends_with(
            "/threads?maxResults=20&q=is%3Aunread&labelIds=INBOX&pageToken=next%20page"
        ));
    }

    #[test]
    fn test_list_url_caps_page_size() {
        let url = list_url(&ListParams::new("sent", 1000));
        assert!(url.contains("maxResults=500"));
        assert!(url.contains("q=in%3Asent"));
    }

    #[test]
    fn test_check_status() {
        assert_eq!(check_status(204, String::new()).unwrap(), "");

        let err = check_status(
            404,
            r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#
                .to_string(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(err.message(), "Requested entity was not found.");

        let err = check_status(403, "forbidden".to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(err.message().contains("403"));
    }
}
