//! Page fetchers
//!
//! [`HttpPageFetcher`] reads the list and thread endpoints of a running web
//! API. [`ActionPageFetcher`] calls the action layer in-process.

use log::debug;
use serde::de::DeserializeOwned;

use super::key::ListKey;
use crate::actions::MailActions;
use crate::error::{Error, ErrorKind, Result};
use crate::models::{DraftPage, ThreadDetail, ThreadPage};

/// Source of pages for an [`InfiniteList`](super::InfiniteList)
pub trait PageFetcher<P> {
    /// Fetch the page of `key` starting at `page_token` (`None` = first page)
    fn fetch_page(&self, key: &ListKey, page_token: Option<&str>) -> Result<P>;
}

/// Fetches pages from the `/api/driver` endpoints over HTTP
pub struct HttpPageFetcher {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpPageFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn list_url(&self, key: &ListKey, page_token: Option<&str>) -> String {
        format!("{}/api/driver?{}", self.base_url, key.query_string(page_token))
    }

    pub fn thread_url(&self, id: &str) -> String {
        format!("{}/api/driver/{}", self.base_url, urlencoding::encode(id))
    }

    /// Full thread from the single-thread endpoint
    pub fn fetch_thread(&self, id: &str) -> Result<ThreadDetail> {
        self.get_json(&self.thread_url(id))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let mut response = self
            .agent
            .get(url)
            .header("Accept", "application/json")
            .call()
            .map_err(|e| Error::with_source(ErrorKind::Network, e.into()))?;

        let status = response.status().as_u16();
        check_status(status)?;

        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| Error::with_source(ErrorKind::Network, e.into()))
    }
}

/// Classify an endpoint status
fn check_status(status: u16) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(Error::new(
            ErrorKind::Auth,
            format!("request rejected with status {}", status),
        )),
        _ => Err(Error::new(
            ErrorKind::Network,
            format!("request failed with status {}", status),
        )),
    }
}

impl PageFetcher<ThreadPage> for HttpPageFetcher {
    fn fetch_page(&self, key: &ListKey, page_token: Option<&str>) -> Result<ThreadPage> {
        self.get_json(&self.list_url(key, page_token))
    }
}

/// Fetches pages by calling [`MailActions`] directly
pub struct ActionPageFetcher {
    actions: MailActions,
}

impl ActionPageFetcher {
    pub fn new(actions: MailActions) -> Self {
        Self { actions }
    }
}

impl PageFetcher<ThreadPage> for ActionPageFetcher {
    fn fetch_page(&self, key: &ListKey, page_token: Option<&str>) -> Result<ThreadPage> {
        self.actions.get_mails(&key.to_request(page_token))
    }
}

impl PageFetcher<DraftPage> for ActionPageFetcher {
    fn fetch_page(&self, key: &ListKey, page_token: Option<&str>) -> Result<DraftPage> {
        self.actions.get_drafts(&key.query, key.max, page_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ListKey {
        ListKey {
            user_id: "u1".to_string(),
            connection_id: "c1".to_string(),
            folder: "inbox".to_string(),
            query: String::new(),
            max: 20,
            label_ids: None,
        }
    }

    #[test]
    fn test_urls() {
        let fetcher = HttpPageFetcher::new("http://localhost:3000/");
        assert_eq!(
            fetcher.list_url(&key(), Some("p2")),
            "http://localhost:3000/api/driver?folder=inbox&pageToken=p2&q=&max=20"
        );
        assert_eq!(
            fetcher.thread_url("a/b"),
            "http://localhost:3000/api/driver/a%2Fb"
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(check_status(200).is_ok());
        assert_eq!(check_status(401).unwrap_err().kind(), ErrorKind::Auth);
        assert_eq!(check_status(403).unwrap_err().kind(), ErrorKind::Auth);
        assert_eq!(check_status(429).unwrap_err().kind(), ErrorKind::Network);
    }
}
