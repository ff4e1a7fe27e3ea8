//! Thread models: the list unit shown in a mail view and the paged list response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EmailAddress, Label, ParsedMessage};

/// Unique identifier for a thread (provider thread ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Summary of a thread as returned by the list endpoint
///
/// Immutable once fetched, except for the unread and starred flags which
/// actions update optimistically until the next fetch reconciles them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: ThreadId,
    /// Provider thread ID when `id` refers to a message inside the thread
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    pub sender: EmailAddress,
    pub subject: String,
    pub received_on: DateTime<Utc>,
    pub unread: bool,
    #[serde(default)]
    pub total_replies: usize,
    /// Label names attached to the thread
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ThreadSummary {
    pub fn new(id: impl Into<ThreadId>, sender: EmailAddress, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
            sender,
            subject: subject.into(),
            received_on: Utc::now(),
            unread: false,
            total_replies: 1,
            tags: Vec::new(),
        }
    }

    pub fn with_unread(mut self, unread: bool) -> Self {
        self.unread = unread;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_received_on(mut self, received_on: DateTime<Utc>) -> Self {
        self.received_on = received_on;
        self
    }

    pub fn with_total_replies(mut self, total_replies: usize) -> Self {
        self.total_replies = total_replies;
        self
    }

    /// The ID to open when this row is selected
    pub fn open_id(&self) -> &ThreadId {
        self.thread_id.as_ref().unwrap_or(&self.id)
    }

    /// Starred is derived from the label set
    pub fn is_starred(&self) -> bool {
        self.tags.iter().any(|t| is_starred_label(t))
    }

    /// Optimistically flip the starred flag
    pub fn set_starred(&mut self, starred: bool) {
        self.tags.retain(|t| !is_starred_label(t));
        if starred {
            self.tags.push(super::LabelId::STARRED.to_string());
        }
    }

    pub fn set_unread(&mut self, unread: bool) {
        self.unread = unread;
    }
}

/// Whether a label name marks a message as starred (case-insensitive prefix)
pub fn is_starred_label(name: &str) -> bool {
    name.to_lowercase().starts_with("starred")
}

/// One page of a thread listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPage {
    #[serde(default)]
    pub threads: Vec<ThreadSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub result_size_estimate: u32,
}

impl ThreadPage {
    /// The continuation cursor, treating an empty token as absent
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor().is_none()
    }
}

/// Full thread as returned by the single-thread endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDetail {
    /// Messages ordered oldest first
    pub messages: Vec<ParsedMessage>,
    pub latest: Option<ParsedMessage>,
    pub has_unread: bool,
    pub total_replies: usize,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl ThreadDetail {
    /// Assemble a detail view from the thread's messages
    pub fn from_messages(messages: Vec<ParsedMessage>) -> Self {
        let latest = messages.last().cloned();
        let has_unread = messages.iter().any(|m| m.unread);
        let total_replies = messages.len();

        let mut labels: Vec<Label> = Vec::new();
        for tag in messages.iter().flat_map(|m| m.tags.iter()) {
            if !labels.iter().any(|l| l.id == tag.id) {
                labels.push(tag.clone());
            }
        }

        Self {
            messages,
            latest,
            has_unread,
            total_replies,
            labels,
        }
    }

    /// True when any message carries a starred label
    pub fn is_starred(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.tags.iter().any(|t| is_starred_label(&t.name)))
    }

    /// A thread is a group thread when its latest message has more than one recipient
    pub fn is_group_thread(&self) -> bool {
        match &self.latest {
            Some(latest) => latest.to.len() + latest.cc.len() + latest.bcc.len() > 1,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;

    fn message(id: &str, tags: &[&str], to: usize) -> ParsedMessage {
        let mut msg = ParsedMessage::new(MessageId::new(id), ThreadId::new("t1"));
        msg.tags = tags.iter().map(|t| Label::new(*t, *t)).collect();
        msg.to = (0..to)
            .map(|i| EmailAddress::new(format!("r{}@example.com", i)))
            .collect();
        msg
    }

    #[test]
    fn test_starred_is_case_insensitive_prefix() {
        assert!(is_starred_label("STARRED"));
        assert!(is_starred_label("starred"));
        assert!(is_starred_label("Starred_yellow"));
        assert!(!is_starred_label("unstarred"));
    }

    #[test]
    fn test_set_starred_updates_tags() {
        let mut summary = ThreadSummary::new("t1", EmailAddress::new("a@example.com"), "Hi")
            .with_tags(vec!["INBOX".to_string()]);
        assert!(!summary.is_starred());

        summary.set_starred(true);
        assert!(summary.is_starred());
        assert_eq!(summary.tags, vec!["INBOX", "STARRED"]);

        summary.set_starred(false);
        assert!(!summary.is_starred());
        assert_eq!(summary.tags, vec!["INBOX"]);
    }

    #[test]
    fn test_empty_page_token_is_terminal() {
        let page = ThreadPage {
            next_page_token: Some(String::new()),
            ..Default::default()
        };
        assert!(page.is_last());

        let page = ThreadPage {
            next_page_token: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(page.next_cursor(), Some("abc"));
    }

    #[test]
    fn test_page_deserializes_list_response() {
        let json = r#"{
            "threads": [{
                "id": "t1",
                "sender": {"name": "Ada", "email": "ada@example.com"},
                "subject": "Engines",
                "receivedOn": "2024-03-01T10:00:00Z",
                "unread": true,
                "totalReplies": 3,
                "tags": ["INBOX", "UNREAD"]
            }],
            "nextPageToken": "p2",
            "resultSizeEstimate": 42
        }"#;
        let page: ThreadPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.threads.len(), 1);
        assert_eq!(page.threads[0].total_replies, 3);
        assert_eq!(page.next_cursor(), Some("p2"));
        assert_eq!(page.result_size_estimate, 42);
    }

    #[test]
    fn test_detail_from_messages() {
        let mut first = message("m1", &["INBOX"], 1);
        first.unread = true;
        let second = message("m2", &["INBOX", "STARRED"], 2);

        let detail = ThreadDetail::from_messages(vec![first, second]);
        assert!(detail.has_unread);
        assert!(detail.is_starred());
        assert!(detail.is_group_thread());
        assert_eq!(detail.total_replies, 2);
        assert_eq!(detail.labels.len(), 2);
        assert_eq!(detail.latest.unwrap().id.as_str(), "m2");
    }

    #[test]
    fn test_single_recipient_is_not_group() {
        let detail = ThreadDetail::from_messages(vec![message("m1", &[], 1)]);
        assert!(!detail.is_group_thread());
    }
}
