//! Draft summaries for the drafts list

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EmailAddress;

/// A draft as shown in the drafts list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub sender: EmailAddress,
    #[serde(default)]
    pub subject: String,
    pub received_on: DateTime<Utc>,
    #[serde(default)]
    pub unread: bool,
}

/// One page of the drafts listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPage {
    #[serde(default)]
    pub drafts: Vec<Draft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl DraftPage {
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}
