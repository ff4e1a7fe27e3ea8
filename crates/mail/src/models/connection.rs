//! Provider connections and the caller session that points at one

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored link between a user and a mail provider account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub user_id: String,
    /// Provider identifier understood by the driver factory (e.g. "google")
    pub provider_id: String,
    pub email: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        provider_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            provider_id: provider_id.into(),
            email: email.into(),
            access_token: None,
            refresh_token: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_tokens(
        mut self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.access_token = Some(access_token.into());
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Both tokens are present and non-empty
    pub fn has_credentials(&self) -> bool {
        let present = |t: &Option<String>| t.as_deref().is_some_and(|t| !t.is_empty());
        present(&self.access_token) && present(&self.refresh_token)
    }
}

/// The authenticated caller, as resolved by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    /// Active provider connection, if the user has linked one
    pub connection_id: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, connection_id: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            connection_id,
        }
    }

    /// Connection ID when the user and connection are both set
    pub fn active_connection_id(&self) -> Option<&str> {
        if self.user_id.is_empty() {
            return None;
        }
        self.connection_id.as_deref().filter(|c| !c.is_empty())
    }
}
