//! Cache keys for list fetches

use crate::actions::ListRequest;
use crate::models::Session;

/// Folder name used for the drafts list key
pub const DRAFTS_FOLDER: &str = "draft";

/// Identity of one paged list
///
/// Two fetches with equal keys share a cache entry; a key change means the
/// view navigated and prior pages are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub user_id: String,
    pub connection_id: String,
    pub folder: String,
    pub query: String,
    pub max: usize,
    pub label_ids: Option<Vec<String>>,
}

impl ListKey {
    /// Endpoint request for one page of this list
    pub fn to_request(&self, page_token: Option<&str>) -> ListRequest {
        ListRequest {
            folder: self.folder.clone(),
            page_token: page_token.unwrap_or_default().to_string(),
            query: self.query.clone(),
            max: self.max,
            label_ids: self.label_ids.clone(),
        }
    }

    /// Query string for the list endpoint
    pub fn query_string(&self, page_token: Option<&str>) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("folder", &self.folder)
            .append_pair("pageToken", page_token.unwrap_or_default())
            .append_pair("q", &self.query)
            .append_pair("max", &self.max.to_string());
        if let Some(labels) = &self.label_ids {
            query.append_pair("labelIds", &labels.join(","));
        }
        query.finish()
    }
}

/// Key for a list, or `None` while there is no signed-in connection
pub fn list_key(
    session: Option<&Session>,
    folder: &str,
    query: &str,
    max: usize,
    label_ids: Option<Vec<String>>,
) -> Option<ListKey> {
    let session = session?;
    let connection_id = session.active_connection_id()?;
    Some(ListKey {
        user_id: session.user_id.clone(),
        connection_id: connection_id.to_string(),
        folder: folder.to_string(),
        query: query.to_string(),
        max,
        label_ids,
    })
}
