//! Gmail REST API wire types

use serde::{Deserialize, Serialize};

/// Response from `users/me/threads`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListThreadsResponse {
    pub threads: Option<Vec<ThreadRef>>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u32>,
}

/// Thread reference returned by a listing
#[derive(Debug, Deserialize)]
pub struct ThreadRef {
    pub id: String,
}

/// Thread resource with its messages
#[derive(Debug, Deserialize)]
pub struct GmailThread {
    pub id: String,
    pub messages: Option<Vec<GmailMessage>>,
}

/// Response from `users/me/drafts`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDraftsResponse {
    pub drafts: Option<Vec<DraftRef>>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DraftRef {
    pub id: String,
}

/// Draft resource
#[derive(Debug, Deserialize)]
pub struct GmailDraft {
    pub id: String,
    pub message: Option<GmailMessage>,
}

/// Message resource
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    pub thread_id: String,
    pub label_ids: Option<Vec<String>>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub internal_date: String,
    pub payload: Option<MessagePayload>,
}

/// Message payload containing headers and body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessageBody>,
    pub parts: Option<Vec<MessagePart>>,
    pub mime_type: Option<String>,
}

/// Email header (name-value pair)
#[derive(Debug, Deserialize, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Message body (URL-safe base64)
#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub size: Option<u32>,
    pub data: Option<String>,
}

/// MIME part of a multipart message
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessageBody>,
    pub parts: Option<Vec<MessagePart>>,
}

/// Body of `threads/{id}/modify`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyThreadRequest<'a> {
    pub add_label_ids: &'a [String],
    pub remove_label_ids: &'a [String],
}

/// Error envelope returned by the REST API
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

/// Error body returned by the OAuth token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}
