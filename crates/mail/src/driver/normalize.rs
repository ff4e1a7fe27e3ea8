//! Gmail response normalization
//!
//! Converts Gmail API resources into the list and detail models served to views.

use base64::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use log::debug;

use super::api::{GmailDraft, GmailMessage, GmailThread, Header, MessagePart, MessagePayload};
use crate::models::{
    Draft, EmailAddress, Label, LabelId, MessageId, ParsedMessage, ThreadDetail, ThreadId,
    ThreadSummary,
};

/// Convert a URL-safe base64 string to the standard alphabet
pub fn from_base64_url(s: &str) -> String {
    s.replace('-', "+").replace('_', "/")
}

/// Decode URL-safe base64 body data into UTF-8 text
pub fn from_binary(s: &str) -> Option<String> {
    let standard = from_base64_url(s);
    let trimmed = standard.trim_end_matches('=');
    let decoded = BASE64_STANDARD_NO_PAD.decode(trimmed).ok()?;
    String::from_utf8(decoded).ok()
}

/// Depth-first search of MIME parts for the first `text/html` body.
///
/// Returns the raw (still encoded) body data.
pub fn find_html_body(parts: &[MessagePart]) -> Option<&str> {
    for part in parts {
        if part.mime_type.as_deref() == Some("text/html")
            && let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref())
        {
            debug!("Found HTML content in message part");
            return Some(data);
        }
        if let Some(nested) = &part.parts
            && let Some(found) = find_html_body(nested)
        {
            return Some(found);
        }
    }
    None
}

/// Normalize one Gmail message into a parsed message
pub fn normalize_message(msg: &GmailMessage) -> ParsedMessage {
    let mut parsed = ParsedMessage::new(
        MessageId::new(&msg.id),
        ThreadId::new(&msg.thread_id),
    );
    let label_ids = msg.label_ids.clone().unwrap_or_default();

    parsed.received_on = internal_date(msg);
    parsed.unread = label_ids.iter().any(|l| l == LabelId::UNREAD);
    parsed.tags = label_ids
        .iter()
        .map(|l| Label::new(l.as_str(), l.as_str()))
        .collect();

    if let Some(payload) = &msg.payload {
        let headers = payload.headers.as_deref().unwrap_or_default();
        if let Some(from) = header(headers, "From") {
            parsed.sender = EmailAddress::parse(from);
        }
        parsed.to = header(headers, "To").map(EmailAddress::parse_list).unwrap_or_default();
        parsed.cc = header(headers, "Cc").map(EmailAddress::parse_list).unwrap_or_default();
        parsed.bcc = header(headers, "Bcc").map(EmailAddress::parse_list).unwrap_or_default();
        parsed.subject = header(headers, "Subject").unwrap_or_default().to_string();
        parsed.body_html = extract_html_body(payload);
        parsed.body_text = extract_plain_text_body(payload);
    }

    if parsed.body_text.is_none() && !msg.snippet.is_empty() {
        parsed.body_text = Some(decode_html_entities(&msg.snippet));
    }

    parsed
}

/// Normalize a full thread resource
pub fn normalize_thread(thread: &GmailThread) -> ThreadDetail {
    let mut messages: Vec<ParsedMessage> = thread
        .messages
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(normalize_message)
        .collect();
    messages.sort_by_key(|m| m.received_on);
    ThreadDetail::from_messages(messages)
}

/// Summarize a thread fetched with `format=metadata` for a list row
pub fn summarize_thread(thread: &GmailThread) -> ThreadSummary {
    let messages = thread.messages.as_deref().unwrap_or_default();
    let latest = messages.iter().max_by_key(|m| internal_date(m));

    let mut tags: Vec<String> = Vec::new();
    for label in messages.iter().flat_map(|m| m.label_ids.iter().flatten()) {
        if !tags.contains(label) {
            tags.push(label.clone());
        }
    }
    let unread = tags.iter().any(|l| l == LabelId::UNREAD);

    let (sender, subject, received_on) = match latest {
        Some(msg) => {
            let headers = msg
                .payload
                .as_ref()
                .and_then(|p| p.headers.as_deref())
                .unwrap_or_default();
            (
                header(headers, "From")
                    .map(EmailAddress::parse)
                    .unwrap_or_else(|| EmailAddress::new("unknown@unknown.com")),
                header(headers, "Subject").unwrap_or_default().to_string(),
                internal_date(msg),
            )
        }
        None => (EmailAddress::new("unknown@unknown.com"), String::new(), Utc::now()),
    };

    ThreadSummary::new(thread.id.as_str(), sender, subject)
        .with_received_on(received_on)
        .with_unread(unread)
        .with_total_replies(messages.len())
        .with_tags(tags)
}

/// Summarize a draft for the drafts list
pub fn summarize_draft(draft: &GmailDraft) -> Draft {
    let (sender, subject, received_on) = match &draft.message {
        Some(msg) => {
            let headers = msg
                .payload
                .as_ref()
                .and_then(|p| p.headers.as_deref())
                .unwrap_or_default();
            (
                header(headers, "To")
                    .map(EmailAddress::parse)
                    .unwrap_or_else(|| EmailAddress::new("")),
                header(headers, "Subject").unwrap_or_default().to_string(),
                internal_date(msg),
            )
        }
        None => (EmailAddress::new(""), String::new(), Utc::now()),
    };

    Draft {
        id: draft.id.clone(),
        sender,
        subject,
        received_on,
        unread: false,
    }
}

/// Gmail's internal date (milliseconds since epoch) as a timestamp
fn internal_date(msg: &GmailMessage) -> DateTime<Utc> {
    let millis: i64 = msg.internal_date.parse().unwrap_or(0);
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Header value by case-insensitive name
fn header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

fn extract_html_body(payload: &MessagePayload) -> Option<String> {
    if payload
        .mime_type
        .as_deref()
        .is_some_and(|m| m.starts_with("text/html"))
        && let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref())
    {
        return decode_base64_body(data);
    }

    let parts = payload.parts.as_deref()?;
    find_html_body(parts).and_then(decode_base64_body)
}

fn extract_plain_text_body(payload: &MessagePayload) -> Option<String> {
    if payload
        .mime_type
        .as_deref()
        .is_some_and(|m| m.starts_with("text/plain"))
        && let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref())
    {
        return decode_base64_body(data);
    }

    find_plain_text_in_parts(payload.parts.as_deref()?)
}

fn find_plain_text_in_parts(parts: &[MessagePart]) -> Option<String> {
    for part in parts {
        if part
            .mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("text/plain"))
            && let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref())
            && let Some(text) = decode_base64_body(data)
        {
            return Some(text);
        }

        if let Some(nested) = &part.parts
            && let Some(text) = find_plain_text_in_parts(nested)
        {
            return Some(text);
        }
    }
    None
}

/// Decode base64 body data; Gmail padding varies, so try several engines
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    decoders
        .iter()
        .find_map(|decoder| decoder.decode(data).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::api::MessageBody;

    fn part(mime: &str, data: Option<&str>, parts: Option<Vec<MessagePart>>) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.to_string()),
            headers: None,
            body: Some(MessageBody {
                size: None,
                data: data.map(str::to_string),
            }),
            parts,
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> Vec<Header> {
        pairs
            .iter()
            .map(|(n, v)| Header {
                name: n.to_string(),
                value: v.to_string(),
            })
            .collect()
    }

    fn message(id: &str, date: &str, labels: &[&str], hdrs: &[(&str, &str)]) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: "t1".to_string(),
            label_ids: Some(labels.iter().map(|l| l.to_string()).collect()),
            snippet: "Hello &amp; welcome".to_string(),
            internal_date: date.to_string(),
            payload: Some(MessagePayload {
                headers: Some(headers(hdrs)),
                body: None,
                parts: None,
                mime_type: Some("multipart/alternative".to_string()),
            }),
        }
    }

    #[test]
    fn test_from_base64_url() {
        assert_eq!(from_base64_url("a-b_c"), "a+b/c");
    }

    #[test]
    fn test_from_binary_decodes_utf8() {
        // "héllo" in URL-safe base64 without padding
        assert_eq!(from_binary("aMOpbGxv").as_deref(), Some("héllo"));
        assert_eq!(from_binary("!!!"), None);
    }

    #[test]
    fn test_find_html_body_searches_nested_parts() {
        let parts = vec![
            part("text/plain", Some("cGxhaW4"), None),
            part(
                "multipart/related",
                None,
                Some(vec![part("text/html", Some("PGI-aGk8L2I-"), None)]),
            ),
        ];
        assert_eq!(find_html_body(&parts), Some("PGI-aGk8L2I-"));
    }

    #[test]
    fn test_find_html_body_none() {
        let parts = vec![part("text/plain", Some("cGxhaW4"), None)];
        assert_eq!(find_html_body(&parts), None);
    }

    #[test]
    fn test_normalize_message() {
        let mut msg = message(
            "m1",
            "1700000000000",
            &["INBOX", "UNREAD"],
            &[
                ("From", "Ada <ada@example.com>"),
                ("To", "a@example.com, b@example.com"),
                ("Subject", "Engines"),
            ],
        );
        msg.payload.as_mut().unwrap().parts = Some(vec![
            part("text/plain", Some("cGxhaW4"), None),
            part("text/html", Some("PGI-aGk8L2I-"), None),
        ]);

        let parsed = normalize_message(&msg);
        assert!(parsed.unread);
        assert_eq!(parsed.sender.display_name(), "Ada");
        assert_eq!(parsed.to.len(), 2);
        assert_eq!(parsed.subject, "Engines");
        assert_eq!(parsed.body_text.as_deref(), Some("plain"));
        assert_eq!(parsed.body_html.as_deref(), Some("<b>hi</b>"));
        assert_eq!(parsed.received_on.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_snippet_fallback_decodes_entities() {
        let msg = message("m1", "0", &[], &[]);
        let parsed = normalize_message(&msg);
        assert_eq!(parsed.body_text.as_deref(), Some("Hello & welcome"));
    }

    #[test]
    fn test_summarize_thread_uses_latest_message() {
        let thread = GmailThread {
            id: "t1".to_string(),
            messages: Some(vec![
                message("m1", "1000", &["INBOX"], &[("From", "a@example.com"), ("Subject", "First")]),
                message(
                    "m2",
                    "2000",
                    &["INBOX", "UNREAD", "STARRED"],
                    &[("From", "Bob <b@example.com>"), ("Subject", "Re: First")],
                ),
            ]),
        };

        let summary = summarize_thread(&thread);
        assert_eq!(summary.id.as_str(), "t1");
        assert_eq!(summary.sender.display_name(), "Bob");
        assert_eq!(summary.subject, "Re: First");
        assert!(summary.unread);
        assert!(summary.is_starred());
        assert_eq!(summary.total_replies, 2);
        assert_eq!(summary.tags, vec!["INBOX", "UNREAD", "STARRED"]);
    }

    #[test]
    fn test_normalize_thread_orders_messages() {
        let thread = GmailThread {
            id: "t1".to_string(),
            messages: Some(vec![
                message("late", "2000", &[], &[]),
                message("early", "1000", &[], &[]),
            ]),
        };
        let detail = normalize_thread(&thread);
        assert_eq!(detail.messages[0].id.as_str(), "early");
        assert_eq!(detail.latest.unwrap().id.as_str(), "late");
    }
}
