//! Presentation of a single list row
//!
//! Rows are described as plain data so any front end (terminal, GUI) can
//! render them.

use chrono::{DateTime, Datelike, Local, Utc};
use regex::Regex;

use super::selection::SelectionState;
use crate::models::{BadgeStyle, Draft, ThreadSummary, badge_style, label_display_name, visible_labels};

/// A run of text, highlighted when it matched the search needle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: false,
        }
    }
}

/// Split `text` around case-insensitive occurrences of `needle`
pub fn highlight_segments(text: &str, needle: &str) -> Vec<Segment> {
    let needle = needle.trim();
    if needle.is_empty() || text.is_empty() {
        return vec![Segment::plain(text)];
    }
    let Ok(pattern) = Regex::new(&format!("(?i){}", regex::escape(needle))) else {
        return vec![Segment::plain(text)];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for m in pattern.find_iter(text) {
        if m.start() > last {
            segments.push(Segment::plain(&text[last..m.start()]));
        }
        segments.push(Segment {
            text: m.as_str().to_string(),
            highlighted: true,
        });
        last = m.end();
    }
    if last < text.len() {
        segments.push(Segment::plain(&text[last..]));
    }
    segments
}

/// Label badge shown next to the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub style: BadgeStyle,
}

/// Badges for a thread's tags, hiding the ones the list never shows
pub fn badges(tags: &[String]) -> Vec<Badge> {
    visible_labels(tags)
        .into_iter()
        .map(|label| Badge {
            text: label_display_name(label),
            style: badge_style(label),
        })
        .collect()
}

/// Short timestamp: time today, month and day this year, full date otherwise
pub fn format_received(received: DateTime<Utc>, now: DateTime<Local>) -> String {
    let local = received.with_timezone(&Local);
    if local.date_naive() == now.date_naive() {
        local.format("%-I:%M %p").to_string()
    } else if local.year() == now.year() {
        local.format("%b %-d").to_string()
    } else {
        local.format("%m/%d/%Y").to_string()
    }
}

/// Renderable description of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: String,
    pub sender: Vec<Segment>,
    pub subject: Vec<Segment>,
    pub received: String,
    pub unread: bool,
    pub badges: Vec<Badge>,
    /// Reply count, shown only for threads with more than one message
    pub replies: Option<usize>,
    /// Open in the detail pane
    pub selected: bool,
    pub bulk_selected: bool,
}

impl RowView {
    pub fn for_thread(
        thread: &ThreadSummary,
        selection: &SelectionState,
        highlight: &str,
        now: DateTime<Local>,
    ) -> Self {
        let selected = selection.selected().is_some_and(|s| {
            s == thread.id.as_str() || s == thread.open_id().as_str()
        });
        Self {
            id: thread.id.to_string(),
            sender: highlight_segments(thread.sender.display_name(), highlight),
            subject: highlight_segments(&thread.subject, highlight),
            received: format_received(thread.received_on, now),
            unread: thread.unread,
            badges: badges(&thread.tags),
            replies: (thread.total_replies > 1).then_some(thread.total_replies),
            selected,
            bulk_selected: selection.is_bulk_selected(thread.id.as_str()),
        }
    }

    pub fn for_draft(
        draft: &Draft,
        selection: &SelectionState,
        highlight: &str,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            id: draft.id.clone(),
            sender: highlight_segments(draft.sender.display_name(), highlight),
            subject: highlight_segments(&draft.subject, highlight),
            received: format_received(draft.received_on, now),
            unread: draft.unread,
            badges: Vec::new(),
            replies: None,
            selected: selection.selected() == Some(draft.id.as_str()),
            bulk_selected: selection.is_bulk_selected(&draft.id),
        }
    }

    /// Sender and subject as plain text
    pub fn plain_sender(&self) -> String {
        self.sender.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn plain_subject(&self) -> String {
        self.subject.iter().map(|s| s.text.as_str()).collect()
    }
}
