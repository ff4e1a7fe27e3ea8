//! Label model and the presentation rules for label badges in list rows

use serde::{Deserialize, Serialize};

/// Unique identifier for a label (provider label ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub String);

impl LabelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Well-known system labels
    pub const INBOX: &'static str = "INBOX";
    pub const SENT: &'static str = "SENT";
    pub const DRAFTS: &'static str = "DRAFT";
    pub const TRASH: &'static str = "TRASH";
    pub const SPAM: &'static str = "SPAM";
    pub const STARRED: &'static str = "STARRED";
    pub const IMPORTANT: &'static str = "IMPORTANT";
    pub const UNREAD: &'static str = "UNREAD";
    pub const MUTE: &'static str = "MUTE";
}

impl From<String> for LabelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LabelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A label attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
}

impl Label {
    pub fn new(id: impl Into<LabelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Badge variant used when rendering a label in a list row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeStyle {
    Important,
    Promotions,
    Personal,
    Updates,
    Default,
    Forums,
    /// Not rendered
    Secondary,
}

fn normalized(label: &str) -> String {
    let lower = label.to_lowercase();
    match lower.strip_prefix("category_") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Badge style for a label name; unknown labels are `Secondary` and hidden
pub fn badge_style(label: &str) -> BadgeStyle {
    match normalized(label).as_str() {
        "important" => BadgeStyle::Important,
        "promotions" => BadgeStyle::Promotions,
        "personal" => BadgeStyle::Personal,
        "updates" => BadgeStyle::Updates,
        "work" => BadgeStyle::Default,
        "forums" => BadgeStyle::Forums,
        _ => BadgeStyle::Secondary,
    }
}

/// Human label text: drops a `category_` prefix and capitalizes
pub fn label_display_name(label: &str) -> String {
    let name = normalized(label);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Labels worth a badge: everything except unread/inbox and unstyled labels
pub fn visible_labels(tags: &[String]) -> Vec<&str> {
    tags.iter()
        .map(String::as_str)
        .filter(|l| {
            let lower = l.to_lowercase();
            lower != "unread" && lower != "inbox"
        })
        .filter(|l| badge_style(l) != BadgeStyle::Secondary)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_style_strips_category_prefix() {
        assert_eq!(badge_style("CATEGORY_PROMOTIONS"), BadgeStyle::Promotions);
        assert_eq!(badge_style("IMPORTANT"), BadgeStyle::Important);
        assert_eq!(badge_style("work"), BadgeStyle::Default);
        assert_eq!(badge_style("Label_123"), BadgeStyle::Secondary);
    }

    #[test]
    fn test_label_display_name() {
        assert_eq!(label_display_name("CATEGORY_UPDATES"), "Updates");
        assert_eq!(label_display_name("important"), "Important");
        assert_eq!(label_display_name(""), "");
    }

    #[test]
    fn test_visible_labels() {
        let tags = vec![
            "INBOX".to_string(),
            "UNREAD".to_string(),
            "CATEGORY_FORUMS".to_string(),
            "Label_9".to_string(),
        ];
        assert_eq!(visible_labels(&tags), vec!["CATEGORY_FORUMS"]);
    }
}
