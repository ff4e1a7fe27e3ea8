//! Terminal rendering of view rows and threads

use mail::ThreadDetail;
use mail::view::{RowView, Segment};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| {
            if s.highlighted {
                format!("{BOLD}{}{RESET}", s.text)
            } else {
                s.text.clone()
            }
        })
        .collect()
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len > width {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    } else {
        format!("{text}{}", " ".repeat(width - len))
    }
}

/// Highlighted text padded to a column; truncated text loses highlighting
fn padded_segments(parts: &[Segment], width: usize) -> String {
    let plain: String = parts.iter().map(|s| s.text.as_str()).collect();
    let len = plain.chars().count();
    if len > width {
        pad(&plain, width)
    } else {
        segments(parts) + &" ".repeat(width - len)
    }
}

pub fn row(row: &RowView) -> String {
    let unread = if row.unread { "●" } else { " " };
    let sender = padded_segments(&row.sender, 22);
    let replies = row.replies.map(|n| format!(" ({n})")).unwrap_or_default();
    let badges: String = row.badges.iter().map(|b| format!(" [{}]", b.text)).collect();

    format!(
        "{unread} {} {sender} {}{replies}{badges}  {}",
        pad(&row.id, 14),
        segments(&row.subject),
        row.received
    )
}

pub fn thread(detail: &ThreadDetail) -> String {
    let mut out = String::new();
    if let Some(latest) = &detail.latest {
        out.push_str(&format!("{BOLD}{}{RESET}\n", latest.subject));
    }
    let labels: Vec<&str> = detail.labels.iter().map(|l| l.name.as_str()).collect();
    if !labels.is_empty() {
        out.push_str(&format!("Labels: {}\n", labels.join(", ")));
    }
    for message in &detail.messages {
        out.push_str(&format!(
            "\n{} · {}\n",
            message.sender.display(),
            message.received_on.format("%Y-%m-%d %H:%M")
        ));
        let body = message
            .body_text
            .as_deref()
            .or(message.body_html.as_deref())
            .unwrap_or("");
        out.push_str(body.trim());
        out.push('\n');
    }
    out
}
