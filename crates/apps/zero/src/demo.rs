//! Seeded mailbox for `--offline`

use chrono::{Duration, Utc};
use mail::models::{Connection, Draft, EmailAddress, LabelId, ThreadSummary};
use mail::InMemoryDriver;

pub const USER_ID: &str = "demo-user";
pub const CONNECTION_ID: &str = "demo-connection";

const SENDERS: &[(&str, &str)] = &[
    ("Ada Lovelace", "ada@analytical.example"),
    ("Grace Hopper", "grace@cobol.example"),
    ("Alan Turing", "alan@bletchley.example"),
    ("Katherine Johnson", "katherine@nasa.example"),
];

const SUBJECTS: &[&str] = &[
    "Quarterly report draft",
    "Lunch on Friday?",
    "Build is red again",
    "Notes from the design review",
    "Your invoice is ready",
];

const CATEGORIES: &[&str] = &["CATEGORY_UPDATES", "CATEGORY_PERSONAL", "CATEGORY_PROMOTIONS"];

pub fn connection() -> Connection {
    Connection::new(CONNECTION_ID, USER_ID, "google", "me@zero.example")
        .with_tokens("offline-access", "offline-refresh")
}

/// A mailbox with enough threads to page through
pub fn mailbox() -> InMemoryDriver {
    let now = Utc::now();
    let threads = (0..45)
        .map(|i| {
            let (name, email) = SENDERS[i % SENDERS.len()];
            let mut tags = vec![LabelId::INBOX.to_string()];
            if i % 3 == 0 {
                tags.push(LabelId::UNREAD.to_string());
            }
            if i % 4 == 0 {
                tags.push(CATEGORIES[i % CATEGORIES.len()].to_string());
            }
            ThreadSummary::new(
                format!("demo-{i:03}"),
                EmailAddress::with_name(name, email),
                SUBJECTS[i % SUBJECTS.len()],
            )
            .with_unread(i % 3 == 0)
            .with_tags(tags)
            .with_total_replies(1 + i % 4)
            .with_received_on(now - Duration::hours(i as i64 * 7))
        })
        .collect();

    let driver = InMemoryDriver::with_threads(threads);
    for i in 0..3 {
        driver.add_draft(Draft {
            id: format!("draft-{i}"),
            sender: EmailAddress::new("me@zero.example"),
            subject: format!("Unsent reply {}", i + 1),
            received_on: now - Duration::days(i),
            unread: false,
        });
    }
    driver
}
