//! Domain models for mail entities

mod connection;
mod draft;
mod label;
mod message;
mod thread;

pub use connection::{Connection, Session};
pub use draft::{Draft, DraftPage};
pub use label::{BadgeStyle, Label, LabelId, badge_style, label_display_name, visible_labels};
pub use message::{EmailAddress, MessageId, ParsedMessage};
pub use thread::{ThreadDetail, ThreadId, ThreadPage, ThreadSummary, is_starred_label};
