//! View state for mail lists
//!
//! Everything here is renderer independent: views consume scroll, pointer
//! and key events and expose rows, notices and the open item.

mod drafts_list;
mod row;
mod selection;
mod thread_list;
mod virtual_list;

pub use drafts_list::DraftsListView;
pub use row::{Badge, RowView, Segment, badges, format_received, highlight_segments};
pub use selection::{
    Chord, Effect, Key, Notice, Selectable, SelectMode, SelectionEvent, SelectionState,
};
pub use thread_list::{EmptyState, ThreadListView};
pub use virtual_list::{VirtualItem, Virtualizer, should_load_more};

pub use crate::models::{badge_style, label_display_name, visible_labels};
