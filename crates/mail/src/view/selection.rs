//! Selection state machine for list views
//!
//! One [`SelectionState`] is owned by each list view and changes only through
//! [`SelectionState::apply`]. The interaction mode follows the modifier key
//! most recently pressed:
//!
//! | Key down          | Mode             |
//! |-------------------|------------------|
//! | Control / Meta    | `Mass`           |
//! | Shift             | `Range`          |
//! | Alt + Shift       | `SelectAllBelow` |
//!
//! Releasing the driving key, or the window losing focus, returns to
//! `Single` and forgets the range anchor. The bulk set survives.

use log::debug;
use std::fmt;

use crate::error::{Error, Result};
use crate::models::{Draft, ThreadSummary};

/// Interaction mode; exactly one is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectMode {
    #[default]
    Single,
    /// Toggle items in the bulk set
    Mass,
    /// Contiguous slice between the anchor and the clicked item
    Range,
    /// Clicked item through the end of the loaded list
    SelectAllBelow,
}

/// A keyboard key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Control,
    Meta,
    Shift,
    Alt,
    /// A printable key, lower-cased
    Char(char),
    /// Any other named key ("Escape", "Enter", ...)
    Named(String),
}

impl Key {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "control" | "ctrl" => Key::Control,
            "meta" | "cmd" | "command" | "super" => Key::Meta,
            "shift" => Key::Shift,
            "alt" | "option" => Key::Alt,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => Key::Named(name.to_string()),
                }
            }
        }
    }

    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Control | Key::Meta | Key::Shift | Key::Alt)
    }
}

/// A key press with the modifiers held at the time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: Key,
}

impl Chord {
    /// A key pressed on its own; a modifier key counts as held
    pub fn key(key: Key) -> Self {
        Self {
            ctrl: key == Key::Control,
            meta: key == Key::Meta,
            shift: key == Key::Shift,
            alt: key == Key::Alt,
            key,
        }
    }

    /// Parse `"Meta+Shift+u"` style chords; the last segment is the key
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((last, modifiers)) = parts.split_last() else {
            return Err(Error::validation(format!("empty key chord: {s:?}")));
        };
        if last.is_empty() {
            return Err(Error::validation(format!("missing key in chord: {s:?}")));
        }

        let mut chord = Chord::key(Key::from_name(last));
        for modifier in modifiers {
            match Key::from_name(modifier) {
                Key::Control => chord.ctrl = true,
                Key::Meta => chord.meta = true,
                Key::Shift => chord.shift = true,
                Key::Alt => chord.alt = true,
                _ => return Err(Error::validation(format!("unknown modifier {modifier:?}"))),
            }
        }
        Ok(chord)
    }

    /// Control or Meta held
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    fn is_char(&self, c: char) -> bool {
        self.key == Key::Char(c)
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    KeyDown(Chord),
    KeyUp(Key),
    /// The window lost focus
    Blur,
    Click(String),
    SelectAll,
    /// The loaded item set changed
    ItemsChanged,
    /// The view moved to another folder or query
    Navigate,
}

/// User-facing message replacing a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Selected(usize),
    DeselectedAll,
    NoEmailsToSelect,
    MarkedAsRead,
    MarkedAsUnread,
    FailedToMarkAsRead,
    FailedToMarkAsUnread,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Selected(n) => write!(f, "Selected {} emails", n),
            Notice::DeselectedAll => f.write_str("Deselected all emails"),
            Notice::NoEmailsToSelect => f.write_str("No emails to select"),
            Notice::MarkedAsRead => f.write_str("Marked as read"),
            Notice::MarkedAsUnread => f.write_str("Marked as unread"),
            Notice::FailedToMarkAsRead => f.write_str("Failed to mark as read"),
            Notice::FailedToMarkAsUnread => f.write_str("Failed to mark as unread"),
        }
    }
}

/// Work the owning view performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Mark these items read, then revalidate the list
    MarkRead(Vec<String>),
    MarkUnread(Vec<String>),
    /// Show this thread in the detail pane
    Open(String),
    /// Close the detail pane
    Close,
    Notice(Notice),
}

/// An item the selection can refer to
pub trait Selectable {
    fn id(&self) -> &str;

    /// ID shown in the detail pane
    fn open_id(&self) -> &str {
        self.id()
    }

    fn is_unread(&self) -> bool {
        false
    }
}

impl Selectable for ThreadSummary {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn open_id(&self) -> &str {
        ThreadSummary::open_id(self).as_str()
    }

    fn is_unread(&self) -> bool {
        self.unread
    }
}

impl Selectable for Draft {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_unread(&self) -> bool {
        self.unread
    }
}

impl<T: Selectable + ?Sized> Selectable for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn open_id(&self) -> &str {
        (**self).open_id()
    }

    fn is_unread(&self) -> bool {
        (**self).is_unread()
    }
}

/// Selection of one list view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    mode: SelectMode,
    /// Item open in the detail pane
    selected: Option<String>,
    /// Bulk selection in the order items were added
    bulk: Vec<String>,
    /// Range start within the current modifier hold
    anchor: Option<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn bulk(&self) -> &[String] {
        &self.bulk
    }

    pub fn is_bulk_selected(&self, id: &str) -> bool {
        self.bulk.iter().any(|b| b == id)
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Empty the bulk set after a bulk action succeeded
    pub fn clear_bulk(&mut self) {
        self.bulk.clear();
    }

    fn set_mode(&mut self, mode: SelectMode) {
        if self.mode != mode {
            debug!("Select mode {:?} -> {:?}", self.mode, mode);
            self.anchor = None;
        }
        self.mode = mode;
    }

    fn revert_to_single(&mut self) {
        self.mode = SelectMode::Single;
        self.anchor = None;
    }

    /// Apply one event against the currently loaded items
    pub fn apply<T: Selectable>(&mut self, event: SelectionEvent, items: &[T]) -> Vec<Effect> {
        match event {
            SelectionEvent::KeyDown(chord) => self.key_down(&chord, items),
            SelectionEvent::KeyUp(key) => {
                let driving = match self.mode {
                    SelectMode::Single => false,
                    SelectMode::Mass => matches!(key, Key::Control | Key::Meta),
                    SelectMode::Range => key == Key::Shift,
                    SelectMode::SelectAllBelow => matches!(key, Key::Alt | Key::Shift),
                };
                if driving {
                    self.revert_to_single();
                }
                Vec::new()
            }
            SelectionEvent::Blur => {
                self.revert_to_single();
                Vec::new()
            }
            SelectionEvent::Click(id) => self.click(&id, items),
            SelectionEvent::SelectAll => {
                self.revert_to_single();
                self.select_all(items)
            }
            SelectionEvent::ItemsChanged => {
                self.prune(items);
                Vec::new()
            }
            SelectionEvent::Navigate => {
                *self = Self::default();
                Vec::new()
            }
        }
    }

    fn key_down<T: Selectable>(&mut self, chord: &Chord, items: &[T]) -> Vec<Effect> {
        if chord.command() && chord.shift && (chord.is_char('u') || chord.is_char('i')) {
            self.revert_to_single();
            if self.bulk.is_empty() {
                return Vec::new();
            }
            let ids = self.bulk.clone();
            return vec![if chord.is_char('u') {
                Effect::MarkUnread(ids)
            } else {
                Effect::MarkRead(ids)
            }];
        }

        if chord.command() && !chord.shift && (chord.is_char('a') || chord.is_char('n')) {
            self.revert_to_single();
            return self.select_all(items);
        }

        let mode = match chord.key {
            Key::Shift | Key::Alt if chord.shift && chord.alt => Some(SelectMode::SelectAllBelow),
            Key::Shift => Some(SelectMode::Range),
            Key::Control | Key::Meta => Some(SelectMode::Mass),
            _ => None,
        };
        if let Some(mode) = mode {
            self.set_mode(mode);
        }
        Vec::new()
    }

    fn select_all<T: Selectable>(&mut self, items: &[T]) -> Vec<Effect> {
        if !self.bulk.is_empty() {
            self.bulk.clear();
            return vec![Effect::Notice(Notice::DeselectedAll)];
        }
        if items.is_empty() {
            return vec![Effect::Notice(Notice::NoEmailsToSelect)];
        }
        self.bulk = items.iter().map(|i| i.id().to_string()).collect();
        vec![Effect::Notice(Notice::Selected(self.bulk.len()))]
    }

    fn click<T: Selectable>(&mut self, id: &str, items: &[T]) -> Vec<Effect> {
        let Some(index) = items.iter().position(|i| i.id() == id) else {
            debug!("Ignoring click on unloaded item {}", id);
            return Vec::new();
        };
        let ids = || items.iter().map(|i| i.id().to_string());

        match self.mode {
            SelectMode::Mass => {
                if let Some(pos) = self.bulk.iter().position(|b| b == id) {
                    self.bulk.remove(pos);
                } else {
                    self.bulk.push(id.to_string());
                }
                Vec::new()
            }
            SelectMode::Range => {
                let anchor = self
                    .anchor
                    .clone()
                    .or_else(|| self.bulk.last().cloned())
                    .or_else(|| self.selected.clone())
                    .unwrap_or_else(|| id.to_string());

                if let Some(start) = items.iter().position(|i| i.id() == anchor) {
                    let (lo, hi) = (start.min(index), start.max(index));
                    self.bulk = ids().skip(lo).take(hi - lo + 1).collect();
                    self.anchor = Some(anchor);
                }
                Vec::new()
            }
            SelectMode::SelectAllBelow => {
                self.bulk = ids().skip(index).collect();
                Vec::new()
            }
            SelectMode::Single => {
                let item = &items[index];
                let open_id = item.open_id();
                let mut effects = Vec::new();

                if self.selected.as_deref() == Some(open_id) || self.selected.as_deref() == Some(id)
                {
                    self.selected = None;
                    self.bulk.clear();
                    effects.push(Effect::Close);
                } else {
                    self.selected = Some(open_id.to_string());
                    self.bulk.clear();
                    effects.push(Effect::Open(open_id.to_string()));
                }

                if item.is_unread() {
                    effects.push(Effect::MarkRead(vec![id.to_string()]));
                }
                effects
            }
        }
    }

    /// Drop references to items no longer loaded
    fn prune<T: Selectable>(&mut self, items: &[T]) {
        let loaded = |id: &str| items.iter().any(|i| i.id() == id || i.open_id() == id);
        self.bulk.retain(|id| loaded(id));
        if self.selected.as_deref().is_some_and(|s| !loaded(s)) {
            self.selected = None;
        }
        if self.anchor.as_deref().is_some_and(|a| !loaded(a)) {
            self.anchor = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailAddress;
    use std::collections::BTreeSet;

    fn items(ids: &[&str]) -> Vec<ThreadSummary> {
        ids.iter()
            .map(|id| ThreadSummary::new(*id, EmailAddress::new("a@example.com"), "s"))
            .collect()
    }

    fn key_down(state: &mut SelectionState, chord: &str, list: &[ThreadSummary]) -> Vec<Effect> {
        state.apply(SelectionEvent::KeyDown(Chord::parse(chord).unwrap()), list)
    }

    fn click(state: &mut SelectionState, id: &str, list: &[ThreadSummary]) -> Vec<Effect> {
        state.apply(SelectionEvent::Click(id.to_string()), list)
    }

    fn bulk_set(state: &SelectionState) -> BTreeSet<&str> {
        state.bulk().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_parse_chords() {
        let chord = Chord::parse("Meta+Shift+u").unwrap();
        assert!(chord.meta && chord.shift && !chord.ctrl && !chord.alt);
        assert_eq!(chord.key, Key::Char('u'));

        let chord = Chord::parse("Alt+Shift").unwrap();
        assert!(chord.alt && chord.shift);
        assert_eq!(chord.key, Key::Shift);

        assert_eq!(Chord::parse("Escape").unwrap().key, Key::Named("Escape".to_string()));
        assert!(Chord::parse("Hyper+x").is_err());
        assert!(Chord::parse("Meta+").is_err());
    }

    #[test]
    fn test_modifier_press_and_release_cycle() {
        let list = items(&["a"]);
        let cases = [
            ("Control", Key::Control, SelectMode::Mass),
            ("Meta", Key::Meta, SelectMode::Mass),
            ("Shift", Key::Shift, SelectMode::Range),
            ("Alt+Shift", Key::Alt, SelectMode::SelectAllBelow),
            ("Alt+Shift", Key::Shift, SelectMode::SelectAllBelow),
        ];
        for (chord, release, mode) in cases {
            let mut state = SelectionState::new();
            key_down(&mut state, chord, &list);
            assert_eq!(state.mode(), mode, "{chord}");
            state.apply(SelectionEvent::KeyUp(release), &list);
            assert_eq!(state.mode(), SelectMode::Single, "{chord}");
        }
    }

    #[test]
    fn test_most_recent_modifier_wins() {
        let list = items(&["a"]);
        let mut state = SelectionState::new();
        key_down(&mut state, "Control", &list);
        key_down(&mut state, "Control+Shift", &list);
        assert_eq!(state.mode(), SelectMode::Range);

        // Releasing a key that is not driving the mode changes nothing
        state.apply(SelectionEvent::KeyUp(Key::Control), &list);
        assert_eq!(state.mode(), SelectMode::Range);
    }

    #[test]
    fn test_blur_reverts_but_keeps_bulk() {
        let list = items(&["a", "b", "c"]);
        let mut state = SelectionState::new();
        key_down(&mut state, "Shift", &list);
        click(&mut state, "a", &list);
        click(&mut state, "c", &list);
        assert_eq!(state.anchor(), Some("a"));

        state.apply(SelectionEvent::Blur, &list);
        assert_eq!(state.mode(), SelectMode::Single);
        assert_eq!(state.anchor(), None);
        assert_eq!(state.bulk().len(), 3);
    }

    #[test]
    fn test_shift_click_range() {
        let list = items(&["a", "b", "c"]);
        let mut state = SelectionState::new();
        key_down(&mut state, "Shift", &list);
        click(&mut state, "a", &list);
        click(&mut state, "c", &list);
        assert_eq!(bulk_set(&state), BTreeSet::from(["a", "b", "c"]));
    }

    #[test]
    fn test_range_is_order_independent() {
        let list = items(&["a", "b", "c", "d", "e"]);
        for (first, second) in [("b", "d"), ("d", "b")] {
            let mut state = SelectionState::new();
            key_down(&mut state, "Shift", &list);
            click(&mut state, first, &list);
            click(&mut state, second, &list);
            assert_eq!(bulk_set(&state), BTreeSet::from(["b", "c", "d"]));
        }
    }

    #[test]
    fn test_range_anchor_falls_back_to_last_bulk_item() {
        let list = items(&["a", "b", "c", "d"]);
        let mut state = SelectionState::new();
        key_down(&mut state, "Meta", &list);
        click(&mut state, "d", &list);
        state.apply(SelectionEvent::KeyUp(Key::Meta), &list);

        key_down(&mut state, "Shift", &list);
        click(&mut state, "b", &list);
        assert_eq!(state.bulk(), ["b", "c", "d"]);
    }

    #[test]
    fn test_range_anchor_falls_back_to_open_item() {
        let list = items(&["a", "b", "c"]);
        let mut state = SelectionState::new();
        click(&mut state, "a", &list);
        key_down(&mut state, "Shift", &list);
        click(&mut state, "b", &list);
        assert_eq!(state.bulk(), ["a", "b"]);
    }

    #[test]
    fn test_select_all_below_is_suffix() {
        let ids = ["a", "b", "c", "d"];
        let list = items(&ids);
        for (i, id) in ids.iter().enumerate() {
            let mut state = SelectionState::new();
            key_down(&mut state, "Alt+Shift", &list);
            click(&mut state, id, &list);
            assert_eq!(state.bulk(), &ids[i..]);
        }
    }

    #[test]
    fn test_mass_toggles() {
        let list = items(&["a", "b"]);
        let mut state = SelectionState::new();
        key_down(&mut state, "Control", &list);
        click(&mut state, "a", &list);
        click(&mut state, "b", &list);
        click(&mut state, "a", &list);
        assert_eq!(state.bulk(), ["b"]);
    }

    #[test]
    fn test_single_click_opens_and_marks_read() {
        let mut list = items(&["a", "b"]);
        list[1].unread = true;
        let mut state = SelectionState::new();
        key_down(&mut state, "Control", &list);
        click(&mut state, "a", &list);
        state.apply(SelectionEvent::KeyUp(Key::Control), &list);

        let effects = click(&mut state, "b", &list);
        assert_eq!(
            effects,
            vec![Effect::Open("b".to_string()), Effect::MarkRead(vec!["b".to_string()])]
        );
        assert_eq!(state.selected(), Some("b"));
        assert!(state.bulk().is_empty());

        assert_eq!(click(&mut state, "b", &list)[0], Effect::Close);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn test_select_all_toggles() {
        let list = items(&["a", "b", "c"]);
        let mut state = SelectionState::new();

        let effects = key_down(&mut state, "Meta+a", &list);
        assert_eq!(effects, vec![Effect::Notice(Notice::Selected(3))]);
        assert_eq!(effects[0], Effect::Notice(Notice::Selected(3)));
        assert_eq!(Notice::Selected(3).to_string(), "Selected 3 emails");

        let effects = state.apply(SelectionEvent::SelectAll, &list);
        assert_eq!(effects, vec![Effect::Notice(Notice::DeselectedAll)]);
        assert!(state.bulk().is_empty());

        let empty: Vec<ThreadSummary> = Vec::new();
        let effects = key_down(&mut state, "Control+n", &empty);
        assert_eq!(effects, vec![Effect::Notice(Notice::NoEmailsToSelect)]);
    }

    #[test]
    fn test_bulk_mark_chords() {
        let list = items(&["a", "b"]);
        let mut state = SelectionState::new();
        assert!(key_down(&mut state, "Meta+Shift+u", &list).is_empty());

        state.apply(SelectionEvent::SelectAll, &list);
        key_down(&mut state, "Shift", &list);
        let effects = key_down(&mut state, "Control+Shift+u", &list);
        assert_eq!(
            effects,
            vec![Effect::MarkUnread(vec!["a".to_string(), "b".to_string()])]
        );
        assert_eq!(state.mode(), SelectMode::Single);

        let effects = key_down(&mut state, "Meta+Shift+i", &list);
        assert!(matches!(&effects[0], Effect::MarkRead(ids) if ids.len() == 2));
    }

    #[test]
    fn test_items_changed_prunes() {
        let list = items(&["a", "b", "c"]);
        let mut state = SelectionState::new();
        state.apply(SelectionEvent::SelectAll, &list);
        click(&mut state, "a", &list);

        let remaining = items(&["b"]);
        state.apply(SelectionEvent::SelectAll, &list);
        state.apply(SelectionEvent::ItemsChanged, &remaining);
        assert!(state.bulk().iter().all(|id| id == "b"));
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn test_navigate_clears_everything() {
        let list = items(&["a", "b"]);
        let mut state = SelectionState::new();
        click(&mut state, "a", &list);
        key_down(&mut state, "Meta+a", &list);
        key_down(&mut state, "Shift", &list);

        state.apply(SelectionEvent::Navigate, &list);
        assert_eq!(state, SelectionState::new());
    }

    #[test]
    fn test_click_on_unloaded_item_is_ignored() {
        let list = items(&["a"]);
        let mut state = SelectionState::new();
        assert!(click(&mut state, "zzz", &list).is_empty());
        assert_eq!(state, SelectionState::new());
    }
}
