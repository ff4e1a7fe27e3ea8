//! Windowed rendering of long lists
//!
//! [`Virtualizer`] works out which rows intersect the viewport so a view only
//! lays out those (plus a few rows of overscan on each side). Row sizes start
//! at an estimate and may be replaced by measured sizes.

use std::collections::HashMap;
use std::ops::Range;

/// A row to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualItem {
    pub index: usize,
    /// Offset of the row's top edge from the top of the list
    pub start: f32,
    pub size: f32,
}

impl VirtualItem {
    pub fn end(&self) -> f32 {
        self.start + self.size
    }
}

/// Visible-range calculator for a vertically scrolling list
#[derive(Debug, Clone)]
pub struct Virtualizer {
    count: usize,
    estimate: f32,
    gap: f32,
    overscan: usize,
    viewport: f32,
    scroll_offset: f32,
    measured: HashMap<usize, f32>,
}

impl Virtualizer {
    pub fn new(count: usize, estimate: f32, gap: f32) -> Self {
        Self {
            count,
            estimate,
            gap,
            overscan: 1,
            viewport: 0.0,
            scroll_offset: 0.0,
            measured: HashMap::new(),
        }
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn viewport(&self) -> f32 {
        self.viewport
    }

    /// Item count changed (pages loaded, items removed)
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.measured.retain(|&index, _| index < count);
        // Keep the viewport over rows when the list shrinks
        let max_offset = (self.total_size() - self.viewport).max(0.0);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    /// Switch the estimated row size, e.g. between compact and regular rows
    pub fn set_estimate(&mut self, estimate: f32) {
        self.estimate = estimate;
        self.measured.clear();
    }

    /// Viewport height changed
    pub fn resize(&mut self, viewport: f32) {
        self.viewport = viewport.max(0.0);
    }

    pub fn scroll_to(&mut self, offset: f32) {
        self.scroll_offset = offset.max(0.0);
    }

    /// Record the rendered size of a row
    pub fn measure(&mut self, index: usize, size: f32) {
        if index < self.count {
            self.measured.insert(index, size);
        }
    }

    fn size_of(&self, index: usize) -> f32 {
        self.measured.get(&index).copied().unwrap_or(self.estimate)
    }

    fn item(&self, index: usize, start: f32) -> VirtualItem {
        VirtualItem {
            index,
            start,
            size: self.size_of(index),
        }
    }

    /// Height of the whole list including gaps
    pub fn total_size(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let rows: f32 = (0..self.count).map(|i| self.size_of(i)).sum();
        rows + self.gap * (self.count - 1) as f32
    }

    /// Row indexes intersecting the viewport, without overscan
    pub fn visible_range(&self) -> Range<usize> {
        let top = self.scroll_offset;
        let bottom = self.scroll_offset + self.viewport;

        let mut start = 0.0;
        let mut first = None;
        let mut last = 0;
        for index in 0..self.count {
            let item = self.item(index, start);
            if item.start >= bottom && first.is_some() {
                break;
            }
            if item.end() > top && item.start < bottom {
                first.get_or_insert(index);
                last = index;
            }
            start = item.end() + self.gap;
        }

        match first {
            Some(first) => first..last + 1,
            None => 0..0,
        }
    }

    /// Rows to render: the visible range widened by the overscan
    pub fn virtual_items(&self) -> Vec<VirtualItem> {
        let visible = self.visible_range();
        if visible.is_empty() {
            return Vec::new();
        }
        let first = visible.start.saturating_sub(self.overscan);
        let last = (visible.end + self.overscan).min(self.count);

        let mut items = Vec::with_capacity(last - first);
        let mut start = 0.0;
        for index in 0..last {
            let item = self.item(index, start);
            if index >= first {
                items.push(item);
            }
            start = item.end() + self.gap;
        }
        items
    }
}

/// Whether the viewport is within two rows of the bottom and no fetch is
/// in flight
pub fn should_load_more(
    scroll_top: f32,
    scroll_height: f32,
    client_height: f32,
    item_height: f32,
    busy: bool,
) -> bool {
    !busy && scroll_height - (scroll_top + client_height) < item_height * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexes(v: &Virtualizer) -> Vec<usize> {
        v.virtual_items().iter().map(|i| i.index).collect()
    }

    #[test]
    fn test_total_size_includes_gaps() {
        let v = Virtualizer::new(3, 96.0, 6.0);
        assert_eq!(v.total_size(), 96.0 * 3.0 + 12.0);
        assert_eq!(Virtualizer::new(0, 96.0, 6.0).total_size(), 0.0);
    }

    #[test]
    fn test_window_at_top() {
        let mut v = Virtualizer::new(100, 100.0, 0.0).with_overscan(1);
        v.resize(250.0);
        assert_eq!(v.visible_range(), 0..3);
        assert_eq!(indexes(&v), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_window_follows_scroll() {
        let mut v = Virtualizer::new(100, 100.0, 0.0).with_overscan(2);
        v.resize(200.0);
        v.scroll_to(1050.0);
        assert_eq!(v.visible_range(), 10..13);
        assert_eq!(indexes(&v), (8..15).collect::<Vec<_>>());

        let items = v.virtual_items();
        assert_eq!(items[0].start, 800.0);
    }

    #[test]
    fn test_gap_offsets_rows() {
        let mut v = Virtualizer::new(10, 64.0, 6.0).with_overscan(0);
        v.resize(100.0);
        let items = v.virtual_items();
        assert_eq!(items.iter().map(|i| i.start).collect::<Vec<_>>(), vec![0.0, 70.0]);
    }

    #[test]
    fn test_count_change_and_measure() {
        let mut v = Virtualizer::new(2, 100.0, 0.0).with_overscan(0);
        v.resize(1000.0);
        assert_eq!(indexes(&v), vec![0, 1]);

        v.set_count(20);
        v.measure(0, 300.0);
        assert_eq!(v.visible_range(), 0..8);
        assert_eq!(v.total_size(), 300.0 + 19.0 * 100.0);

        v.set_count(0);
        assert!(v.virtual_items().is_empty());
    }

    #[test]
    fn test_shrinking_list_keeps_rows_in_view() {
        let mut v = Virtualizer::new(100, 100.0, 0.0).with_overscan(0);
        v.resize(300.0);
        v.scroll_to(9700.0);
        assert_eq!(v.visible_range(), 97..100);

        v.set_count(10);
        assert_eq!(v.scroll_offset(), 700.0);
        assert_eq!(v.visible_range(), 7..10);

        v.set_count(2);
        assert_eq!(v.scroll_offset(), 0.0);
        assert_eq!(indexes(&v), vec![0, 1]);
    }

    #[test]
    fn test_should_load_more() {
        // 2 rows of 96px from the bottom
        assert!(should_load_more(800.0, 1200.0, 300.0, 96.0, false));
        assert!(!should_load_more(0.0, 1200.0, 300.0, 96.0, false));
        assert!(!should_load_more(800.0, 1200.0, 300.0, 96.0, true));
    }
}
