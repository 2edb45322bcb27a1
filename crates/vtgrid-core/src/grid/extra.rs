//! Side-table for rare per-cell data.
//!
//! The packed 8-byte [`Cell`](super::cell::Cell) covers the common case.
//! Hyperlinks (OSC 8) and combining characters are rare enough that storing
//! them inline would bloat every cell; they live here instead, keyed by
//! visible (row, col). Cells that have an entry carry the `COMPLEX` or
//! `HYPERLINK` flag so readers know to look.
//!
//! The table tracks the visible region only: rows that scroll into history
//! drop their extras along the way (scrollback keeps plain cells), and the
//! grid calls the shift/clear hooks here whenever rows move so keys stay in
//! sync with content.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Key for extras lookup: visible coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    /// Visible row (0 = top).
    pub row: u16,
    /// Column.
    pub col: u16,
}

impl CellCoord {
    /// Create a coordinate.
    #[must_use]
    #[inline]
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// Rare attributes of one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellExtra {
    /// OSC 8 hyperlink target, shared across the cells of one link region.
    pub hyperlink: Option<Arc<str>>,
    /// Combining codepoints appended to the cell's base character.
    pub combining: SmallVec<[char; 2]>,
}

impl CellExtra {
    /// True when nothing is stored (entry can be dropped).
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.hyperlink.is_none() && self.combining.is_empty()
    }
}

/// Extras for the visible region.
#[derive(Debug, Clone, Default)]
pub struct CellExtras {
    map: FxHashMap<CellCoord, CellExtra>,
}

impl CellExtras {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cell's extras.
    #[must_use]
    #[inline]
    pub fn get(&self, coord: CellCoord) -> Option<&CellExtra> {
        self.map.get(&coord)
    }

    /// Get or create a cell's extras.
    pub fn get_or_create(&mut self, coord: CellCoord) -> &mut CellExtra {
        self.map.entry(coord).or_default()
    }

    /// Attach a hyperlink to a cell.
    pub fn set_hyperlink(&mut self, coord: CellCoord, uri: Arc<str>) {
        self.get_or_create(coord).hyperlink = Some(uri);
    }

    /// Append a combining mark to a cell's grapheme.
    ///
    /// Bounded: marks beyond the cap are dropped, so a stream of combining
    /// characters cannot grow a cell without limit.
    pub fn push_combining(&mut self, coord: CellCoord, c: char) {
        const MAX_COMBINING: usize = 8;
        let extra = self.get_or_create(coord);
        if extra.combining.len() < MAX_COMBINING {
            extra.combining.push(c);
        }
    }

    /// Remove a single cell's entry.
    pub fn remove(&mut self, coord: CellCoord) {
        self.map.remove(&coord);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Drop all entries in one row.
    pub fn clear_row(&mut self, row: u16) {
        self.map.retain(|coord, _| coord.row != row);
    }

    /// Drop entries in `[start, end)` of one row.
    pub fn clear_range(&mut self, row: u16, start: u16, end: u16) {
        self.map
            .retain(|coord, _| coord.row != row || coord.col < start || coord.col >= end);
    }

    /// Shift rows in `[top, bottom]` by `delta` (negative = up). Entries
    /// shifted outside the band are dropped.
    pub fn shift_rows(&mut self, top: u16, bottom: u16, delta: i32) {
        if delta == 0 || self.map.is_empty() {
            return;
        }
        let old = std::mem::take(&mut self.map);
        for (coord, extra) in old {
            if coord.row < top || coord.row > bottom {
                self.map.insert(coord, extra);
                continue;
            }
            let shifted = i32::from(coord.row) + delta;
            if shifted >= i32::from(top) && shifted <= i32::from(bottom) {
                self.map
                    .insert(CellCoord::new(shifted as u16, coord.col), extra);
            }
        }
    }

    /// Number of cells with extras.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no cell has extras.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Approximate memory held by the table.
    #[must_use]
    pub fn memory_used(&self) -> usize {
        self.map.capacity()
            * (std::mem::size_of::<CellCoord>() + std::mem::size_of::<CellExtra>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyperlink_roundtrip() {
        let mut extras = CellExtras::new();
        let uri: Arc<str> = Arc::from("https://example.com");
        extras.set_hyperlink(CellCoord::new(2, 3), Arc::clone(&uri));
        assert_eq!(
            extras.get(CellCoord::new(2, 3)).unwrap().hyperlink.as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn combining_marks_bounded() {
        let mut extras = CellExtras::new();
        let coord = CellCoord::new(0, 0);
        for _ in 0..100 {
            extras.push_combining(coord, '\u{0301}');
        }
        assert_eq!(extras.get(coord).unwrap().combining.len(), 8);
    }

    #[test]
    fn clear_row_drops_only_that_row() {
        let mut extras = CellExtras::new();
        extras.push_combining(CellCoord::new(1, 0), '\u{0301}');
        extras.push_combining(CellCoord::new(2, 0), '\u{0301}');
        extras.clear_row(1);
        assert!(extras.get(CellCoord::new(1, 0)).is_none());
        assert!(extras.get(CellCoord::new(2, 0)).is_some());
    }

    #[test]
    fn clear_range_is_half_open() {
        let mut extras = CellExtras::new();
        for col in 0..5 {
            extras.push_combining(CellCoord::new(0, col), '\u{0301}');
        }
        extras.clear_range(0, 1, 3);
        assert!(extras.get(CellCoord::new(0, 0)).is_some());
        assert!(extras.get(CellCoord::new(0, 1)).is_none());
        assert!(extras.get(CellCoord::new(0, 2)).is_none());
        assert!(extras.get(CellCoord::new(0, 3)).is_some());
    }

    #[test]
    fn shift_up_drops_rows_leaving_band() {
        let mut extras = CellExtras::new();
        extras.push_combining(CellCoord::new(0, 0), '\u{0301}');
        extras.push_combining(CellCoord::new(5, 1), '\u{0301}');
        extras.shift_rows(0, 23, -1);
        // Row 0 shifted to -1: dropped. Row 5 moved to 4.
        assert!(extras.get(CellCoord::new(0, 0)).is_none());
        assert!(extras.get(CellCoord::new(4, 1)).is_some());
        assert!(extras.get(CellCoord::new(5, 1)).is_none());
    }

    #[test]
    fn shift_respects_band() {
        let mut extras = CellExtras::new();
        extras.push_combining(CellCoord::new(0, 0), '\u{0301}');
        extras.push_combining(CellCoord::new(10, 0), '\u{0301}');
        // Shift only rows 5..=15 down by 2.
        extras.shift_rows(5, 15, 2);
        assert!(extras.get(CellCoord::new(0, 0)).is_some());
        assert!(extras.get(CellCoord::new(12, 0)).is_some());
    }
}
