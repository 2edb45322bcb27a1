//! Pin-anchored text selection.
//!
//! A selection stores [`Pin`]s, never raw coordinates, so an intervening
//! scroll does not desynchronize the highlighted range: the pins track the
//! rows' absolute numbers, and the page generation check catches eviction,
//! reflow, and reset. A stale selection extracts nothing rather than the
//! wrong text.
//!
//! Any column reflow invalidates every selection by construction: the
//! reflow rebuilds the page store, so the generation check fails. Holders
//! drop the selection and let the user re-select against the new layout.

use crate::grid::pin::{Pin, PinnedRange};
use crate::grid::{Cell, Grid};

/// How a selection interprets its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    /// Character range in reading order (click + drag).
    #[default]
    Linear,
    /// Rectangular column range per row (block selection).
    Block,
    /// Endpoints expand to word boundaries (double-click).
    Semantic,
    /// Endpoints expand to whole logical lines (triple-click).
    Line,
}

/// A selection between two pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    anchor: Pin,
    head: Pin,
    kind: SelectionKind,
}

/// Endpoint bounds after kind-specific expansion, in storage order.
struct ResolvedBounds {
    start_row: u64,
    start_col: u16,
    end_row: u64,
    end_col: u16,
}

impl Selection {
    /// Start a selection at `anchor`.
    #[must_use]
    pub fn new(anchor: Pin, kind: SelectionKind) -> Self {
        Self {
            anchor,
            head: anchor,
            kind,
        }
    }

    /// The fixed end.
    #[must_use]
    #[inline]
    pub fn anchor(&self) -> Pin {
        self.anchor
    }

    /// The moving end.
    #[must_use]
    #[inline]
    pub fn head(&self) -> Pin {
        self.head
    }

    /// The selection kind.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> SelectionKind {
        self.kind
    }

    /// Move the head (drag).
    pub fn extend(&mut self, head: Pin) {
        self.head = head;
    }

    /// Endpoints in storage order.
    #[must_use]
    pub fn range(&self) -> PinnedRange {
        PinnedRange::ordered(self.anchor, self.head)
    }

    /// True while both pins pass their generation and retention checks.
    #[must_use]
    pub fn is_valid(&self, grid: &Grid) -> bool {
        grid.is_range_valid(&self.range())
    }

    /// True when the cell at `(absolute_row, col)` falls inside the
    /// selection (for renderer highlighting).
    #[must_use]
    pub fn contains(&self, grid: &Grid, absolute_row: u64, col: u16, separators: &str) -> bool {
        let Some(bounds) = self.resolve_bounds(grid, separators) else {
            return false;
        };
        if absolute_row < bounds.start_row || absolute_row > bounds.end_row {
            return false;
        }
        match self.kind {
            SelectionKind::Block => {
                let (lo, hi) = ordered_cols(bounds.start_col, bounds.end_col);
                col >= lo && col <= hi
            }
            _ => {
                (absolute_row > bounds.start_row || col >= bounds.start_col)
                    && (absolute_row < bounds.end_row || col <= bounds.end_col)
            }
        }
    }

    /// Extract the selected text.
    ///
    /// Linear (and the expanded kinds) insert a newline at each unwrapped
    /// row end and nothing at soft wraps; block extracts a fixed column
    /// range per row. Wide spacer cells never contribute characters.
    /// Returns `None` when the selection is stale.
    #[must_use]
    pub fn text(&self, grid: &Grid, separators: &str) -> Option<String> {
        let bounds = self.resolve_bounds(grid, separators)?;
        match self.kind {
            SelectionKind::Block => Some(self.block_text(grid, &bounds)),
            _ => Some(self.linear_text(grid, &bounds)),
        }
    }

    fn resolve_bounds(&self, grid: &Grid, separators: &str) -> Option<ResolvedBounds> {
        if !self.is_valid(grid) {
            return None;
        }
        let range = self.range();
        let mut bounds = ResolvedBounds {
            start_row: range.start.absolute_row(),
            start_col: range.start.col(),
            end_row: range.end.absolute_row(),
            end_col: range.end.col(),
        };

        match self.kind {
            SelectionKind::Linear | SelectionKind::Block => {}
            SelectionKind::Semantic => {
                if let Some(row) = grid.row_at_absolute(bounds.start_row) {
                    let cells = row.cells(grid.pages());
                    bounds.start_col = word_start(cells, bounds.start_col, separators);
                }
                if let Some(row) = grid.row_at_absolute(bounds.end_row) {
                    let cells = row.cells(grid.pages());
                    bounds.end_col = word_end(cells, bounds.end_col, separators);
                }
            }
            SelectionKind::Line => {
                while bounds.start_row > grid.first_retained_absolute() {
                    match grid.row_at_absolute(bounds.start_row - 1) {
                        Some(prev) if prev.is_wrapped() => bounds.start_row -= 1,
                        _ => break,
                    }
                }
                bounds.start_col = 0;
                loop {
                    match grid.row_at_absolute(bounds.end_row) {
                        Some(row) if row.is_wrapped() => bounds.end_row += 1,
                        _ => break,
                    }
                }
                bounds.end_row = bounds
                    .end_row
                    .min(grid.first_retained_absolute() + grid.total_lines() as u64 - 1);
                bounds.end_col = grid.cols().saturating_sub(1);
            }
        }
        Some(bounds)
    }

    fn linear_text(&self, grid: &Grid, bounds: &ResolvedBounds) -> String {
        let mut out = String::new();
        for absolute in bounds.start_row..=bounds.end_row {
            let Some(row) = grid.row_at_absolute(absolute) else {
                continue;
            };
            let cells = row.cells(grid.pages());
            let from = if absolute == bounds.start_row {
                usize::from(bounds.start_col)
            } else {
                0
            };
            let content = usize::from(row.content_len(grid.pages()));
            let to = if absolute == bounds.end_row {
                (usize::from(bounds.end_col) + 1).min(cells.len()).min(content)
            } else {
                content
            };
            push_cells(&mut out, grid, absolute, cells, from, to);
            if absolute < bounds.end_row && !row.is_wrapped() {
                out.push('\n');
            }
        }
        out
    }

    fn block_text(&self, grid: &Grid, bounds: &ResolvedBounds) -> String {
        let (lo, hi) = ordered_cols(bounds.start_col, bounds.end_col);
        let mut out = String::new();
        for absolute in bounds.start_row..=bounds.end_row {
            let Some(row) = grid.row_at_absolute(absolute) else {
                continue;
            };
            let cells = row.cells(grid.pages());
            let from = usize::from(lo);
            let to = (usize::from(hi) + 1).min(cells.len());
            let before = out.len();
            push_cells(&mut out, grid, absolute, cells, from, to);
            // Per-row trim keeps block copies rectangular without trailing
            // blanks.
            let trimmed = out[before..].trim_end().len();
            out.truncate(before + trimmed);
            if absolute < bounds.end_row {
                out.push('\n');
            }
        }
        out
    }
}

/// Append the characters of `cells[from..to]`, skipping wide spacers and
/// resolving combining marks for rows still on screen.
fn push_cells(out: &mut String, grid: &Grid, absolute: u64, cells: &[Cell], from: usize, to: usize) {
    let visible_row = grid.visible_row_of_absolute(absolute);
    for (col, cell) in cells.iter().enumerate().take(to).skip(from) {
        if cell.is_wide_spacer() {
            continue;
        }
        if cell.is_complex() {
            if let Some(row) = visible_row {
                if let Some(text) = grid.cell_text(row, col as u16) {
                    out.push_str(&text);
                    continue;
                }
            }
        }
        out.push(cell.char());
    }
}

fn ordered_cols(a: u16, b: u16) -> (u16, u16) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn is_separator(cell: &Cell, separators: &str) -> bool {
    let c = cell.char();
    cell.is_empty() || separators.contains(c)
}

/// Walk left from `col` over cells of the same class (word or separator).
fn word_start(cells: &[Cell], col: u16, separators: &str) -> u16 {
    let col = usize::from(col).min(cells.len().saturating_sub(1));
    let class = is_separator(&cells[col], separators);
    let mut start = col;
    while start > 0 && is_separator(&cells[start - 1], separators) == class {
        start -= 1;
    }
    start as u16
}

/// Walk right from `col` over cells of the same class.
fn word_end(cells: &[Cell], col: u16, separators: &str) -> u16 {
    if cells.is_empty() {
        return 0;
    }
    let col = usize::from(col).min(cells.len() - 1);
    let class = is_separator(&cells[col], separators);
    let mut end = col;
    while end + 1 < cells.len() && is_separator(&cells[end + 1], separators) == class {
        end += 1;
    }
    end as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_WORD_SEPARATORS;
    use crate::grid::style::StyleId;

    fn fill(grid: &mut Grid, text: &str) {
        for c in text.chars() {
            grid.print_char(c, StyleId::DEFAULT, true);
        }
    }

    fn line(grid: &mut Grid, text: &str) {
        fill(grid, text);
        grid.carriage_return();
        grid.line_feed();
    }

    fn select(grid: &Grid, a: (u16, u16), b: (u16, u16), kind: SelectionKind) -> Selection {
        let mut sel = Selection::new(grid.create_pin(a.0, a.1), kind);
        sel.extend(grid.create_pin(b.0, b.1));
        sel
    }

    #[test]
    fn linear_within_one_row() {
        let mut grid = Grid::new(4, 20);
        fill(&mut grid, "hello world");
        let sel = select(&grid, (0, 6), (0, 10), SelectionKind::Linear);
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "world");
    }

    #[test]
    fn linear_reversed_ends_normalize() {
        let mut grid = Grid::new(4, 20);
        fill(&mut grid, "hello world");
        let sel = select(&grid, (0, 10), (0, 6), SelectionKind::Linear);
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "world");
    }

    #[test]
    fn linear_inserts_newline_at_hard_break() {
        let mut grid = Grid::new(4, 20);
        line(&mut grid, "one");
        fill(&mut grid, "two");
        let sel = select(&grid, (0, 0), (1, 2), SelectionKind::Linear);
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "one\ntwo");
    }

    #[test]
    fn linear_omits_newline_at_soft_wrap() {
        let mut grid = Grid::new(4, 5);
        fill(&mut grid, "abcdefgh");
        let sel = select(&grid, (0, 0), (1, 2), SelectionKind::Linear);
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "abcdefgh");
    }

    #[test]
    fn wide_spacer_excluded_from_text() {
        let mut grid = Grid::new(4, 10);
        fill(&mut grid, "a");
        grid.print_wide_char('漢', StyleId::DEFAULT, true);
        fill(&mut grid, "b");
        let sel = select(&grid, (0, 0), (0, 3), SelectionKind::Linear);
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "a漢b");
    }

    #[test]
    fn block_extracts_column_range() {
        let mut grid = Grid::new(4, 10);
        for (r, t) in ["abcdef", "ghijkl", "mnopqr"].iter().enumerate() {
            grid.set_cursor(r as u16, 0);
            fill(&mut grid, t);
        }
        let sel = select(&grid, (0, 1), (2, 3), SelectionKind::Block);
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "bcd\nhij\nnop");
    }

    #[test]
    fn semantic_expands_to_word_boundaries() {
        let mut grid = Grid::new(4, 30);
        fill(&mut grid, "alpha beta-gamma delta");
        let sel = select(&grid, (0, 8), (0, 8), SelectionKind::Semantic);
        // "beta-gamma" (hyphen is not in the default separator set).
        assert_eq!(
            sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(),
            "beta-gamma"
        );
    }

    #[test]
    fn semantic_on_separator_selects_separator_run() {
        let mut grid = Grid::new(4, 30);
        fill(&mut grid, "a   b");
        let sel = select(&grid, (0, 2), (0, 2), SelectionKind::Semantic);
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "   ");
    }

    #[test]
    fn line_covers_whole_logical_line() {
        let mut grid = Grid::new(4, 5);
        fill(&mut grid, "abcdefgh");
        let sel = select(&grid, (1, 1), (1, 1), SelectionKind::Line);
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "abcdefgh");
    }

    #[test]
    fn selection_survives_scroll() {
        let mut grid = Grid::new(3, 20);
        fill(&mut grid, "keep this");
        let sel = select(&grid, (0, 0), (0, 8), SelectionKind::Linear);
        grid.scroll_up(2);
        // The pinned row is in scrollback now; extraction still works.
        assert!(sel.is_valid(&grid));
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS).unwrap(), "keep this");
    }

    #[test]
    fn selection_dies_on_eviction() {
        let mut grid = Grid::with_scrollback(2, 10, 1);
        fill(&mut grid, "gone");
        let sel = select(&grid, (0, 0), (0, 3), SelectionKind::Linear);
        grid.scroll_up(4);
        assert!(!sel.is_valid(&grid));
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS), None);
    }

    #[test]
    fn selection_dies_on_reflow() {
        let mut grid = Grid::with_scrollback(4, 10, 100);
        fill(&mut grid, "some text");
        let sel = select(&grid, (0, 0), (0, 3), SelectionKind::Linear);
        grid.resize(4, 8);
        assert!(!sel.is_valid(&grid));
        assert_eq!(sel.text(&grid, DEFAULT_WORD_SEPARATORS), None);
    }

    #[test]
    fn contains_matches_linear_shape() {
        let mut grid = Grid::new(4, 10);
        line(&mut grid, "abcdef");
        fill(&mut grid, "ghijkl");
        let sel = select(&grid, (0, 3), (1, 2), SelectionKind::Linear);
        let abs0 = grid.absolute_of_visible(0);
        let abs1 = grid.absolute_of_visible(1);
        let sep = DEFAULT_WORD_SEPARATORS;
        assert!(!sel.contains(&grid, abs0, 2, sep));
        assert!(sel.contains(&grid, abs0, 3, sep));
        assert!(sel.contains(&grid, abs0, 9, sep));
        assert!(sel.contains(&grid, abs1, 0, sep));
        assert!(sel.contains(&grid, abs1, 2, sep));
        assert!(!sel.contains(&grid, abs1, 3, sep));
    }
}
