//! Rows over page-backed cell spans.
//!
//! A `Row` is a span handle plus metadata; every cell access goes through
//! the [`PageStore`] that owns the span. The write primitives maintain the
//! wide-pair invariant: overwriting either half of a lead/spacer pair
//! clears the other half, so a spacer never survives without its lead.

use bitflags::bitflags;

use super::cell::Cell;
use super::page::{PageId, PageStore, Span};
use super::style::StyleId;

bitflags! {
    /// Per-row metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RowFlags: u16 {
        /// This row's content continues onto the next row (soft wrap).
        const WRAPPED = 1 << 0;
        /// OSC 133;A: a shell prompt starts on this row.
        const PROMPT_START = 1 << 1;
        /// OSC 133;B: user input starts on this row.
        const PROMPT_INPUT = 1 << 2;
        /// OSC 133;C: command output starts on this row.
        const PROMPT_OUTPUT = 1 << 3;
        /// OSC 133;D: a command ended on this row.
        const PROMPT_END = 1 << 4;
    }
}

/// One grid row.
#[derive(Debug, Clone, Copy)]
pub struct Row {
    span: Span,
    cols: u16,
    flags: RowFlags,
}

impl Row {
    /// Allocate a cleared row of `cols` cells.
    #[must_use]
    pub fn new(cols: u16, pages: &mut PageStore) -> Self {
        let span = pages.alloc_row(cols);
        Self {
            span,
            cols: span.len() as u16,
            flags: RowFlags::empty(),
        }
    }

    /// Column count.
    #[must_use]
    #[inline]
    pub fn len(&self) -> u16 {
        self.cols
    }

    /// True for a zero-width row (never built by the grid).
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cols == 0
    }

    /// The page backing this row.
    #[must_use]
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.span.page()
    }

    /// The backing span.
    #[must_use]
    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Soft-wrap flag: content continues onto the next row.
    #[must_use]
    #[inline]
    pub fn is_wrapped(&self) -> bool {
        self.flags.contains(RowFlags::WRAPPED)
    }

    /// Set or clear the soft-wrap flag.
    #[inline]
    pub fn set_wrapped(&mut self, wrapped: bool) {
        self.flags.set(RowFlags::WRAPPED, wrapped);
    }

    /// Row metadata flags.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> RowFlags {
        self.flags
    }

    /// Insert metadata flags.
    #[inline]
    pub fn insert_flags(&mut self, flags: RowFlags) {
        self.flags.insert(flags);
    }

    /// Replace metadata flags.
    #[inline]
    pub fn set_flags(&mut self, flags: RowFlags) {
        self.flags = flags;
    }

    /// Read one cell.
    #[must_use]
    #[inline]
    pub fn get(&self, pages: &PageStore, col: u16) -> Option<Cell> {
        pages.cells(self.span).get(usize::from(col)).copied()
    }

    /// The whole row as a slice.
    #[must_use]
    #[inline]
    pub fn cells<'a>(&self, pages: &'a PageStore) -> &'a [Cell] {
        pages.cells(self.span)
    }

    /// Overwrite one cell without wide-pair fixup. Prefer
    /// [`write_cell`](Self::write_cell) unless the caller maintains the
    /// invariant itself (reflow does).
    #[inline]
    pub fn set(&mut self, pages: &mut PageStore, col: u16, cell: Cell) {
        if let Some(slot) = pages.cells_mut(self.span).get_mut(usize::from(col)) {
            *slot = cell;
        }
    }

    /// Overwrite one cell, dissolving any wide pair it overlaps.
    pub fn write_cell(&mut self, pages: &mut PageStore, col: u16, cell: Cell) {
        self.fixup_wide_overlap(pages, col, col.saturating_add(1));
        self.set(pages, col, cell);
    }

    /// Write a single-width character.
    #[inline]
    pub fn write_char(&mut self, pages: &mut PageStore, col: u16, c: char, style: StyleId) {
        self.write_cell(pages, col, Cell::new(c, style));
    }

    /// Write a wide character pair at `col`. Returns the columns consumed
    /// (2, or 0 when the pair does not fit).
    pub fn write_wide_char(&mut self, pages: &mut PageStore, col: u16, c: char, style: StyleId) -> u16 {
        if u32::from(col) + 1 >= u32::from(self.cols) {
            return 0;
        }
        self.fixup_wide_overlap(pages, col, col + 2);
        self.set(pages, col, Cell::wide_lead(c, style));
        self.set(pages, col + 1, Cell::wide_spacer(style));
        2
    }

    /// Write a run of printable ASCII starting at `col`, clipped to the row.
    /// Returns the number of bytes written.
    pub fn write_ascii_run(
        &mut self,
        pages: &mut PageStore,
        col: u16,
        bytes: &[u8],
        style: StyleId,
    ) -> usize {
        if col >= self.cols {
            return 0;
        }
        let n = bytes.len().min(usize::from(self.cols - col));
        self.fixup_wide_overlap(pages, col, col + n as u16);
        let cells = pages.cells_mut(self.span);
        for (i, &b) in bytes[..n].iter().enumerate() {
            cells[usize::from(col) + i] = Cell::from_ascii(b, style);
        }
        n
    }

    /// Clear the whole row to empty cells and drop all metadata flags.
    pub fn clear(&mut self, pages: &mut PageStore) {
        pages.cells_mut(self.span).fill(Cell::EMPTY);
        self.flags = RowFlags::empty();
    }

    /// Clear `[start, end)` to blanks carrying `style` (erase fills keep the
    /// pen's background). Dissolves wide pairs crossing the boundary.
    pub fn clear_range(&mut self, pages: &mut PageStore, start: u16, end: u16, style: StyleId) {
        let end = end.min(self.cols);
        if start >= end {
            return;
        }
        self.fixup_wide_overlap(pages, start, end);
        pages.cells_mut(self.span)[usize::from(start)..usize::from(end)]
            .fill(Cell::blank(style));
    }

    /// Insert `count` blank cells at `col`, shifting the rest right.
    pub fn insert_blanks(&mut self, pages: &mut PageStore, col: u16, count: u16, style: StyleId) {
        if col >= self.cols || count == 0 {
            return;
        }
        let count = count.min(self.cols - col);
        self.fixup_wide_overlap(pages, col, col.saturating_add(1));
        let cells = pages.cells_mut(self.span);
        let col = usize::from(col);
        let count = usize::from(count);
        cells.copy_within(col..cells.len() - count, col + count);
        cells[col..col + count].fill(Cell::blank(style));
        self.fixup_trailing_wide(pages);
    }

    /// Delete `count` cells at `col`, shifting the rest left and filling the
    /// tail with blanks.
    pub fn delete_chars(&mut self, pages: &mut PageStore, col: u16, count: u16, style: StyleId) {
        if col >= self.cols || count == 0 {
            return;
        }
        let count = count.min(self.cols - col);
        self.fixup_wide_overlap(pages, col, col + count);
        let cells = pages.cells_mut(self.span);
        let col = usize::from(col);
        let count = usize::from(count);
        cells.copy_within(col + count.., col);
        let len = cells.len();
        cells[len - count..].fill(Cell::blank(style));
        // The shift may have moved a spacer to `col` with its lead deleted.
        if let Some(cell) = cells.get(col) {
            if cell.is_wide_spacer() {
                cells[col] = Cell::blank(style);
            }
        }
    }

    /// Copy cell content and flags from another row (clipped to the shorter
    /// of the two).
    pub fn copy_from(&mut self, pages: &mut PageStore, src: &Row) {
        pages.copy_span(self.span, src.span);
        self.flags = src.flags;
    }

    /// Clone the row's cells into an owned vector.
    #[must_use]
    pub fn extract_cells(&self, pages: &PageStore) -> Vec<Cell> {
        pages.cells(self.span).to_vec()
    }

    /// Number of cells up to and including the last non-empty one.
    #[must_use]
    pub fn content_len(&self, pages: &PageStore) -> u16 {
        let cells = pages.cells(self.span);
        cells
            .iter()
            .rposition(|c| !c.is_empty())
            .map_or(0, |i| i as u16 + 1)
    }

    /// Dissolve wide pairs that straddle the boundaries of `[start, end)`:
    /// a spacer at `start` loses its lead (at `start - 1`), and a lead at
    /// `end - 1` loses its spacer (at `end`). The orphaned halves become
    /// blanks.
    pub fn fixup_wide_overlap(&mut self, pages: &mut PageStore, start: u16, end: u16) {
        let cells = pages.cells_mut(self.span);
        let len = cells.len();
        let start = usize::from(start);
        let end = usize::from(end).min(len);
        if start >= len || start >= end {
            return;
        }
        if start > 0 && cells[start].is_wide_spacer() {
            cells[start - 1] = Cell::EMPTY;
            cells[start] = Cell::EMPTY;
        }
        if end < len && cells[end].is_wide_spacer() && cells[end - 1].is_wide() {
            cells[end - 1] = Cell::EMPTY;
            cells[end] = Cell::EMPTY;
        }
    }

    /// Clear a wide lead stranded in the last column (its spacer was pushed
    /// out by an insert).
    fn fixup_trailing_wide(&mut self, pages: &mut PageStore) {
        let cells = pages.cells_mut(self.span);
        if let Some(last) = cells.last_mut() {
            if last.is_wide() {
                *last = Cell::EMPTY;
            }
        }
    }

    /// Row text with spacer cells skipped (no extras resolution; the grid
    /// layers combining marks on top).
    #[must_use]
    pub fn text(&self, pages: &PageStore) -> String {
        let cells = pages.cells(self.span);
        let mut s = String::with_capacity(cells.len());
        for cell in cells {
            if cell.is_wide_spacer() {
                continue;
            }
            s.push(cell.char());
        }
        s
    }
}
