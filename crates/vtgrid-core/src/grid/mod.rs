//! Paged screen grid with O(1) scrolling.
//!
//! ## Design
//!
//! - 8-byte packed cells in pooled 64 KiB pages ([`page`])
//! - Ring-buffer row storage: a scroll is an index rotation, not a copy
//! - Scrollback is the ring prefix above the visible window; eviction at the
//!   configured limit reuses the oldest row's span and bumps its page
//!   generation so stale [`Pin`]s are detected
//! - Per-row damage tracking for the renderer ([`damage`])
//! - Cursor with a deferred-autowrap `pending_wrap` flag: the cursor never
//!   leaves `0..cols`, and printing at the right margin arms a flag instead
//!   of wrapping eagerly
//! - Column resize reflows logical lines across scrollback and the visible
//!   region as one sequence ([`Grid::resize`])
//!
//! Mutations address the live screen (the bottom `rows` of the ring);
//! the read API honors [`Grid::display_offset`] so a renderer can show
//! history while output continues below.

pub mod cell;
pub mod damage;
pub mod extra;
pub mod page;
pub mod pin;
pub mod row;
pub mod style;

pub use cell::{Cell, CellFlags};
pub use damage::Damage;
pub use extra::{CellCoord, CellExtra, CellExtras};
pub use page::{PageId, PageStore, PoolStats, Span, PAGE_CELLS, PAGE_SIZE};
pub use pin::{Generation, Pin, PinnedRange};
pub use row::{Row, RowFlags};
pub use style::{Color, Rgb, Style, StyleAttrs, StyleId, StyleTable, StyleTableStats};

/// Cursor position plus the deferred-autowrap state.
///
/// Invariant: `row < rows` and `col < cols` at all times. Printing in the
/// last column with autowrap on sets `pending_wrap` instead of moving the
/// cursor; the wrap happens when the next printable character arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Row, 0-indexed from the top of the visible area.
    pub row: u16,
    /// Column, 0-indexed.
    pub col: u16,
    /// The next printable character wraps to the following row first.
    pub pending_wrap: bool,
}

impl Cursor {
    /// Create a cursor at the given position.
    #[must_use]
    #[inline]
    pub const fn new(row: u16, col: u16) -> Self {
        Self {
            row,
            col,
            pending_wrap: false,
        }
    }
}

/// Scroll region bounds (top and bottom rows, inclusive, 0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    /// Top row of the region.
    pub top: u16,
    /// Bottom row of the region.
    pub bottom: u16,
}

impl ScrollRegion {
    /// A region covering every visible row.
    #[must_use]
    #[inline]
    pub fn full(rows: u16) -> Self {
        Self {
            top: 0,
            bottom: rows.saturating_sub(1),
        }
    }

    /// True when the region covers the whole screen.
    #[must_use]
    #[inline]
    pub fn is_full(&self, rows: u16) -> bool {
        self.top == 0 && self.bottom == rows.saturating_sub(1)
    }

    /// True when `row` lies inside the region.
    #[must_use]
    #[inline]
    pub fn contains(&self, row: u16) -> bool {
        row >= self.top && row <= self.bottom
    }
}

/// Default scrollback limit in rows.
pub const DEFAULT_SCROLLBACK: usize = 10_000;

/// The screen buffer: rows of cells, cursor, scrollback, and damage.
///
/// One `Grid` is one screen; [`Terminal`](crate::terminal::Terminal) owns a
/// primary grid (with scrollback) and an alternate grid (without).
#[derive(Debug)]
pub struct Grid {
    pages: PageStore,
    /// Ring buffer of all retained rows, oldest at `ring_head`.
    rows: Vec<Row>,
    visible_rows: u16,
    cols: u16,
    /// Rows of scrollback retained beyond the visible region.
    max_scrollback: usize,
    /// Retained rows (scrollback + visible). Always equals `rows.len()`.
    total_lines: usize,
    /// 0 = live view; >0 = scrolled back into history by this many rows.
    display_offset: usize,
    /// Ring index of the oldest retained row. Non-zero only at capacity.
    ring_head: usize,
    cursor: Cursor,
    scroll_region: ScrollRegion,
    tab_stops: Vec<bool>,
    damage: Damage,
    extras: CellExtras,
    styles: StyleTable,
    /// Total rows ever created, including evicted ones. The absolute number
    /// of the bottom visible row is `absolute_row_counter - 1`.
    absolute_row_counter: u64,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl Grid {
    /// Create a grid with the default scrollback limit.
    #[must_use]
    pub fn new(rows: u16, cols: u16) -> Self {
        Self::with_scrollback(rows, cols, DEFAULT_SCROLLBACK)
    }

    /// Create a grid with a custom scrollback limit (0 for none, as the
    /// alternate screen uses).
    #[must_use]
    pub fn with_scrollback(rows: u16, cols: u16, max_scrollback: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.clamp(1, PAGE_CELLS as u16);

        let bytes_per_row = usize::from(cols) * std::mem::size_of::<Cell>();
        let pages_needed = (usize::from(rows) * bytes_per_row / PAGE_SIZE).max(1) + 1;
        let mut pages = PageStore::with_capacity(pages_needed);

        let mut row_storage = Vec::with_capacity(usize::from(rows));
        for _ in 0..rows {
            row_storage.push(Row::new(cols, &mut pages));
        }

        Self {
            pages,
            rows: row_storage,
            visible_rows: rows,
            cols,
            max_scrollback,
            total_lines: usize::from(rows),
            display_offset: 0,
            ring_head: 0,
            cursor: Cursor::default(),
            scroll_region: ScrollRegion::full(rows),
            tab_stops: Self::default_tab_stops(cols),
            damage: Damage::new(rows),
            extras: CellExtras::new(),
            styles: StyleTable::new(),
            absolute_row_counter: u64::from(rows),
        }
    }

    fn default_tab_stops(cols: u16) -> Vec<bool> {
        (0..cols).map(|c| c > 0 && c % 8 == 0).collect()
    }

    // ------------------------------------------------------------------
    // Dimensions and state accessors
    // ------------------------------------------------------------------

    /// Visible row count.
    #[must_use]
    #[inline]
    pub fn rows(&self) -> u16 {
        self.visible_rows
    }

    /// Column count.
    #[must_use]
    #[inline]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Retained rows: scrollback plus visible.
    #[must_use]
    #[inline]
    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Rows of scrollback currently retained.
    #[must_use]
    #[inline]
    pub fn scrollback_lines(&self) -> usize {
        self.total_lines - usize::from(self.visible_rows)
    }

    /// Configured scrollback limit.
    #[must_use]
    #[inline]
    pub fn max_scrollback(&self) -> usize {
        self.max_scrollback
    }

    /// Current view offset into history (0 = live).
    #[must_use]
    #[inline]
    pub fn display_offset(&self) -> usize {
        self.display_offset
    }

    /// The cursor.
    #[must_use]
    #[inline]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Cursor row.
    #[must_use]
    #[inline]
    pub fn cursor_row(&self) -> u16 {
        self.cursor.row
    }

    /// Cursor column.
    #[must_use]
    #[inline]
    pub fn cursor_col(&self) -> u16 {
        self.cursor.col
    }

    /// Deferred-autowrap flag.
    #[must_use]
    #[inline]
    pub fn pending_wrap(&self) -> bool {
        self.cursor.pending_wrap
    }

    /// The scroll region (DECSTBM).
    #[must_use]
    #[inline]
    pub fn scroll_region(&self) -> ScrollRegion {
        self.scroll_region
    }

    /// Set the scroll region. An empty or out-of-bounds region resets to
    /// full screen, matching DECSTBM.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        if top < bottom && bottom < self.visible_rows {
            self.scroll_region = ScrollRegion { top, bottom };
        } else {
            self.scroll_region = ScrollRegion::full(self.visible_rows);
        }
    }

    /// Reset the scroll region to the full screen.
    #[inline]
    pub fn reset_scroll_region(&mut self) {
        self.scroll_region = ScrollRegion::full(self.visible_rows);
    }

    /// Damage state for the renderer.
    #[must_use]
    #[inline]
    pub fn damage(&self) -> &Damage {
        &self.damage
    }

    /// Clear damage after a render pass.
    pub fn clear_damage(&mut self) {
        self.damage.reset(self.visible_rows);
    }

    /// Page storage (read access for pin holders and selection walks).
    #[must_use]
    #[inline]
    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    /// Cell extras (hyperlinks, combining marks) for the visible region.
    #[must_use]
    #[inline]
    pub fn extras(&self) -> &CellExtras {
        &self.extras
    }

    /// Mutable cell extras.
    #[inline]
    pub fn extras_mut(&mut self) -> &mut CellExtras {
        &mut self.extras
    }

    /// The style interning table.
    #[must_use]
    #[inline]
    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    /// Intern a style, returning its id.
    #[inline]
    pub fn intern_style(&mut self, style: Style) -> StyleId {
        self.styles.intern(style)
    }

    /// Resolve a cell's style id.
    #[must_use]
    #[inline]
    pub fn resolve_style(&self, id: StyleId) -> Style {
        self.styles.resolve(id)
    }

    /// Memory held by pages, rows, and extras.
    #[must_use]
    pub fn memory_used(&self) -> usize {
        self.pages.total_memory()
            + self.rows.capacity() * std::mem::size_of::<Row>()
            + self.extras.memory_used()
    }

    // ------------------------------------------------------------------
    // Ring indexing
    // ------------------------------------------------------------------

    /// Ring index of a live visible row (ignores the display offset; all
    /// mutations address the live screen).
    #[inline]
    fn live_index(&self, visible_row: u16) -> usize {
        let above = self.scrollback_lines() + usize::from(visible_row);
        (self.ring_head + above) % self.rows.len()
    }

    /// Ring index of a viewed visible row (honors the display offset).
    #[inline]
    fn view_index(&self, visible_row: u16) -> usize {
        let above = self.scrollback_lines() + usize::from(visible_row) - self.display_offset;
        (self.ring_head + above) % self.rows.len()
    }

    /// Rotate the ring so the oldest row sits at index 0. Rare operations
    /// that restructure the buffer (resize, limit changes) call this first
    /// so they can treat `rows` as a plain ordered vector.
    fn normalize_ring(&mut self) {
        if self.ring_head != 0 {
            self.rows.rotate_left(self.ring_head);
            self.ring_head = 0;
        }
    }

    // ------------------------------------------------------------------
    // Row and cell access
    // ------------------------------------------------------------------

    /// A viewed row handle (honors the display offset).
    #[must_use]
    pub fn row(&self, visible_row: u16) -> Option<Row> {
        if visible_row >= self.visible_rows {
            return None;
        }
        self.rows.get(self.view_index(visible_row)).copied()
    }

    /// The cells of a viewed row.
    #[must_use]
    pub fn row_cells(&self, visible_row: u16) -> Option<&[Cell]> {
        let row = self.row(visible_row)?;
        Some(self.pages.cells(row.span()))
    }

    /// One viewed cell.
    #[must_use]
    pub fn cell(&self, visible_row: u16, col: u16) -> Option<Cell> {
        self.row(visible_row)?.get(&self.pages, col)
    }

    /// The text of a cell, resolving combining marks from the extras table.
    /// Spacer cells yield an empty string.
    #[must_use]
    pub fn cell_text(&self, visible_row: u16, col: u16) -> Option<String> {
        let cell = self.cell(visible_row, col)?;
        if cell.is_wide_spacer() {
            return Some(String::new());
        }
        let mut s = String::new();
        s.push(cell.char());
        if cell.is_complex() {
            if let Some(extra) = self.extras.get(CellCoord::new(visible_row, col)) {
                s.extend(extra.combining.iter());
            }
        }
        Some(s)
    }

    /// A viewed row's text with spacers skipped and combining marks resolved.
    #[must_use]
    pub fn row_text(&self, visible_row: u16) -> Option<String> {
        let row = self.row(visible_row)?;
        let cells = self.pages.cells(row.span());
        let mut s = String::with_capacity(cells.len());
        for (col, cell) in cells.iter().enumerate() {
            if cell.is_wide_spacer() {
                continue;
            }
            s.push(cell.char());
            if cell.is_complex() {
                if let Some(extra) = self.extras.get(CellCoord::new(visible_row, col as u16)) {
                    s.extend(extra.combining.iter());
                }
            }
        }
        Some(s)
    }

    /// Every viewed row's text, newline-separated.
    #[must_use]
    pub fn visible_content(&self) -> String {
        let mut s = String::new();
        for row in 0..self.visible_rows {
            if let Some(text) = self.row_text(row) {
                s.push_str(&text);
            }
            s.push('\n');
        }
        s
    }

    /// Text of a scrollback row (0 = oldest retained).
    #[must_use]
    pub fn history_row_text(&self, idx: usize) -> Option<String> {
        if idx >= self.scrollback_lines() {
            return None;
        }
        let row = self.rows[(self.ring_head + idx) % self.rows.len()];
        Some(row.text(&self.pages))
    }

    // ------------------------------------------------------------------
    // Pins
    // ------------------------------------------------------------------

    /// Absolute row number of the oldest retained row.
    #[must_use]
    #[inline]
    pub fn first_retained_absolute(&self) -> u64 {
        self.absolute_row_counter - self.total_lines as u64
    }

    /// Absolute row number of a live visible row.
    #[must_use]
    #[inline]
    pub fn absolute_of_visible(&self, visible_row: u16) -> u64 {
        self.absolute_row_counter - u64::from(self.visible_rows) + u64::from(visible_row)
    }

    /// Mint a pin at a live visible position.
    #[must_use]
    pub fn create_pin(&self, visible_row: u16, col: u16) -> Pin {
        let visible_row = visible_row.min(self.visible_rows.saturating_sub(1));
        let row = self.rows[self.live_index(visible_row)];
        let page = row.page_id();
        Pin::new(
            page,
            self.absolute_of_visible(visible_row),
            col.min(self.cols.saturating_sub(1)),
            self.pages.generation(page),
        )
    }

    /// Mint a pin at the cursor.
    #[must_use]
    pub fn create_cursor_pin(&self) -> Pin {
        self.create_pin(self.cursor.row, self.cursor.col)
    }

    /// True while the pinned row is retained and its page has not been
    /// structurally mutated since the pin was minted.
    #[must_use]
    pub fn is_pin_valid(&self, pin: &Pin) -> bool {
        pin.generation() == self.pages.generation(pin.page())
            && pin.absolute_row() >= self.first_retained_absolute()
            && pin.absolute_row() < self.absolute_row_counter
    }

    /// True while both ends of a range are valid.
    #[must_use]
    pub fn is_range_valid(&self, range: &PinnedRange) -> bool {
        self.is_pin_valid(&range.start) && self.is_pin_valid(&range.end)
    }

    /// Resolve a pin to live visible coordinates.
    ///
    /// `None` when the pin is stale, evicted, or scrolled out of the visible
    /// region (it may still be readable via [`row_at_absolute`]).
    ///
    /// [`row_at_absolute`]: Self::row_at_absolute
    #[must_use]
    pub fn resolve_pin(&self, pin: &Pin) -> Option<(u16, u16)> {
        if !self.is_pin_valid(pin) {
            return None;
        }
        let visible_start = self.absolute_row_counter - u64::from(self.visible_rows);
        if pin.absolute_row() < visible_start {
            return None;
        }
        let visible_row = (pin.absolute_row() - visible_start) as u16;
        if pin.col() >= self.cols {
            return None;
        }
        Some((visible_row, pin.col()))
    }

    /// Resolve a pin to the cell it references, visible or in scrollback.
    #[must_use]
    pub fn resolve_pin_to_cell(&self, pin: &Pin) -> Option<Cell> {
        if !self.is_pin_valid(pin) {
            return None;
        }
        self.row_at_absolute(pin.absolute_row())?
            .get(&self.pages, pin.col())
    }

    /// Live visible row index of an absolute row, if currently on screen.
    #[must_use]
    pub fn visible_row_of_absolute(&self, absolute: u64) -> Option<u16> {
        let visible_start = self.absolute_row_counter - u64::from(self.visible_rows);
        if absolute < visible_start || absolute >= self.absolute_row_counter {
            return None;
        }
        Some((absolute - visible_start) as u16)
    }

    /// A row handle by absolute number, if still retained.
    #[must_use]
    pub fn row_at_absolute(&self, absolute: u64) -> Option<Row> {
        if absolute < self.first_retained_absolute() || absolute >= self.absolute_row_counter {
            return None;
        }
        let offset = (absolute - self.first_retained_absolute()) as usize;
        self.rows
            .get((self.ring_head + offset) % self.rows.len())
            .copied()
    }

    // ------------------------------------------------------------------
    // Cursor movement
    // ------------------------------------------------------------------

    #[inline]
    fn max_col(&self) -> u16 {
        self.cols.saturating_sub(1)
    }

    #[inline]
    fn max_row(&self) -> u16 {
        self.visible_rows.saturating_sub(1)
    }

    /// Place the cursor, clamped to bounds. Clears pending wrap.
    pub fn set_cursor(&mut self, row: u16, col: u16) {
        self.cursor.row = row.min(self.max_row());
        self.cursor.col = col.min(self.max_col());
        self.cursor.pending_wrap = false;
    }

    /// Move up `n`, stopping at the top margin when inside the scroll
    /// region, at row 0 otherwise.
    pub fn cursor_up(&mut self, n: u16) {
        let floor = if self.scroll_region.contains(self.cursor.row) {
            self.scroll_region.top
        } else {
            0
        };
        self.cursor.row = self.cursor.row.saturating_sub(n).max(floor);
        self.cursor.pending_wrap = false;
    }

    /// Move down `n`, stopping at the bottom margin when inside the scroll
    /// region, at the last row otherwise.
    pub fn cursor_down(&mut self, n: u16) {
        let ceil = if self.scroll_region.contains(self.cursor.row) {
            self.scroll_region.bottom
        } else {
            self.max_row()
        };
        self.cursor.row = self.cursor.row.saturating_add(n).min(ceil);
        self.cursor.pending_wrap = false;
    }

    /// Move right `n`, saturating at the last column.
    pub fn cursor_forward(&mut self, n: u16) {
        self.cursor.col = self.cursor.col.saturating_add(n).min(self.max_col());
        self.cursor.pending_wrap = false;
    }

    /// Move left `n`, saturating at column 0.
    pub fn cursor_backward(&mut self, n: u16) {
        self.cursor.col = self.cursor.col.saturating_sub(n);
        self.cursor.pending_wrap = false;
    }

    /// CR: column 0.
    #[inline]
    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    /// BS: one column left.
    #[inline]
    pub fn backspace(&mut self) {
        self.cursor.col = self.cursor.col.saturating_sub(1);
        self.cursor.pending_wrap = false;
    }

    /// LF: down one row, scrolling when at the bottom of the scroll region.
    pub fn line_feed(&mut self) {
        self.cursor.pending_wrap = false;
        match self.cursor.row.cmp(&self.scroll_region.bottom) {
            std::cmp::Ordering::Less => self.cursor.row += 1,
            std::cmp::Ordering::Equal => self.scroll_region_up(1),
            std::cmp::Ordering::Greater => {
                if self.cursor.row < self.max_row() {
                    self.cursor.row += 1;
                }
            }
        }
    }

    /// RI: up one row, scrolling the region down when at its top.
    pub fn reverse_line_feed(&mut self) {
        self.cursor.pending_wrap = false;
        match self.cursor.row.cmp(&self.scroll_region.top) {
            std::cmp::Ordering::Greater => self.cursor.row -= 1,
            std::cmp::Ordering::Equal => self.scroll_region_down(1),
            std::cmp::Ordering::Less => {
                self.cursor.row = self.cursor.row.saturating_sub(1);
            }
        }
    }

    /// HT: next tab stop, or the last column.
    pub fn tab(&mut self) {
        self.cursor.pending_wrap = false;
        for col in self.cursor.col + 1..self.cols {
            if self.tab_stops[usize::from(col)] {
                self.cursor.col = col;
                return;
            }
        }
        self.cursor.col = self.max_col();
    }

    /// CHT: forward `n` tab stops.
    pub fn tab_n(&mut self, n: u16) {
        for _ in 0..n {
            self.tab();
        }
    }

    /// CBT: previous tab stop, or column 0.
    pub fn back_tab(&mut self) {
        self.cursor.pending_wrap = false;
        for col in (0..self.cursor.col).rev() {
            if self.tab_stops[usize::from(col)] {
                self.cursor.col = col;
                return;
            }
        }
        self.cursor.col = 0;
    }

    /// Backward `n` tab stops.
    pub fn back_tab_n(&mut self, n: u16) {
        for _ in 0..n {
            self.back_tab();
        }
    }

    /// HTS: set a tab stop at the cursor column.
    pub fn set_tab_stop(&mut self) {
        if let Some(stop) = self.tab_stops.get_mut(usize::from(self.cursor.col)) {
            *stop = true;
        }
    }

    /// TBC 0: clear the tab stop at the cursor column.
    pub fn clear_tab_stop(&mut self) {
        if let Some(stop) = self.tab_stops.get_mut(usize::from(self.cursor.col)) {
            *stop = false;
        }
    }

    /// TBC 3: clear every tab stop.
    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.fill(false);
    }

    /// Restore the default stops (every 8 columns).
    pub fn reset_tab_stops(&mut self) {
        self.tab_stops = Self::default_tab_stops(self.cols);
    }

    /// True when `col` carries a tab stop.
    #[must_use]
    pub fn is_tab_stop(&self, col: u16) -> bool {
        self.tab_stops.get(usize::from(col)).copied().unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Printing
    // ------------------------------------------------------------------

    /// Perform the deferred wrap: mark the current row as continuing, move
    /// to column 0 of the next row, scrolling if needed.
    fn wrap_line(&mut self) {
        let idx = self.live_index(self.cursor.row);
        let mut row = self.rows[idx];
        row.set_wrapped(true);
        self.rows[idx] = row;
        self.line_feed();
        self.cursor.col = 0;
    }

    /// Perform any pending wrap immediately. Insert mode needs the cursor
    /// settled on its final row before shifting cells.
    pub fn commit_pending_wrap(&mut self) {
        if self.cursor.pending_wrap {
            self.wrap_line();
        }
    }

    /// Mark one visible row dirty (for mutations outside the cell store,
    /// like extras changes).
    #[inline]
    pub fn mark_dirty(&mut self, row: u16) {
        self.damage.mark_row(row);
    }

    /// Mark the whole screen dirty (screen switches).
    #[inline]
    pub fn mark_dirty_full(&mut self) {
        self.damage.mark_full();
    }

    /// Print a single-width character at the cursor with the given style.
    /// Returns the position written (for hyperlink/grapheme annotation).
    pub fn print_char(&mut self, c: char, style: StyleId, autowrap: bool) -> (u16, u16) {
        if self.cursor.pending_wrap && autowrap {
            self.wrap_line();
        }
        let (r, col) = (self.cursor.row, self.cursor.col);
        let idx = self.live_index(r);
        let mut row = self.rows[idx];
        row.write_char(&mut self.pages, col, c, style);
        self.rows[idx] = row;
        self.extras.remove(CellCoord::new(r, col));
        self.damage.mark_cell(r, col);

        if col < self.max_col() {
            self.cursor.col = col + 1;
        } else if autowrap {
            self.cursor.pending_wrap = true;
        }
        (r, col)
    }

    /// Print a double-width character (lead + spacer). Wraps first when only
    /// one column remains. Returns the lead position, or `None` when the
    /// pair cannot fit (single-column grid).
    pub fn print_wide_char(
        &mut self,
        c: char,
        style: StyleId,
        autowrap: bool,
    ) -> Option<(u16, u16)> {
        if self.cols < 2 {
            return None;
        }
        if autowrap && (self.cursor.pending_wrap || self.cursor.col + 1 >= self.cols) {
            self.wrap_line();
        }
        let (r, col) = (self.cursor.row, self.cursor.col);
        if col + 1 >= self.cols {
            return None;
        }
        let idx = self.live_index(r);
        let mut row = self.rows[idx];
        row.write_wide_char(&mut self.pages, col, c, style);
        self.rows[idx] = row;
        self.extras.remove(CellCoord::new(r, col));
        self.extras.remove(CellCoord::new(r, col + 1));
        self.damage.mark_cell(r, col);
        self.damage.mark_cell(r, col + 1);

        if col + 2 < self.cols {
            self.cursor.col = col + 2;
        } else {
            self.cursor.col = self.max_col();
            if autowrap {
                self.cursor.pending_wrap = true;
            }
        }
        Some((r, col))
    }

    /// Print a run of printable ASCII, wrapping as needed. The fast path for
    /// the batched parser entry point; equivalent to printing each byte.
    pub fn print_ascii_run(&mut self, bytes: &[u8], style: StyleId, autowrap: bool) {
        let mut remaining = bytes;
        while !remaining.is_empty() {
            if self.cursor.pending_wrap && autowrap {
                self.wrap_line();
            }
            let (r, col) = (self.cursor.row, self.cursor.col);
            let idx = self.live_index(r);
            let mut row = self.rows[idx];
            let written = row.write_ascii_run(&mut self.pages, col, remaining, style);
            if written == 0 {
                // Unreachable while the cursor invariant holds; bail rather
                // than spin on a zero-progress iteration.
                return;
            }
            self.rows[idx] = row;
            self.extras.clear_range(r, col, col + written as u16);
            self.damage.mark_row(r);

            let end = col + written as u16;
            if end <= self.max_col() {
                self.cursor.col = end;
            } else {
                self.cursor.col = self.max_col();
                if autowrap {
                    self.cursor.pending_wrap = true;
                }
            }
            remaining = &remaining[written..];
        }
    }

    /// Attach flags to a cell (hyperlink/complex annotation after a print).
    pub fn set_cell_flags(&mut self, visible_row: u16, col: u16, flags: CellFlags) {
        if visible_row >= self.visible_rows {
            return;
        }
        let idx = self.live_index(visible_row);
        let row = self.rows[idx];
        if let Some(slot) = self
            .pages
            .cells_mut(row.span())
            .get_mut(usize::from(col))
        {
            slot.insert_flags(flags);
        }
    }

    /// Insert metadata flags on a live row (prompt marks).
    pub fn mark_row_flags(&mut self, visible_row: u16, flags: RowFlags) {
        if visible_row >= self.visible_rows {
            return;
        }
        let idx = self.live_index(visible_row);
        let mut row = self.rows[idx];
        row.insert_flags(flags);
        self.rows[idx] = row;
    }

    // ------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------

    /// Scroll the whole screen up `n` rows: the top visible rows become
    /// scrollback, blank rows appear at the bottom. At the scrollback limit
    /// the oldest row's span is reused in place and its page generation is
    /// bumped, invalidating pins into that page.
    pub fn scroll_up(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let capacity = usize::from(self.visible_rows) + self.max_scrollback;
        let cols = self.cols;

        let growth = n.min(capacity.saturating_sub(self.total_lines));
        if growth > 0 {
            self.rows.reserve(growth);
            for _ in 0..growth {
                self.rows.push(Row::new(cols, &mut self.pages));
            }
            self.total_lines += growth;
        }

        for _ in 0..n - growth {
            let oldest = self.ring_head;
            let page = self.rows[oldest].page_id();
            self.pages.bump_generation(page);
            let mut row = self.rows[oldest];
            row.clear(&mut self.pages);
            self.rows[oldest] = row;
            self.ring_head = (self.ring_head + 1) % self.rows.len();
        }

        self.absolute_row_counter += n as u64;
        self.extras
            .shift_rows(0, self.max_row(), -(n.min(usize::from(u16::MAX)) as i32));
        self.display_offset = self.display_offset.min(self.scrollback_lines());
        self.damage.mark_full();
    }

    /// Scroll the region's content up `n` rows in place (SU, and line feeds
    /// at the bottom margin of a restricted region). The full-screen case
    /// feeds scrollback via [`scroll_up`](Self::scroll_up); a restricted
    /// region never does. Content changes identity inside the region, so
    /// pins into it stop resolving.
    pub fn scroll_region_up(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        if self.scroll_region.is_full(self.visible_rows) {
            self.scroll_up(n);
            return;
        }

        let top = usize::from(self.scroll_region.top);
        let bottom = usize::from(self.scroll_region.bottom);
        let n = n.min(bottom - top + 1);

        self.invalidate_region_pins(self.scroll_region.top, self.scroll_region.bottom);
        for dst in top..(bottom + 1 - n) {
            let src_idx = self.live_index((dst + n) as u16);
            let dst_idx = self.live_index(dst as u16);
            self.copy_row_indexed(dst_idx, src_idx);
        }
        for r in (bottom + 1 - n)..=bottom {
            self.clear_live_row(r as u16, StyleId::DEFAULT);
        }
        self.extras
            .shift_rows(self.scroll_region.top, self.scroll_region.bottom, -(n as i32));
        self.damage.mark_full();
    }

    /// Scroll the region's content down `n` rows in place (SD, and reverse
    /// line feeds at the top margin).
    pub fn scroll_region_down(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let top = usize::from(self.scroll_region.top);
        let bottom = usize::from(self.scroll_region.bottom);
        let n = n.min(bottom - top + 1);

        self.invalidate_region_pins(self.scroll_region.top, self.scroll_region.bottom);
        for dst in ((top + n)..=bottom).rev() {
            let src_idx = self.live_index((dst - n) as u16);
            let dst_idx = self.live_index(dst as u16);
            self.copy_row_indexed(dst_idx, src_idx);
        }
        for r in top..top + n {
            self.clear_live_row(r as u16, StyleId::DEFAULT);
        }
        self.extras
            .shift_rows(self.scroll_region.top, self.scroll_region.bottom, n as i32);
        self.damage.mark_full();
    }

    /// Scroll the view into history (positive = older). Clamped to the
    /// retained scrollback.
    pub fn scroll_display(&mut self, delta: i32) {
        let current = i64::try_from(self.display_offset).unwrap_or(i64::MAX);
        let next = current.saturating_add(i64::from(delta)).max(0) as usize;
        self.display_offset = next.min(self.scrollback_lines());
        self.damage.mark_full();
    }

    /// Jump the view to the oldest retained row.
    pub fn scroll_to_top(&mut self) {
        self.display_offset = self.scrollback_lines();
        self.damage.mark_full();
    }

    /// Return the view to the live screen.
    pub fn scroll_to_bottom(&mut self) {
        self.display_offset = 0;
        self.damage.mark_full();
    }

    fn copy_row_indexed(&mut self, dst_idx: usize, src_idx: usize) {
        if dst_idx == src_idx {
            return;
        }
        let src = self.rows[src_idx];
        let mut dst = self.rows[dst_idx];
        dst.copy_from(&mut self.pages, &src);
        self.rows[dst_idx] = dst;
    }

    fn clear_live_row(&mut self, visible_row: u16, style: StyleId) {
        let idx = self.live_index(visible_row);
        let mut row = self.rows[idx];
        if style.is_default() {
            row.clear(&mut self.pages);
        } else {
            let cols = self.cols;
            row.clear_range(&mut self.pages, 0, cols, style);
            row.set_flags(RowFlags::empty());
        }
        self.rows[idx] = row;
    }

    /// Bump the generation of every page backing rows in `[top, bottom]`.
    /// Conservative: sibling rows sharing those pages lose their pins too,
    /// which is the permitted direction of error for stale references.
    fn invalidate_region_pins(&mut self, top: u16, bottom: u16) {
        let mut last: Option<PageId> = None;
        for r in top..=bottom {
            let page = self.rows[self.live_index(r)].page_id();
            if last != Some(page) {
                self.pages.bump_generation(page);
                last = Some(page);
            }
        }
    }

    // ------------------------------------------------------------------
    // Erase and editing
    // ------------------------------------------------------------------

    /// EL 0: erase from the cursor to the end of the line.
    pub fn erase_to_end_of_line(&mut self, style: StyleId) {
        let (r, col) = (self.cursor.row, self.cursor.col);
        let cols = self.cols;
        let idx = self.live_index(r);
        let mut row = self.rows[idx];
        row.clear_range(&mut self.pages, col, cols, style);
        // The erase severs any soft wrap continuing past this row.
        row.set_wrapped(false);
        self.rows[idx] = row;
        self.extras.clear_range(r, col, cols);
        self.damage.mark_row(r);
    }

    /// EL 1: erase from the start of the line through the cursor.
    pub fn erase_from_start_of_line(&mut self, style: StyleId) {
        let (r, col) = (self.cursor.row, self.cursor.col);
        let end = (col + 1).min(self.cols);
        let idx = self.live_index(r);
        let mut row = self.rows[idx];
        row.clear_range(&mut self.pages, 0, end, style);
        self.rows[idx] = row;
        self.extras.clear_range(r, 0, end);
        self.damage.mark_row(r);
    }

    /// EL 2: erase the whole line.
    pub fn erase_line(&mut self, style: StyleId) {
        let r = self.cursor.row;
        self.clear_live_row(r, style);
        self.extras.clear_row(r);
        self.damage.mark_row(r);
    }

    /// ED 0: erase from the cursor to the end of the screen.
    pub fn erase_below(&mut self, style: StyleId) {
        self.erase_to_end_of_line(style);
        for r in self.cursor.row + 1..self.visible_rows {
            self.clear_live_row(r, style);
            self.extras.clear_row(r);
        }
        self.damage.mark_full();
    }

    /// ED 1: erase from the start of the screen through the cursor.
    pub fn erase_above(&mut self, style: StyleId) {
        for r in 0..self.cursor.row {
            self.clear_live_row(r, style);
            self.extras.clear_row(r);
        }
        self.erase_from_start_of_line(style);
        self.damage.mark_full();
    }

    /// ED 2: erase the whole visible screen.
    pub fn erase_screen(&mut self, style: StyleId) {
        for r in 0..self.visible_rows {
            self.clear_live_row(r, style);
        }
        self.extras.clear();
        self.damage.mark_full();
    }

    /// ED 3: drop all scrollback, keeping the live screen. Every pin is
    /// invalidated (the page store is rebuilt).
    pub fn erase_scrollback(&mut self) {
        if self.scrollback_lines() == 0 {
            self.display_offset = 0;
            return;
        }
        self.normalize_ring();
        let scrollback = self.scrollback_lines();

        let mut new_pages = PageStore::with_base_from(&self.pages);
        let mut new_rows = Vec::with_capacity(usize::from(self.visible_rows));
        for i in 0..usize::from(self.visible_rows) {
            let src = self.rows[scrollback + i];
            let mut row = Row::new(self.cols, &mut new_pages);
            let cells: Vec<Cell> = src.extract_cells(&self.pages);
            for (col, cell) in cells.into_iter().enumerate() {
                row.set(&mut new_pages, col as u16, cell);
            }
            row.set_flags(src.flags());
            new_rows.push(row);
        }

        self.pages = new_pages;
        self.rows = new_rows;
        self.total_lines = usize::from(self.visible_rows);
        self.ring_head = 0;
        self.display_offset = 0;
        self.absolute_row_counter = self.absolute_row_counter.max(self.total_lines as u64);
        self.damage.mark_full();
    }

    /// ICH: insert `n` blank cells at the cursor, shifting the rest right.
    pub fn insert_chars(&mut self, n: u16, style: StyleId) {
        let (r, col) = (self.cursor.row, self.cursor.col);
        let idx = self.live_index(r);
        let mut row = self.rows[idx];
        row.insert_blanks(&mut self.pages, col, n, style);
        self.rows[idx] = row;
        self.extras.clear_range(r, col, self.cols);
        self.damage.mark_row(r);
    }

    /// DCH: delete `n` cells at the cursor, shifting the rest left.
    pub fn delete_chars(&mut self, n: u16, style: StyleId) {
        let (r, col) = (self.cursor.row, self.cursor.col);
        let idx = self.live_index(r);
        let mut row = self.rows[idx];
        row.delete_chars(&mut self.pages, col, n, style);
        self.rows[idx] = row;
        self.extras.clear_range(r, col, self.cols);
        self.damage.mark_row(r);
    }

    /// ECH: blank `n` cells at the cursor in place.
    pub fn erase_chars(&mut self, n: u16, style: StyleId) {
        let (r, col) = (self.cursor.row, self.cursor.col);
        let end = col.saturating_add(n).min(self.cols);
        let idx = self.live_index(r);
        let mut row = self.rows[idx];
        row.clear_range(&mut self.pages, col, end, style);
        self.rows[idx] = row;
        self.extras.clear_range(r, col, end);
        self.damage.mark_row(r);
    }

    /// IL: insert `n` blank lines at the cursor, pushing lines below down
    /// within the scroll region. No effect outside the region.
    pub fn insert_lines(&mut self, n: usize, style: StyleId) {
        if n == 0 || !self.scroll_region.contains(self.cursor.row) {
            return;
        }
        let start = usize::from(self.cursor.row);
        let bottom = usize::from(self.scroll_region.bottom);
        let n = n.min(bottom - start + 1);

        self.invalidate_region_pins(self.cursor.row, self.scroll_region.bottom);
        for dst in ((start + n)..=bottom).rev() {
            let src_idx = self.live_index((dst - n) as u16);
            let dst_idx = self.live_index(dst as u16);
            self.copy_row_indexed(dst_idx, src_idx);
        }
        for r in start..start + n {
            self.clear_live_row(r as u16, style);
        }
        self.extras
            .shift_rows(self.cursor.row, self.scroll_region.bottom, n as i32);
        self.damage.mark_full();
    }

    /// DL: delete `n` lines at the cursor, pulling lines below up within the
    /// scroll region. No effect outside the region.
    pub fn delete_lines(&mut self, n: usize, style: StyleId) {
        if n == 0 || !self.scroll_region.contains(self.cursor.row) {
            return;
        }
        let start = usize::from(self.cursor.row);
        let bottom = usize::from(self.scroll_region.bottom);
        let n = n.min(bottom - start + 1);

        self.invalidate_region_pins(self.cursor.row, self.scroll_region.bottom);
        for dst in start..(bottom + 1 - n) {
            let src_idx = self.live_index((dst + n) as u16);
            let dst_idx = self.live_index(dst as u16);
            self.copy_row_indexed(dst_idx, src_idx);
        }
        for r in (bottom + 1 - n)..=bottom {
            self.clear_live_row(r as u16, style);
        }
        self.extras
            .shift_rows(self.cursor.row, self.scroll_region.bottom, -(n as i32));
        self.damage.mark_full();
    }

    /// DECALN: fill the screen with `E`, home the cursor, reset margins.
    pub fn screen_alignment_pattern(&mut self) {
        self.scroll_region = ScrollRegion::full(self.visible_rows);
        for r in 0..self.visible_rows {
            let idx = self.live_index(r);
            let mut row = self.rows[idx];
            for col in 0..self.cols {
                row.set(&mut self.pages, col, Cell::new('E', StyleId::DEFAULT));
            }
            row.set_flags(RowFlags::empty());
            self.rows[idx] = row;
        }
        self.extras.clear();
        self.cursor = Cursor::default();
        self.damage.mark_full();
    }

    /// Reset the grid to its initial state (RIS). All pins are invalidated.
    pub fn reset(&mut self) {
        let rows = self.visible_rows;
        let cols = self.cols;
        let mut new_pages = PageStore::with_base_from(&self.pages);
        let mut new_rows = Vec::with_capacity(usize::from(rows));
        for _ in 0..rows {
            new_rows.push(Row::new(cols, &mut new_pages));
        }
        self.pages = new_pages;
        self.rows = new_rows;
        self.total_lines = usize::from(rows);
        self.ring_head = 0;
        self.display_offset = 0;
        self.cursor = Cursor::default();
        self.scroll_region = ScrollRegion::full(rows);
        self.tab_stops = Self::default_tab_stops(cols);
        self.extras.clear();
        self.styles.clear();
        self.absolute_row_counter = self.absolute_row_counter.max(u64::from(rows));
        self.damage = Damage::new(rows);
    }

    /// Change the scrollback limit. Excess history is dropped oldest-first.
    pub fn set_max_scrollback(&mut self, limit: usize) {
        self.max_scrollback = limit;
        let capacity = usize::from(self.visible_rows) + limit;
        if self.total_lines > capacity {
            self.normalize_ring();
            let drop = self.total_lines - capacity;
            let mut last: Option<PageId> = None;
            for row in self.rows.drain(..drop) {
                if last != Some(row.page_id()) {
                    self.pages.bump_generation(row.page_id());
                    last = Some(row.page_id());
                }
            }
            self.total_lines = capacity;
            self.display_offset = self.display_offset.min(self.scrollback_lines());
        }
    }

    // ------------------------------------------------------------------
    // Resize and reflow
    // ------------------------------------------------------------------

    /// Resize with column reflow (the primary screen path).
    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.resize_with_reflow(rows, cols, true);
    }

    /// Resize the grid.
    ///
    /// With `reflow`, a column change re-segments every logical line
    /// (scrollback included) at the new width: no character is lost or
    /// duplicated, and the cursor keeps its logical position (the character
    /// it precedes). Without it, rows are clamp-copied (the alternate
    /// screen path; full-screen programs repaint on resize).
    ///
    /// Every reflow rebuilds the page store, so all outstanding pins,
    /// including any selection, fail their generation check afterwards.
    pub fn resize_with_reflow(&mut self, new_rows: u16, new_cols: u16, reflow: bool) {
        let new_rows = new_rows.max(1);
        let new_cols = new_cols.clamp(1, PAGE_CELLS as u16);

        if new_cols != self.cols {
            if reflow {
                self.reflow_columns(new_cols);
            } else {
                self.clamp_copy_columns(new_cols);
            }
        }
        self.adjust_row_count(new_rows);

        self.visible_rows = new_rows;
        self.scroll_region = ScrollRegion::full(new_rows);
        let old_len = self.tab_stops.len();
        self.tab_stops.resize(usize::from(self.cols), false);
        for col in old_len..self.tab_stops.len() {
            self.tab_stops[col] = col > 0 && col % 8 == 0;
        }
        self.cursor.row = self.cursor.row.min(self.max_row());
        self.cursor.col = self.cursor.col.min(self.max_col());
        self.cursor.pending_wrap = false;
        self.display_offset = self.display_offset.min(self.scrollback_lines());
        self.extras.clear();
        self.damage = Damage::new(new_rows);

        self.enforce_capacity();
    }

    /// Clamp-copy every retained row to a new width (no reflow).
    fn clamp_copy_columns(&mut self, new_cols: u16) {
        self.normalize_ring();
        let mut new_pages = PageStore::with_base_from(&self.pages);
        let mut new_rows = Vec::with_capacity(self.rows.len());
        for old in &self.rows {
            let mut row = Row::new(new_cols, &mut new_pages);
            let cells = self.pages.cells(old.span());
            let n = cells.len().min(usize::from(new_cols));
            for (col, cell) in cells[..n].iter().enumerate() {
                row.set(&mut new_pages, col as u16, *cell);
            }
            // A wide lead cannot sit in the last column.
            if let Some(last) = row.get(&new_pages, new_cols.saturating_sub(1)) {
                if last.is_wide() {
                    row.set(&mut new_pages, new_cols - 1, Cell::EMPTY);
                }
            }
            if let Some(first) = row.get(&new_pages, 0) {
                if first.is_wide_spacer() {
                    row.set(&mut new_pages, 0, Cell::EMPTY);
                }
            }
            row.set_flags(old.flags());
            new_rows.push(row);
        }
        self.pages = new_pages;
        self.rows = new_rows;
        self.cols = new_cols;
        self.cursor.col = self.cursor.col.min(new_cols.saturating_sub(1));
    }

    /// Re-segment every logical line at a new width.
    ///
    /// A logical line is a maximal run of rows whose predecessors carry the
    /// `wrapped` flag. The final row of each line contributes only its
    /// content (trailing blanks dropped); wrapped rows contribute their full
    /// width, since a soft wrap only occurs on a filled row. Wide pairs are
    /// never split across the new boundary.
    fn reflow_columns(&mut self, new_cols: u16) {
        self.normalize_ring();
        let old_total = self.total_lines;
        let cursor_global = self.scrollback_lines() + usize::from(self.cursor.row);
        let cursor_col = usize::from(self.cursor.col);

        let mut new_pages = PageStore::with_base_from(&self.pages);
        let mut new_rows: Vec<Row> = Vec::with_capacity(self.rows.len());
        let mut cursor_new: Option<(usize, u16)> = None;

        // Trailing blank rows carry no content; skipping them keeps a
        // widening reflow from pushing real content into scrollback.
        let mut effective = self.rows.len();
        while effective > cursor_global + 1 && effective > 1 {
            let row = self.rows[effective - 1];
            if row.content_len(&self.pages) == 0 && row.flags().is_empty() {
                effective -= 1;
            } else {
                break;
            }
        }

        let mut i = 0;
        while i < effective {
            // Collect one logical line.
            let start = i;
            while i < effective - 1 && self.rows[i].is_wrapped() {
                i += 1;
            }
            let end = i;
            let line_flags = self.rows[start].flags() & !RowFlags::WRAPPED;

            let mut cells: Vec<Cell> = Vec::new();
            let mut cursor_offset: Option<usize> = None;
            for (k, row) in self.rows[start..=end].iter().enumerate() {
                let global = start + k;
                let row_cells = self.pages.cells(row.span());
                let take = if global == end {
                    usize::from(row.content_len(&self.pages))
                } else {
                    row_cells.len()
                };
                if global == cursor_global {
                    cursor_offset = Some(cells.len() + cursor_col.min(take));
                }
                cells.extend_from_slice(&row_cells[..take]);
            }
            if cursor_global >= start && cursor_global <= end && cursor_offset.is_none() {
                cursor_offset = Some(cells.len());
            }

            // Re-segment at the new width.
            if cells.is_empty() {
                if cursor_offset.is_some() {
                    cursor_new = Some((new_rows.len(), cursor_col.min(usize::from(new_cols) - 1) as u16));
                }
                let mut row = Row::new(new_cols, &mut new_pages);
                row.set_flags(line_flags);
                new_rows.push(row);
            } else {
                let mut offset = 0;
                while offset < cells.len() {
                    let mut seg_end = (offset + usize::from(new_cols)).min(cells.len());
                    if seg_end < cells.len() && seg_end > offset && cells[seg_end - 1].is_wide() {
                        seg_end -= 1;
                    }
                    let mut row = Row::new(new_cols, &mut new_pages);
                    for (j, cell) in cells[offset..seg_end].iter().enumerate() {
                        row.set(&mut new_pages, j as u16, *cell);
                    }
                    if offset == 0 {
                        row.set_flags(line_flags);
                    }
                    if seg_end < cells.len() {
                        row.set_wrapped(true);
                    }
                    if let Some(co) = cursor_offset {
                        let contains = co >= offset && (co < seg_end || seg_end == cells.len());
                        if contains && cursor_new.is_none() {
                            let col = (co - offset).min(usize::from(new_cols) - 1);
                            cursor_new = Some((new_rows.len(), col as u16));
                        }
                    }
                    new_rows.push(row);
                    offset = seg_end;
                }
            }

            i = end + 1;
        }

        // The visible window is the tail of the buffer; keep at least a
        // screenful of rows so content stays anchored at the top.
        while new_rows.len() < usize::from(self.visible_rows) {
            new_rows.push(Row::new(new_cols, &mut new_pages));
        }

        let new_total = new_rows.len();
        self.pages = new_pages;
        self.rows = new_rows;
        self.total_lines = new_total;
        self.ring_head = 0;
        self.cols = new_cols;
        self.absolute_row_counter = self
            .absolute_row_counter
            .saturating_add(new_total.saturating_sub(old_total) as u64);

        let scrollback = self.total_lines - usize::from(self.visible_rows);
        let (global, col) = cursor_new.unwrap_or((scrollback, 0));
        self.cursor.row = global.saturating_sub(scrollback) as u16;
        self.cursor.col = col;
        self.cursor.pending_wrap = false;
    }

    /// Apply a visible-row-count change: extend the window into scrollback
    /// (or add blank rows) when growing, slide the top into scrollback
    /// (trimming blank bottom rows first) when shrinking.
    fn adjust_row_count(&mut self, new_rows: u16) {
        use std::cmp::Ordering;
        match new_rows.cmp(&self.visible_rows) {
            Ordering::Equal => {}
            Ordering::Greater => {
                let want = usize::from(new_rows - self.visible_rows);
                let pulled = want.min(self.scrollback_lines());
                // Rows pulled from history shift the cursor down with the
                // content; the remainder appears blank below it.
                self.cursor.row = self
                    .cursor
                    .row
                    .saturating_add(pulled as u16)
                    .min(new_rows - 1);
                let blanks = want - pulled;
                if blanks > 0 {
                    self.normalize_ring();
                    for _ in 0..blanks {
                        self.rows.push(Row::new(self.cols, &mut self.pages));
                    }
                    self.total_lines += blanks;
                    self.absolute_row_counter += blanks as u64;
                }
            }
            Ordering::Less => {
                self.normalize_ring();
                let mut excess = usize::from(self.visible_rows - new_rows);
                let cursor_global = self.scrollback_lines() + usize::from(self.cursor.row);
                // Blank rows below the cursor vanish rather than entering
                // scrollback.
                while excess > 0 && self.rows.len() > cursor_global + 1 {
                    let last = self.rows[self.rows.len() - 1];
                    if last.content_len(&self.pages) != 0 || last.is_wrapped() {
                        break;
                    }
                    self.rows.pop();
                    self.total_lines -= 1;
                    self.absolute_row_counter -= 1;
                    excess -= 1;
                }
                // The rest of the top slides into scrollback.
                self.cursor.row = self.cursor.row.saturating_sub(excess as u16);
            }
        }
    }

    /// Drop oldest rows past `visible + max_scrollback`.
    fn enforce_capacity(&mut self) {
        let capacity = usize::from(self.visible_rows) + self.max_scrollback;
        if self.total_lines > capacity {
            self.normalize_ring();
            let drop = self.total_lines - capacity;
            let mut last: Option<PageId> = None;
            for row in self.rows.drain(..drop) {
                if last != Some(row.page_id()) {
                    self.pages.bump_generation(row.page_id());
                    last = Some(row.page_id());
                }
            }
            self.total_lines = capacity;
        }
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Debug-build check of the grid's structural invariants. Release
    /// builds do nothing; the byte stream is untrusted and must never be
    /// able to trigger a panic.
    #[inline]
    pub fn assert_invariants(&self) {
        #[cfg(debug_assertions)]
        {
            assert!(self.cursor.row < self.visible_rows, "cursor row out of bounds");
            assert!(self.cursor.col < self.cols, "cursor col out of bounds");
            assert_eq!(self.rows.len(), self.total_lines);
            assert!(self.total_lines >= usize::from(self.visible_rows));
            assert!(self.display_offset <= self.scrollback_lines());
            assert!(self.scroll_region.top <= self.scroll_region.bottom);
            assert!(self.scroll_region.bottom < self.visible_rows);

            for r in 0..self.visible_rows {
                let row = self.rows[self.live_index(r)];
                let cells = self.pages.cells(row.span());
                for col in 0..cells.len() {
                    if cells[col].is_wide() {
                        assert!(
                            col + 1 < cells.len() && cells[col + 1].is_wide_spacer(),
                            "wide lead without spacer at ({r}, {col})"
                        );
                    }
                }
            }
        }
    }
}
