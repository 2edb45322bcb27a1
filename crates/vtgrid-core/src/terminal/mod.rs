//! The terminal: parser sink, two screens, modes, and reports.
//!
//! [`Terminal`] is the [`ActionSink`] the byte-stream parser dispatches
//! into. It owns a primary grid (with scrollback) and an alternate grid
//! (without), the active pen, character sets, the color palette, window
//! metadata from OSC sequences, and a response buffer for the reports the
//! embedder writes back to the PTY (DSR, DA, color queries).
//!
//! Everything here is synchronous and single-writer: feed bytes with
//! [`process`](Terminal::process), then read rows, damage, and responses.
//! Unknown sequences are ignored, never fatal.

mod modes;

pub use modes::{Charset, CursorStyle, TerminalModes};

use std::sync::Arc;

use crate::config::{ConfigChange, TerminalConfig};
use crate::grapheme;
use crate::grid::extra::CellCoord;
use crate::grid::style::{Color, Rgb, Style, StyleAttrs, StyleId};
use crate::grid::{CellFlags, Cursor, Grid, RowFlags};
use crate::osc::{self, OscCommand, PromptMark};
use crate::parser::{ActionSink, Parser};
use crate::selection::Selection;

/// Maximum DCS payload bytes accepted before the rest is discarded.
pub const MAX_DCS_DATA: usize = 4096;

/// The 256-entry palette plus the default foreground and background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    /// Palette entries 0..=255 (16 ANSI, 216 cube, 24 grayscale).
    pub colors: [Rgb; 256],
    /// Default foreground (OSC 10 overrides, OSC 110 restores).
    pub foreground: Rgb,
    /// Default background (OSC 11 overrides, OSC 111 restores).
    pub background: Rgb,
}

impl ColorPalette {
    /// The standard xterm palette with the given defaults.
    #[must_use]
    pub fn xterm(foreground: Rgb, background: Rgb) -> Self {
        let mut colors = [(0, 0, 0); 256];
        for (i, slot) in colors.iter_mut().enumerate() {
            *slot = Self::default_entry(i as u8);
        }
        Self {
            colors,
            foreground,
            background,
        }
    }

    /// The standard xterm value of one palette entry.
    #[must_use]
    pub fn default_entry(index: u8) -> Rgb {
        const ANSI: [Rgb; 16] = [
            (0, 0, 0),
            (205, 0, 0),
            (0, 205, 0),
            (205, 205, 0),
            (0, 0, 238),
            (205, 0, 205),
            (0, 205, 205),
            (229, 229, 229),
            (127, 127, 127),
            (255, 0, 0),
            (0, 255, 0),
            (255, 255, 0),
            (92, 92, 255),
            (255, 0, 255),
            (0, 255, 255),
            (255, 255, 255),
        ];
        match index {
            0..=15 => ANSI[usize::from(index)],
            16..=231 => {
                let i = index - 16;
                let scale = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
                (scale(i / 36), scale(i / 6 % 6), scale(i % 6))
            }
            232..=255 => {
                let v = 8 + 10 * (index - 232);
                (v, v, v)
            }
        }
    }

    /// Resolve a cell color to RGB.
    #[must_use]
    pub fn resolve(&self, color: Color, default: Rgb) -> Rgb {
        color.resolve(&self.colors, default)
    }
}

/// Cursor, pen, and addressing state captured by DECSC and mode 1048/1049.
#[derive(Debug, Clone, Copy, Default)]
struct SavedContext {
    cursor: Cursor,
    pen: Style,
    origin: bool,
    charsets: [Charset; 2],
    active_charset: usize,
    valid: bool,
}

/// Bounded sink for DCS payloads. No DCS protocol is interpreted; the
/// capability exists so passthrough strings are consumed safely.
#[derive(Debug, Clone, Copy, Default)]
struct DcsState {
    active: bool,
    len: usize,
}

/// A complete terminal: parser, two screens, and dispatch state.
///
/// ## Example
///
/// ```
/// use vtgrid_core::terminal::Terminal;
///
/// let mut term = Terminal::new(24, 80);
/// term.process(b"\x1b[1;31mwarning\x1b[0m");
/// assert_eq!(term.grid().row_text(0).unwrap().trim_end(), "warning");
/// ```
#[derive(Debug)]
pub struct Terminal {
    parser: Parser,
    primary: Grid,
    alternate: Grid,
    active_is_alt: bool,
    modes: TerminalModes,

    pen: Style,
    pen_id: StyleId,
    pen_dirty: bool,

    charsets: [Charset; 2],
    active_charset: usize,
    saved: [SavedContext; 2],

    palette: ColorPalette,
    cursor_style: CursorStyle,
    title: String,
    icon_name: String,
    working_directory: Option<String>,
    hyperlink: Option<Arc<str>>,

    /// Position of the most recent printed cell, for combining marks.
    last_print: Option<(u16, u16)>,
    /// Most recent printed character, for REP.
    last_printed: Option<char>,

    dcs: DcsState,
    responses: Vec<u8>,
    config: TerminalConfig,
}

impl Terminal {
    /// Create a terminal with the default configuration.
    #[must_use]
    pub fn new(rows: u16, cols: u16) -> Self {
        Self::with_config(rows, cols, TerminalConfig::default())
    }

    /// Create a terminal with a custom configuration.
    #[must_use]
    pub fn with_config(rows: u16, cols: u16, config: TerminalConfig) -> Self {
        let mut modes = TerminalModes::default();
        modes.autowrap = config.auto_wrap;
        modes.bracketed_paste = config.bracketed_paste;
        modes.cursor_visible = config.cursor_visible;

        Self {
            parser: Parser::new(),
            primary: Grid::with_scrollback(rows, cols, config.scrollback_limit),
            alternate: Grid::with_scrollback(rows, cols, 0),
            active_is_alt: false,
            modes,
            pen: Style::DEFAULT,
            pen_id: StyleId::DEFAULT,
            pen_dirty: false,
            charsets: [Charset::Ascii; 2],
            active_charset: 0,
            saved: [SavedContext::default(); 2],
            palette: ColorPalette::xterm(config.default_foreground, config.default_background),
            cursor_style: config.cursor_style,
            title: String::new(),
            icon_name: String::new(),
            working_directory: None,
            hyperlink: None,
            last_print: None,
            last_printed: None,
            dcs: DcsState::default(),
            responses: Vec::new(),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Feeding and reading
    // ------------------------------------------------------------------

    /// Process a batch of PTY bytes through the fast parser path.
    pub fn process(&mut self, bytes: &[u8]) {
        let mut parser = std::mem::take(&mut self.parser);
        parser.advance_fast(bytes, self);
        self.parser = parser;
        self.assert_invariants();
    }

    /// Process one byte.
    pub fn process_byte(&mut self, byte: u8) {
        let mut parser = std::mem::take(&mut self.parser);
        parser.process_byte(byte, self);
        self.parser = parser;
    }

    /// Resize both screens. The primary screen reflows; the alternate is
    /// clamp-copied, since full-screen programs repaint on resize.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.primary.resize_with_reflow(rows, cols, true);
        self.alternate.resize_with_reflow(rows, cols, false);
        self.last_print = None;
    }

    /// The active screen.
    #[must_use]
    #[inline]
    pub fn grid(&self) -> &Grid {
        if self.active_is_alt {
            &self.alternate
        } else {
            &self.primary
        }
    }

    /// Mutable access to the active screen.
    #[inline]
    pub fn grid_mut(&mut self) -> &mut Grid {
        if self.active_is_alt {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    /// The primary screen, regardless of which is active.
    #[must_use]
    #[inline]
    pub fn primary_grid(&self) -> &Grid {
        &self.primary
    }

    /// Visible row count.
    #[must_use]
    #[inline]
    pub fn rows(&self) -> u16 {
        self.grid().rows()
    }

    /// Column count.
    #[must_use]
    #[inline]
    pub fn cols(&self) -> u16 {
        self.grid().cols()
    }

    /// The active screen's cursor.
    #[must_use]
    #[inline]
    pub fn cursor(&self) -> Cursor {
        self.grid().cursor()
    }

    /// True while the alternate screen is active.
    #[must_use]
    #[inline]
    pub fn is_alt_screen(&self) -> bool {
        self.active_is_alt
    }

    /// Tracked terminal modes.
    #[must_use]
    #[inline]
    pub fn modes(&self) -> TerminalModes {
        self.modes
    }

    /// Whether the cursor should be drawn.
    #[must_use]
    #[inline]
    pub fn cursor_visible(&self) -> bool {
        self.modes.cursor_visible
    }

    /// The cursor shape (DECSCUSR).
    #[must_use]
    #[inline]
    pub fn cursor_style(&self) -> CursorStyle {
        self.cursor_style
    }

    /// Window title (OSC 0/2).
    #[must_use]
    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Icon name (OSC 0/1).
    #[must_use]
    #[inline]
    pub fn icon_name(&self) -> &str {
        &self.icon_name
    }

    /// Working directory reported by the shell (OSC 7).
    #[must_use]
    #[inline]
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    /// The active OSC 8 hyperlink, if a link region is open.
    #[must_use]
    #[inline]
    pub fn active_hyperlink(&self) -> Option<&str> {
        self.hyperlink.as_deref()
    }

    /// The color palette.
    #[must_use]
    #[inline]
    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// The active graphic rendition.
    #[must_use]
    #[inline]
    pub fn pen(&self) -> Style {
        self.pen
    }

    /// Drain the pending reports (DSR, DA, color queries). The embedder
    /// writes these back to the PTY.
    pub fn take_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.responses)
    }

    /// Extract the text of a selection against the active screen, using
    /// the configured word separators for semantic selection.
    #[must_use]
    pub fn selection_text(&self, selection: &Selection) -> Option<String> {
        selection.text(self.grid(), &self.config.word_separators)
    }

    /// Apply a new configuration, returning what changed.
    pub fn apply_config(&mut self, config: &TerminalConfig) -> Vec<ConfigChange> {
        let changes = self.config.diff(config);
        for change in &changes {
            match change {
                ConfigChange::ScrollbackLimit => {
                    self.primary.set_max_scrollback(config.scrollback_limit);
                }
                ConfigChange::AutoWrap => self.modes.autowrap = config.auto_wrap,
                ConfigChange::BracketedPaste => {
                    self.modes.bracketed_paste = config.bracketed_paste;
                }
                ConfigChange::Cursor => {
                    self.cursor_style = config.cursor_style;
                    self.modes.cursor_visible = config.cursor_visible;
                }
                ConfigChange::Colors => {
                    self.palette.foreground = config.default_foreground;
                    self.palette.background = config.default_background;
                }
                ConfigChange::WordSeparators => {}
            }
        }
        self.config = config.clone();
        changes
    }

    /// Debug-build invariant check over the terminal and active screen.
    #[inline]
    pub fn assert_invariants(&self) {
        #[cfg(debug_assertions)]
        {
            self.parser.assert_invariants();
            self.grid().assert_invariants();
        }
    }

    // ------------------------------------------------------------------
    // Pen
    // ------------------------------------------------------------------

    /// The pen's interned id in the active screen's style table.
    fn pen_id(&mut self) -> StyleId {
        if self.pen_dirty {
            let pen = self.pen;
            self.pen_id = self.grid_mut().intern_style(pen);
            self.pen_dirty = false;
        }
        self.pen_id
    }

    /// Erase fills keep the pen's background but drop everything else.
    fn erase_style(&mut self) -> StyleId {
        if self.pen.bg == Color::Default {
            StyleId::DEFAULT
        } else {
            let style = Style {
                bg: self.pen.bg,
                ..Style::DEFAULT
            };
            self.grid_mut().intern_style(style)
        }
    }

    fn set_pen(&mut self, pen: Style) {
        if pen != self.pen {
            self.pen = pen;
            self.pen_dirty = true;
        }
    }

    // ------------------------------------------------------------------
    // Printing
    // ------------------------------------------------------------------

    fn input_print(&mut self, c: char) {
        let c = if c.is_ascii() {
            self.charsets[self.active_charset].translate(c)
        } else {
            c
        };

        let width = grapheme::char_width(c);
        if width == 0 {
            // Combining marks extend the previous cell's grapheme; they
            // never occupy a cell of their own.
            if let Some((row, col)) = self.last_print {
                let grid = self.grid_mut();
                grid.set_cell_flags(row, col, CellFlags::COMPLEX);
                grid.extras_mut().push_combining(CellCoord::new(row, col), c);
                grid.mark_dirty(row);
            }
            return;
        }

        let autowrap = self.modes.autowrap;
        let style = self.pen_id();
        if self.modes.insert {
            if autowrap {
                self.grid_mut().commit_pending_wrap();
            }
            self.grid_mut().insert_chars(width as u16, style);
        }

        let pos = if width == 2 {
            self.grid_mut().print_wide_char(c, style, autowrap)
        } else {
            Some(self.grid_mut().print_char(c, style, autowrap))
        };

        if let Some((row, col)) = pos {
            if let Some(link) = self.hyperlink.clone() {
                let grid = self.grid_mut();
                grid.extras_mut().set_hyperlink(CellCoord::new(row, col), link);
                grid.set_cell_flags(row, col, CellFlags::HYPERLINK);
            }
            self.last_print = Some((row, col));
            self.last_printed = Some(c);
        }
    }

    // ------------------------------------------------------------------
    // CSI
    // ------------------------------------------------------------------

    /// 1-based CSI parameter with its default (0 and absent mean default).
    fn param(params: &[u16], index: usize, default: u16) -> u16 {
        match params.get(index) {
            Some(&0) | None => default,
            Some(&value) => value,
        }
    }

    fn input_csi(&mut self, params: &[u16], intermediates: &[u8], final_byte: u8, subparams: u16) {
        let private = intermediates.first() == Some(&b'?');
        if private {
            match final_byte {
                b'h' => self.set_private_modes(params, true),
                b'l' => self.set_private_modes(params, false),
                _ => {}
            }
            return;
        }

        match (intermediates, final_byte) {
            ([], b'A') => self.grid_mut().cursor_up(Self::param(params, 0, 1)),
            ([], b'B') => self.grid_mut().cursor_down(Self::param(params, 0, 1)),
            ([], b'C') => self.grid_mut().cursor_forward(Self::param(params, 0, 1)),
            ([], b'D') => self.grid_mut().cursor_backward(Self::param(params, 0, 1)),
            ([], b'E') => {
                let n = Self::param(params, 0, 1);
                let grid = self.grid_mut();
                grid.cursor_down(n);
                grid.carriage_return();
            }
            ([], b'F') => {
                let n = Self::param(params, 0, 1);
                let grid = self.grid_mut();
                grid.cursor_up(n);
                grid.carriage_return();
            }
            ([], b'G' | b'`') => {
                let col = Self::param(params, 0, 1) - 1;
                let row = self.grid().cursor_row();
                self.grid_mut().set_cursor(row, col);
            }
            ([], b'H' | b'f') => {
                self.move_cursor_absolute(Self::param(params, 0, 1), Self::param(params, 1, 1));
            }
            ([], b'd') => {
                let row1 = Self::param(params, 0, 1);
                let col = self.grid().cursor_col();
                let row = self.origin_row(row1);
                self.grid_mut().set_cursor(row, col);
            }
            ([], b'I') => self.grid_mut().tab_n(Self::param(params, 0, 1)),
            ([], b'Z') => self.grid_mut().back_tab_n(Self::param(params, 0, 1)),
            ([], b'J') => {
                let style = self.erase_style();
                match params.first().copied().unwrap_or(0) {
                    0 => self.grid_mut().erase_below(style),
                    1 => self.grid_mut().erase_above(style),
                    2 => self.grid_mut().erase_screen(style),
                    3 => self.grid_mut().erase_scrollback(),
                    _ => {}
                }
            }
            ([], b'K') => {
                let style = self.erase_style();
                match params.first().copied().unwrap_or(0) {
                    0 => self.grid_mut().erase_to_end_of_line(style),
                    1 => self.grid_mut().erase_from_start_of_line(style),
                    2 => self.grid_mut().erase_line(style),
                    _ => {}
                }
            }
            ([], b'@') => {
                let style = self.erase_style();
                self.grid_mut().insert_chars(Self::param(params, 0, 1), style);
            }
            ([], b'P') => {
                let style = self.erase_style();
                self.grid_mut().delete_chars(Self::param(params, 0, 1), style);
            }
            ([], b'X') => {
                let style = self.erase_style();
                self.grid_mut().erase_chars(Self::param(params, 0, 1), style);
            }
            ([], b'L') => {
                let style = self.erase_style();
                let n = usize::from(Self::param(params, 0, 1));
                self.grid_mut().insert_lines(n, style);
            }
            ([], b'M') => {
                let style = self.erase_style();
                let n = usize::from(Self::param(params, 0, 1));
                self.grid_mut().delete_lines(n, style);
            }
            ([], b'S') => {
                let n = usize::from(Self::param(params, 0, 1));
                self.grid_mut().scroll_region_up(n);
            }
            ([], b'T') => {
                let n = usize::from(Self::param(params, 0, 1));
                self.grid_mut().scroll_region_down(n);
            }
            ([], b'b') => {
                if let Some(c) = self.last_printed {
                    // REP repeats printable characters only.
                    let n = Self::param(params, 0, 1).min(self.grid().cols());
                    for _ in 0..n {
                        self.input_print(c);
                    }
                }
            }
            ([], b'm') => self.apply_sgr(params, subparams),
            ([], b'h') => {
                if params.contains(&4) {
                    self.modes.insert = true;
                }
            }
            ([], b'l') => {
                if params.contains(&4) {
                    self.modes.insert = false;
                }
            }
            ([], b'n') => match params.first().copied().unwrap_or(0) {
                5 => self.responses.extend_from_slice(b"\x1b[0n"),
                6 => {
                    let cursor = self.grid().cursor();
                    let row = if self.modes.origin {
                        cursor.row.saturating_sub(self.grid().scroll_region().top) + 1
                    } else {
                        cursor.row + 1
                    };
                    let report = format!("\x1b[{};{}R", row, cursor.col + 1);
                    self.responses.extend_from_slice(report.as_bytes());
                }
                _ => {}
            },
            ([], b'c') => self.responses.extend_from_slice(b"\x1b[?6c"),
            ([], b'r') => {
                let rows = self.grid().rows();
                let top = Self::param(params, 0, 1) - 1;
                let bottom = Self::param(params, 1, rows) - 1;
                let grid = self.grid_mut();
                grid.set_scroll_region(top, bottom);
                grid.set_cursor(0, 0);
                if self.modes.origin {
                    let top = self.grid().scroll_region().top;
                    self.grid_mut().set_cursor(top, 0);
                }
            }
            ([], b's') => self.save_cursor(),
            ([], b'u') => self.restore_cursor(),
            ([], b'g') => match params.first().copied().unwrap_or(0) {
                0 => self.grid_mut().clear_tab_stop(),
                3 => self.grid_mut().clear_all_tab_stops(),
                _ => {}
            },
            ([b' '], b'q') => {
                self.cursor_style = CursorStyle::from_decscusr(params.first().copied().unwrap_or(0));
            }
            _ => {}
        }
    }

    /// Row parameter under origin mode: relative to the region top,
    /// clamped inside it.
    fn origin_row(&self, row1: u16) -> u16 {
        let row = row1.saturating_sub(1);
        if self.modes.origin {
            let region = self.grid().scroll_region();
            row.saturating_add(region.top).min(region.bottom)
        } else {
            row
        }
    }

    fn move_cursor_absolute(&mut self, row1: u16, col1: u16) {
        let row = self.origin_row(row1);
        self.grid_mut().set_cursor(row, col1.saturating_sub(1));
    }

    fn set_private_modes(&mut self, params: &[u16], set: bool) {
        for &mode in params {
            match mode {
                1 => self.modes.application_cursor = set,
                6 => {
                    self.modes.origin = set;
                    // Changing the addressing origin homes the cursor.
                    let home = if set { self.grid().scroll_region().top } else { 0 };
                    self.grid_mut().set_cursor(home, 0);
                }
                7 => self.modes.autowrap = set,
                25 => self.modes.cursor_visible = set,
                47 => self.switch_screen(set, false, false, false),
                1047 => self.switch_screen(set, false, true, false),
                1048 => {
                    if set {
                        self.save_cursor();
                    } else {
                        self.restore_cursor();
                    }
                }
                1049 => self.switch_screen(set, true, false, true),
                1004 => self.modes.focus_reporting = set,
                2004 => self.modes.bracketed_paste = set,
                _ => {}
            }
        }
    }

    /// Switch between the primary and alternate screens.
    ///
    /// The inactive screen's cursor and contents survive the switch; mode
    /// 1049 clears the alternate screen on entry, 1047 on exit.
    fn switch_screen(
        &mut self,
        to_alt: bool,
        clear_on_enter: bool,
        clear_on_exit: bool,
        save_cursor: bool,
    ) {
        if to_alt == self.active_is_alt {
            return;
        }
        if to_alt {
            if save_cursor {
                self.save_cursor();
            }
            self.active_is_alt = true;
            if clear_on_enter {
                self.alternate.erase_screen(StyleId::DEFAULT);
                self.alternate.set_cursor(0, 0);
            }
        } else {
            if clear_on_exit {
                self.alternate.erase_screen(StyleId::DEFAULT);
            }
            self.active_is_alt = false;
            if save_cursor {
                self.restore_cursor();
            }
        }
        self.pen_dirty = true;
        self.last_print = None;
        self.grid_mut().reset_scroll_region();
        self.grid_mut().mark_dirty_full();
    }

    fn save_cursor(&mut self) {
        let slot = usize::from(self.active_is_alt);
        self.saved[slot] = SavedContext {
            cursor: self.grid().cursor(),
            pen: self.pen,
            origin: self.modes.origin,
            charsets: self.charsets,
            active_charset: self.active_charset,
            valid: true,
        };
    }

    fn restore_cursor(&mut self) {
        let slot = usize::from(self.active_is_alt);
        let saved = self.saved[slot];
        if !saved.valid {
            return;
        }
        self.set_pen(saved.pen);
        self.modes.origin = saved.origin;
        self.charsets = saved.charsets;
        self.active_charset = saved.active_charset;
        self.grid_mut().set_cursor(saved.cursor.row, saved.cursor.col);
    }

    // ------------------------------------------------------------------
    // SGR
    // ------------------------------------------------------------------

    fn apply_sgr(&mut self, params: &[u16], subparams: u16) {
        if params.is_empty() {
            self.set_pen(Style::DEFAULT);
            return;
        }

        let mut pen = self.pen;
        let mut i = 0;
        while i < params.len() {
            let p = params[i];
            match p {
                0 => pen = Style::DEFAULT,
                1 => pen.attrs.insert(StyleAttrs::BOLD),
                2 => pen.attrs.insert(StyleAttrs::DIM),
                3 => pen.attrs.insert(StyleAttrs::ITALIC),
                4 => {
                    // 4:x selects an underline style; plain 4 is single.
                    if subparams & (1 << (i + 1)) != 0 {
                        let kind = params.get(i + 1).copied().unwrap_or(1);
                        i += 1;
                        pen.attrs.remove(StyleAttrs::ANY_UNDERLINE);
                        match kind {
                            0 => {}
                            2 => pen.attrs.insert(StyleAttrs::DOUBLE_UNDERLINE),
                            3 => pen.attrs.insert(StyleAttrs::CURLY_UNDERLINE),
                            _ => pen.attrs.insert(StyleAttrs::UNDERLINE),
                        }
                    } else {
                        pen.attrs.insert(StyleAttrs::UNDERLINE);
                    }
                }
                5 | 6 => pen.attrs.insert(StyleAttrs::BLINK),
                7 => pen.attrs.insert(StyleAttrs::REVERSE),
                8 => pen.attrs.insert(StyleAttrs::HIDDEN),
                9 => pen.attrs.insert(StyleAttrs::STRIKETHROUGH),
                21 => pen.attrs.insert(StyleAttrs::DOUBLE_UNDERLINE),
                22 => pen.attrs.remove(StyleAttrs::BOLD | StyleAttrs::DIM),
                23 => pen.attrs.remove(StyleAttrs::ITALIC),
                24 => pen.attrs.remove(StyleAttrs::ANY_UNDERLINE),
                25 => pen.attrs.remove(StyleAttrs::BLINK),
                27 => pen.attrs.remove(StyleAttrs::REVERSE),
                28 => pen.attrs.remove(StyleAttrs::HIDDEN),
                29 => pen.attrs.remove(StyleAttrs::STRIKETHROUGH),
                30..=37 => pen.fg = Color::Indexed((p - 30) as u8),
                38 => {
                    let (color, consumed) = Self::extended_color(params, i, subparams);
                    if let Some(color) = color {
                        pen.fg = color;
                    }
                    i += consumed;
                }
                39 => pen.fg = Color::Default,
                40..=47 => pen.bg = Color::Indexed((p - 40) as u8),
                48 => {
                    let (color, consumed) = Self::extended_color(params, i, subparams);
                    if let Some(color) = color {
                        pen.bg = color;
                    }
                    i += consumed;
                }
                49 => pen.bg = Color::Default,
                58 => {
                    let (color, consumed) = Self::extended_color(params, i, subparams);
                    if let Some(color) = color {
                        pen.underline_color = color;
                    }
                    i += consumed;
                }
                59 => pen.underline_color = Color::Default,
                90..=97 => pen.fg = Color::Indexed((p - 90 + 8) as u8),
                100..=107 => pen.bg = Color::Indexed((p - 100 + 8) as u8),
                _ => {}
            }
            i += 1;
        }
        self.set_pen(pen);
    }

    /// Parse an extended color at `params[i]` (38/48/58). Accepts both the
    /// `;`-separated legacy form and the `:`-subparameter form, including
    /// the variant carrying an empty colorspace id (`38:2::r:g:b`).
    /// Returns the color and the extra parameters consumed.
    fn extended_color(params: &[u16], i: usize, subparams: u16) -> (Option<Color>, usize) {
        let colon = |index: usize| index < 16 && subparams & (1 << index) != 0;
        match params.get(i + 1) {
            Some(5) => {
                let index = params.get(i + 2).copied().unwrap_or(0).min(255) as u8;
                (Some(Color::Indexed(index)), 2)
            }
            Some(2) => {
                // Colon form with a colorspace id carries four subparameters
                // after the 2; the rgb triple is the last three.
                let skip = usize::from(colon(i + 2) && colon(i + 5) && params.len() > i + 5);
                let clamp = |index: usize| params.get(index).copied().unwrap_or(0).min(255) as u8;
                let base = i + 2 + skip;
                if params.len() < base + 3 {
                    return (None, params.len().saturating_sub(i + 1));
                }
                let color = Color::Rgb(clamp(base), clamp(base + 1), clamp(base + 2));
                (Some(color), 4 + skip)
            }
            _ => (None, 1),
        }
    }

    // ------------------------------------------------------------------
    // ESC
    // ------------------------------------------------------------------

    fn input_esc(&mut self, intermediates: &[u8], final_byte: u8) {
        match (intermediates, final_byte) {
            ([], b'7') => self.save_cursor(),
            ([], b'8') => self.restore_cursor(),
            ([], b'D') => self.grid_mut().line_feed(),
            ([], b'E') => {
                let grid = self.grid_mut();
                grid.carriage_return();
                grid.line_feed();
            }
            ([], b'H') => self.grid_mut().set_tab_stop(),
            ([], b'M') => self.grid_mut().reverse_line_feed(),
            ([], b'c') => self.full_reset(),
            ([], b'=') => self.modes.application_keypad = true,
            ([], b'>') => self.modes.application_keypad = false,
            ([b'#'], b'8') => self.grid_mut().screen_alignment_pattern(),
            ([b'('], designator) => self.charsets[0] = Charset::from_designator(designator),
            ([b')'], designator) => self.charsets[1] = Charset::from_designator(designator),
            _ => {}
        }
    }

    /// RIS: reset screens, modes, pen, charsets, and palette. The title
    /// and working directory survive, as in xterm.
    fn full_reset(&mut self) {
        self.primary.reset();
        self.alternate.reset();
        self.active_is_alt = false;
        self.modes = TerminalModes::default();
        self.modes.autowrap = self.config.auto_wrap;
        self.modes.bracketed_paste = self.config.bracketed_paste;
        self.pen = Style::DEFAULT;
        self.pen_id = StyleId::DEFAULT;
        self.pen_dirty = false;
        self.charsets = [Charset::Ascii; 2];
        self.active_charset = 0;
        self.saved = [SavedContext::default(); 2];
        self.palette =
            ColorPalette::xterm(self.config.default_foreground, self.config.default_background);
        self.cursor_style = self.config.cursor_style;
        self.hyperlink = None;
        self.last_print = None;
        self.last_printed = None;
    }

    // ------------------------------------------------------------------
    // OSC
    // ------------------------------------------------------------------

    fn input_osc(&mut self, segments: &[&[u8]]) {
        let Some(command) = osc::parse(segments) else {
            return;
        };
        match command {
            OscCommand::WindowAndIconTitle(text) => {
                let text = sanitize_text(&text);
                self.title = text.clone();
                self.icon_name = text;
            }
            OscCommand::WindowTitle(text) => self.title = sanitize_text(&text),
            OscCommand::IconName(text) => self.icon_name = sanitize_text(&text),
            OscCommand::WorkingDirectory(dir) => {
                self.working_directory = Some(sanitize_text(&dir));
            }
            OscCommand::Hyperlink { id: _, uri } => {
                self.hyperlink = Some(Arc::from(uri.as_str()));
            }
            OscCommand::HyperlinkEnd => self.hyperlink = None,
            OscCommand::SetPaletteColor { index, color } => {
                self.palette.colors[usize::from(index)] = color;
            }
            OscCommand::QueryPaletteColor { index } => {
                let report = format!(
                    "\x1b]4;{};{}\x1b\\",
                    index,
                    osc::format_color_report(self.palette.colors[usize::from(index)])
                );
                self.responses.extend_from_slice(report.as_bytes());
            }
            OscCommand::SetForeground(color) => self.palette.foreground = color,
            OscCommand::QueryForeground => {
                let report = format!(
                    "\x1b]10;{}\x1b\\",
                    osc::format_color_report(self.palette.foreground)
                );
                self.responses.extend_from_slice(report.as_bytes());
            }
            OscCommand::SetBackground(color) => self.palette.background = color,
            OscCommand::QueryBackground => {
                let report = format!(
                    "\x1b]11;{}\x1b\\",
                    osc::format_color_report(self.palette.background)
                );
                self.responses.extend_from_slice(report.as_bytes());
            }
            OscCommand::ResetPaletteColor { index } => match index {
                Some(index) => {
                    self.palette.colors[usize::from(index)] = ColorPalette::default_entry(index);
                }
                None => {
                    for i in 0..=255u8 {
                        self.palette.colors[usize::from(i)] = ColorPalette::default_entry(i);
                    }
                }
            },
            OscCommand::ResetForeground => {
                self.palette.foreground = self.config.default_foreground;
            }
            OscCommand::ResetBackground => {
                self.palette.background = self.config.default_background;
            }
            OscCommand::PromptMark(mark) => {
                let flags = match mark {
                    PromptMark::PromptStart => RowFlags::PROMPT_START,
                    PromptMark::InputStart => RowFlags::PROMPT_INPUT,
                    PromptMark::OutputStart => RowFlags::PROMPT_OUTPUT,
                    PromptMark::CommandEnd { .. } => RowFlags::PROMPT_END,
                };
                let row = self.grid().cursor_row();
                self.grid_mut().mark_row_flags(row, flags);
            }
            // Clipboard access is an embedder decision; this core never
            // reads or writes one.
            OscCommand::Clipboard => {}
            OscCommand::Unknown { .. } => {}
        }
    }
}

/// Strip control characters from OSC-supplied text before storing it, so a
/// hostile title cannot smuggle escapes into whatever the embedder renders.
fn sanitize_text(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

impl ActionSink for Terminal {
    fn print(&mut self, c: char) {
        self.input_print(c);
    }

    fn print_ascii_run(&mut self, bytes: &[u8]) {
        // The bulk path requires plain replace-mode printing; insert mode
        // and open hyperlinks need per-cell bookkeeping.
        if self.modes.insert || self.hyperlink.is_some() {
            for &b in bytes {
                self.input_print(b as char);
            }
            return;
        }
        if self.charsets[self.active_charset] != Charset::Ascii {
            for &b in bytes {
                self.input_print(b as char);
            }
            return;
        }
        if bytes.is_empty() {
            return;
        }

        let autowrap = self.modes.autowrap;
        let style = self.pen_id();
        let grid = self.grid_mut();
        grid.print_ascii_run(bytes, style, autowrap);

        let cursor = grid.cursor();
        let col = if cursor.pending_wrap {
            cursor.col
        } else {
            cursor.col.saturating_sub(1)
        };
        self.last_print = Some((cursor.row, col));
        self.last_printed = Some(bytes[bytes.len() - 1] as char);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => {}
            0x08 => self.grid_mut().backspace(),
            0x09 => self.grid_mut().tab(),
            0x0A | 0x0B | 0x0C => self.grid_mut().line_feed(),
            0x0D => self.grid_mut().carriage_return(),
            0x0E => self.active_charset = 1,
            0x0F => self.active_charset = 0,
            // 8-bit C1 controls that have ESC equivalents.
            0x84 => self.grid_mut().line_feed(),
            0x85 => {
                let grid = self.grid_mut();
                grid.carriage_return();
                grid.line_feed();
            }
            0x88 => self.grid_mut().set_tab_stop(),
            0x8D => self.grid_mut().reverse_line_feed(),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &[u16], intermediates: &[u8], final_byte: u8) {
        self.input_csi(params, intermediates, final_byte, 0);
    }

    fn csi_dispatch_with_subparams(
        &mut self,
        params: &[u16],
        intermediates: &[u8],
        final_byte: u8,
        subparam_mask: u16,
    ) {
        self.input_csi(params, intermediates, final_byte, subparam_mask);
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], final_byte: u8) {
        self.input_esc(intermediates, final_byte);
    }

    fn osc_dispatch(&mut self, params: &[&[u8]]) {
        self.input_osc(params);
    }

    fn dcs_hook(&mut self, _params: &[u16], _intermediates: &[u8], _final_byte: u8) {
        self.dcs = DcsState {
            active: true,
            len: 0,
        };
    }

    fn dcs_put(&mut self, _byte: u8) {
        // Payload bytes are counted but discarded; no DCS protocol is
        // interpreted and memory stays bounded.
        if self.dcs.active && self.dcs.len < MAX_DCS_DATA {
            self.dcs.len += 1;
        }
    }

    fn dcs_unhook(&mut self) {
        self.dcs = DcsState::default();
    }
}
