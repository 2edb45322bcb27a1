//! Packed cell representation.
//!
//! One cell is 8 bytes: a codepoint, an interned style id, and flags. The
//! content variants are: empty, a single codepoint, the lead half of a wide
//! character, the spacer half of a wide character, and a grapheme cluster
//! whose combining codepoints overflow into [`CellExtras`].
//!
//! Invariant maintained by the row write primitives: a `WIDE` cell is always
//! followed, in the same row, by exactly one `WIDE_SPACER` cell. Spacers
//! carry no content and are skipped by text extraction.
//!
//! [`CellExtras`]: super::extra::CellExtras

use bitflags::bitflags;

use super::style::StyleId;

bitflags! {
    /// Per-cell flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u16 {
        /// Lead half of a double-width character.
        const WIDE = 1 << 0;
        /// Spacer half of a double-width character.
        const WIDE_SPACER = 1 << 1;
        /// The full grapheme lives in the cell-extras table (combining
        /// marks were appended to this cell).
        const COMPLEX = 1 << 2;
        /// An OSC 8 hyperlink is attached in the cell-extras table.
        const HYPERLINK = 1 << 3;
    }
}

/// One grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Cell {
    content: u32,
    style: StyleId,
    flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Cell {
    /// An empty cell with the default style.
    pub const EMPTY: Cell = Cell {
        content: 0,
        style: StyleId::DEFAULT,
        flags: CellFlags::empty(),
    };

    /// A cell holding one codepoint.
    #[must_use]
    #[inline]
    pub const fn new(c: char, style: StyleId) -> Self {
        Self {
            content: c as u32,
            style,
            flags: CellFlags::empty(),
        }
    }

    /// An empty cell that keeps a background style (erase fills).
    #[must_use]
    #[inline]
    pub const fn blank(style: StyleId) -> Self {
        Self {
            content: 0,
            style,
            flags: CellFlags::empty(),
        }
    }

    /// The lead half of a wide character.
    #[must_use]
    #[inline]
    pub const fn wide_lead(c: char, style: StyleId) -> Self {
        Self {
            content: c as u32,
            style,
            flags: CellFlags::WIDE,
        }
    }

    /// The spacer half of a wide character.
    #[must_use]
    #[inline]
    pub const fn wide_spacer(style: StyleId) -> Self {
        Self {
            content: 0,
            style,
            flags: CellFlags::WIDE_SPACER,
        }
    }

    /// Fast constructor for printable ASCII with a style.
    #[must_use]
    #[inline]
    pub const fn from_ascii(byte: u8, style: StyleId) -> Self {
        Self {
            content: byte as u32,
            style,
            flags: CellFlags::empty(),
        }
    }

    /// The stored codepoint, or space for empty/spacer cells.
    #[must_use]
    #[inline]
    pub fn char(&self) -> char {
        if self.content == 0 {
            ' '
        } else {
            char::from_u32(self.content).unwrap_or(char::REPLACEMENT_CHARACTER)
        }
    }

    /// The raw codepoint value (0 = empty).
    #[must_use]
    #[inline]
    pub fn codepoint(&self) -> u32 {
        self.content
    }

    /// True when the cell holds no content (empty or erase fill).
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content == 0 && !self.flags.intersects(CellFlags::WIDE_SPACER | CellFlags::COMPLEX)
    }

    /// Lead half of a wide character.
    #[must_use]
    #[inline]
    pub fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE)
    }

    /// Spacer half of a wide character.
    #[must_use]
    #[inline]
    pub fn is_wide_spacer(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_SPACER)
    }

    /// Grapheme continues in the cell-extras table.
    #[must_use]
    #[inline]
    pub fn is_complex(&self) -> bool {
        self.flags.contains(CellFlags::COMPLEX)
    }

    /// The interned style id.
    #[must_use]
    #[inline]
    pub fn style(&self) -> StyleId {
        self.style
    }

    /// Flag bits.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    /// Set a flag.
    #[inline]
    pub fn insert_flags(&mut self, flags: CellFlags) {
        self.flags.insert(flags);
    }

    /// Replace the style id.
    #[inline]
    pub fn set_style(&mut self, style: StyleId) {
        self.style = style;
    }
}
