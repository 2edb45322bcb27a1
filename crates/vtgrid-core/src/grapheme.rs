//! Unicode width and grapheme helpers for the print path.
//!
//! A terminal cell grid needs two answers per codepoint: how many columns
//! it occupies (0, 1, or 2) and whether it extends the previous cell's
//! grapheme instead of starting a new one. Width comes from
//! `unicode-width` (East Asian Width / wcwidth semantics); cluster
//! boundaries come from `unicode-segmentation` (UAX #29) for the helpers
//! that operate on whole strings.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Terminal column width of one codepoint: 0 (combining/zero-width),
/// 1, or 2 (East Asian wide).
#[must_use]
#[inline]
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0).min(2)
}

/// True when `c` occupies no column of its own and attaches to the
/// preceding cell (combining marks, zero-width joiners, variation
/// selectors).
#[must_use]
#[inline]
pub fn is_zero_width(c: char) -> bool {
    c != '\u{00}' && UnicodeWidthChar::width(c).unwrap_or(0) == 0
}

/// Display width of a string in terminal columns.
#[must_use]
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// One grapheme cluster with its display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grapheme<'a> {
    /// The cluster.
    pub grapheme: &'a str,
    /// Byte offset in the source string.
    pub byte_offset: usize,
    /// Columns occupied (0, 1, or 2).
    pub width: usize,
    /// Codepoints in the cluster.
    pub codepoint_count: usize,
}

impl Grapheme<'_> {
    /// First codepoint of the cluster.
    #[must_use]
    pub fn base_char(&self) -> char {
        self.grapheme.chars().next().unwrap_or(' ')
    }

    /// True when the cluster carries marks beyond its base character.
    #[must_use]
    pub fn has_combining(&self) -> bool {
        self.codepoint_count > 1
    }
}

/// Iterate the grapheme clusters of a string.
pub fn split_graphemes(s: &str) -> impl Iterator<Item = Grapheme<'_>> {
    s.grapheme_indices(true).map(|(byte_offset, grapheme)| Grapheme {
        grapheme,
        byte_offset,
        width: UnicodeWidthStr::width(grapheme).min(2),
        codepoint_count: grapheme.chars().count(),
    })
}
