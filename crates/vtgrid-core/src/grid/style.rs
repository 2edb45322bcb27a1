//! Style interning.
//!
//! Most cells share a handful of styles. Storing a 2-byte [`StyleId`] per
//! cell and interning the unique `{fg, bg, underline color, attributes}`
//! combinations in one table keeps cells at 8 bytes while supporting
//! truecolor and underline colors everywhere. Real sessions hold tens to a
//! few hundred unique styles, nowhere near the 65k table limit.

use std::fmt;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

/// RGB color tuple (R, G, B).
pub type Rgb = (u8, u8, u8);

/// A style identifier: an index into a [`StyleTable`].
///
/// Id 0 is always the default style (default fg on default bg, no
/// attributes) and is valid in any table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct StyleId(pub u16);

impl StyleId {
    /// The default style.
    pub const DEFAULT: StyleId = StyleId(0);

    /// Check for the default style.
    #[must_use]
    #[inline]
    pub const fn is_default(self) -> bool {
        self.0 == 0
    }

    /// Raw index value.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "style:{}", self.0)
    }
}

/// A cell color.
///
/// `Default` defers to the terminal's configured foreground or background,
/// which keeps cells correct across OSC 10/11 palette changes without
/// rewriting the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal default for this position (fg or bg).
    #[default]
    Default,
    /// An entry of the 256-color palette.
    Indexed(u8),
    /// A truecolor value.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Resolve to RGB against a palette lookup and a default.
    #[must_use]
    pub fn resolve(self, palette: &[Rgb; 256], default: Rgb) -> Rgb {
        match self {
            Color::Default => default,
            Color::Indexed(i) => palette[usize::from(i)],
            Color::Rgb(r, g, b) => (r, g, b),
        }
    }
}

bitflags! {
    /// Graphic rendition attributes (SGR).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleAttrs: u16 {
        /// SGR 1.
        const BOLD = 1 << 0;
        /// SGR 2.
        const DIM = 1 << 1;
        /// SGR 3.
        const ITALIC = 1 << 2;
        /// SGR 4.
        const UNDERLINE = 1 << 3;
        /// SGR 21 / 4:2.
        const DOUBLE_UNDERLINE = 1 << 4;
        /// SGR 4:3.
        const CURLY_UNDERLINE = 1 << 5;
        /// SGR 5 and 6.
        const BLINK = 1 << 6;
        /// SGR 7.
        const REVERSE = 1 << 7;
        /// SGR 8.
        const HIDDEN = 1 << 8;
        /// SGR 9.
        const STRIKETHROUGH = 1 << 9;
    }
}

impl StyleAttrs {
    /// All underline variants.
    pub const ANY_UNDERLINE: StyleAttrs = StyleAttrs::UNDERLINE
        .union(StyleAttrs::DOUBLE_UNDERLINE)
        .union(StyleAttrs::CURLY_UNDERLINE);
}

/// A graphic rendition: colors plus attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Underline color (SGR 58/59); `Default` means "same as foreground".
    pub underline_color: Color,
    /// Attribute bits.
    pub attrs: StyleAttrs,
}

impl Style {
    /// The default style.
    pub const DEFAULT: Style = Style {
        fg: Color::Default,
        bg: Color::Default,
        underline_color: Color::Default,
        attrs: StyleAttrs::empty(),
    };

    /// Create a style from colors and attributes.
    #[must_use]
    pub const fn new(fg: Color, bg: Color, attrs: StyleAttrs) -> Self {
        Self {
            fg,
            bg,
            underline_color: Color::Default,
            attrs,
        }
    }

    /// Check for the default style.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Style::DEFAULT
    }
}

/// Statistics for [`StyleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleTableStats {
    /// Number of interned styles (including the default).
    pub unique_styles: usize,
    /// Approximate memory held by the table.
    pub memory_bytes: usize,
}

/// Interning table mapping styles to 2-byte ids.
#[derive(Debug, Clone)]
pub struct StyleTable {
    styles: Vec<Style>,
    index: FxHashMap<Style, StyleId>,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleTable {
    /// Create a table holding only the default style.
    #[must_use]
    pub fn new() -> Self {
        let mut index = FxHashMap::default();
        index.insert(Style::DEFAULT, StyleId::DEFAULT);
        Self {
            styles: vec![Style::DEFAULT],
            index,
        }
    }

    /// Intern a style, returning its id.
    ///
    /// A full table (65k unique styles) falls back to the default id rather
    /// than failing; the byte stream must not be able to error the session.
    pub fn intern(&mut self, style: Style) -> StyleId {
        if let Some(&id) = self.index.get(&style) {
            return id;
        }
        let Ok(raw) = u16::try_from(self.styles.len()) else {
            return StyleId::DEFAULT;
        };
        let id = StyleId(raw);
        self.styles.push(style);
        self.index.insert(style, id);
        id
    }

    /// Look up a style by id.
    #[must_use]
    #[inline]
    pub fn get(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(usize::from(id.0))
    }

    /// Look up a style by id, defaulting on a stale id.
    #[must_use]
    #[inline]
    pub fn resolve(&self, id: StyleId) -> Style {
        self.styles
            .get(usize::from(id.0))
            .copied()
            .unwrap_or(Style::DEFAULT)
    }

    /// Number of interned styles.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Always false: the default style is never removed.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Table statistics.
    #[must_use]
    pub fn stats(&self) -> StyleTableStats {
        StyleTableStats {
            unique_styles: self.styles.len(),
            memory_bytes: self.styles.capacity() * std::mem::size_of::<Style>()
                + self.index.capacity()
                    * (std::mem::size_of::<Style>() + std::mem::size_of::<StyleId>()),
        }
    }

    /// Drop everything but the default style.
    ///
    /// Invalidates outstanding ids; only call on terminal reset.
    pub fn clear(&mut self) {
        self.styles.truncate(1);
        self.index.clear();
        self.index.insert(Style::DEFAULT, StyleId::DEFAULT);
    }
}
