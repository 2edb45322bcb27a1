//! Runtime terminal configuration.
//!
//! Bundles the settings an embedder can change without recreating the
//! terminal. [`Terminal::apply_config`](crate::terminal::Terminal::apply_config)
//! diffs the new configuration against the active one, applies the
//! differences, and returns the list of [`ConfigChange`]s so a host UI can
//! react (repaint colors, restyle the cursor) without polling.

use crate::grid::style::Rgb;
use crate::terminal::CursorStyle;

/// Default word separators for semantic (word) selection.
pub const DEFAULT_WORD_SEPARATORS: &str = " \t'\"`|:;,()[]{}<>";

/// Terminal settings applied at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    /// Cursor shape. Escape sequences (DECSCUSR) override this until reset.
    pub cursor_style: CursorStyle,
    /// Whether the cursor blinks.
    pub cursor_blink: bool,
    /// Whether the cursor is shown (DECTCEM can still hide it).
    pub cursor_visible: bool,
    /// Default foreground color (OSC 10 can still override it).
    pub default_foreground: Rgb,
    /// Default background color (OSC 11 can still override it).
    pub default_background: Rgb,
    /// Scrollback rows retained beyond the visible screen.
    pub scrollback_limit: usize,
    /// Autowrap (DECAWM) state applied on reset.
    pub auto_wrap: bool,
    /// Bracketed paste (mode 2004) state applied on reset.
    pub bracketed_paste: bool,
    /// Characters that delimit words for semantic selection.
    pub word_separators: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cursor_style: CursorStyle::default(),
            cursor_blink: true,
            cursor_visible: true,
            default_foreground: (229, 229, 229),
            default_background: (0, 0, 0),
            scrollback_limit: 10_000,
            auto_wrap: true,
            bracketed_paste: false,
            word_separators: DEFAULT_WORD_SEPARATORS.to_owned(),
        }
    }
}

impl TerminalConfig {
    /// A configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against another configuration and list what differs.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<ConfigChange> {
        let mut changes = Vec::new();
        if self.cursor_style != other.cursor_style
            || self.cursor_blink != other.cursor_blink
            || self.cursor_visible != other.cursor_visible
        {
            changes.push(ConfigChange::Cursor);
        }
        if self.default_foreground != other.default_foreground
            || self.default_background != other.default_background
        {
            changes.push(ConfigChange::Colors);
        }
        if self.scrollback_limit != other.scrollback_limit {
            changes.push(ConfigChange::ScrollbackLimit);
        }
        if self.auto_wrap != other.auto_wrap {
            changes.push(ConfigChange::AutoWrap);
        }
        if self.bracketed_paste != other.bracketed_paste {
            changes.push(ConfigChange::BracketedPaste);
        }
        if self.word_separators != other.word_separators {
            changes.push(ConfigChange::WordSeparators);
        }
        changes
    }
}

/// One difference between two configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    /// Cursor style, blink, or visibility.
    Cursor,
    /// Default foreground or background.
    Colors,
    /// Scrollback limit.
    ScrollbackLimit,
    /// Autowrap default.
    AutoWrap,
    /// Bracketed paste default.
    BracketedPaste,
    /// Word separator set.
    WordSeparators,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_configs_diff_empty() {
        let config = TerminalConfig::default();
        assert!(config.diff(&config.clone()).is_empty());
    }

    #[test]
    fn diff_reports_each_category_once() {
        let base = TerminalConfig::default();
        let mut changed = base.clone();
        changed.cursor_blink = false;
        changed.cursor_visible = false;
        changed.scrollback_limit = 500;
        changed.default_background = (30, 30, 30);

        let changes = base.diff(&changed);
        assert_eq!(changes.len(), 3);
        assert!(changes.contains(&ConfigChange::Cursor));
        assert!(changes.contains(&ConfigChange::Colors));
        assert!(changes.contains(&ConfigChange::ScrollbackLimit));
    }

    #[test]
    fn word_separator_change_detected() {
        let base = TerminalConfig::default();
        let mut changed = base.clone();
        changed.word_separators = " ".to_owned();
        assert_eq!(base.diff(&changed), vec![ConfigChange::WordSeparators]);
    }
}
