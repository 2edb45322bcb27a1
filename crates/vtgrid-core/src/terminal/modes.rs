//! Terminal modes, cursor styles, and character set designation.

/// ANSI and DEC private modes tracked by the terminal.
///
/// Only modes that change this core's behavior are stored; modes that only
/// concern an input encoder (application cursor keys, keypad) are tracked
/// so embedders can query them, but have no effect here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalModes {
    /// IRM (mode 4): printing shifts existing cells right.
    pub insert: bool,
    /// DECOM (?6): cursor addressing is relative to the scroll region.
    pub origin: bool,
    /// DECAWM (?7): printing past the last column wraps.
    pub autowrap: bool,
    /// DECTCEM (?25): the cursor is visible.
    pub cursor_visible: bool,
    /// DECCKM (?1): cursor keys send application sequences.
    pub application_cursor: bool,
    /// DECKPAM/DECKPNM: keypad sends application sequences.
    pub application_keypad: bool,
    /// Mode ?2004: paste is bracketed with `ESC [200~` / `ESC [201~`.
    pub bracketed_paste: bool,
    /// Mode ?1004: focus in/out reporting.
    pub focus_reporting: bool,
}

impl Default for TerminalModes {
    fn default() -> Self {
        Self {
            insert: false,
            origin: false,
            autowrap: true,
            cursor_visible: true,
            application_cursor: false,
            application_keypad: false,
            bracketed_paste: false,
            focus_reporting: false,
        }
    }
}

/// Cursor shape, set by DECSCUSR (`CSI Ps SP q`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    /// Ps 0/1.
    #[default]
    BlinkingBlock,
    /// Ps 2.
    SteadyBlock,
    /// Ps 3.
    BlinkingUnderline,
    /// Ps 4.
    SteadyUnderline,
    /// Ps 5.
    BlinkingBar,
    /// Ps 6.
    SteadyBar,
}

impl CursorStyle {
    /// Map a DECSCUSR parameter. Unknown values fall back to the default.
    #[must_use]
    pub fn from_decscusr(param: u16) -> Self {
        match param {
            0 | 1 => CursorStyle::BlinkingBlock,
            2 => CursorStyle::SteadyBlock,
            3 => CursorStyle::BlinkingUnderline,
            4 => CursorStyle::SteadyUnderline,
            5 => CursorStyle::BlinkingBar,
            6 => CursorStyle::SteadyBar,
            _ => CursorStyle::default(),
        }
    }
}

/// A designated character set (ESC `(` / ESC `)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// ASCII (designator `B`).
    #[default]
    Ascii,
    /// DEC Special Graphics (designator `0`), the line-drawing characters.
    DecSpecial,
}

impl Charset {
    /// Map a designator final byte. Unsupported sets degrade to ASCII.
    #[must_use]
    pub fn from_designator(byte: u8) -> Self {
        match byte {
            b'0' => Charset::DecSpecial,
            _ => Charset::Ascii,
        }
    }

    /// Translate a printable character through this set.
    #[must_use]
    pub fn translate(self, c: char) -> char {
        match self {
            Charset::Ascii => c,
            Charset::DecSpecial => dec_special(c),
        }
    }
}

/// DEC Special Graphics mapping for `_` and `` ` `` through `~`.
fn dec_special(c: char) -> char {
    match c {
        '_' => ' ',
        '`' => '◆',
        'a' => '▒',
        'b' => '␉',
        'c' => '␌',
        'd' => '␍',
        'e' => '␊',
        'f' => '°',
        'g' => '±',
        'h' => '␤',
        'i' => '␋',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_vt_reset_state() {
        let modes = TerminalModes::default();
        assert!(modes.autowrap);
        assert!(modes.cursor_visible);
        assert!(!modes.insert);
        assert!(!modes.origin);
        assert!(!modes.bracketed_paste);
    }

    #[test]
    fn decscusr_mapping() {
        assert_eq!(CursorStyle::from_decscusr(0), CursorStyle::BlinkingBlock);
        assert_eq!(CursorStyle::from_decscusr(2), CursorStyle::SteadyBlock);
        assert_eq!(CursorStyle::from_decscusr(6), CursorStyle::SteadyBar);
        assert_eq!(CursorStyle::from_decscusr(99), CursorStyle::BlinkingBlock);
    }

    #[test]
    fn dec_special_translates_line_drawing() {
        assert_eq!(Charset::DecSpecial.translate('q'), '─');
        assert_eq!(Charset::DecSpecial.translate('x'), '│');
        assert_eq!(Charset::DecSpecial.translate('l'), '┌');
        // Characters outside the graphics range pass through.
        assert_eq!(Charset::DecSpecial.translate('A'), 'A');
        assert_eq!(Charset::Ascii.translate('q'), 'q');
    }

    #[test]
    fn unknown_designator_is_ascii() {
        assert_eq!(Charset::from_designator(b'B'), Charset::Ascii);
        assert_eq!(Charset::from_designator(b'0'), Charset::DecSpecial);
        assert_eq!(Charset::from_designator(b'Z'), Charset::Ascii);
    }
}
