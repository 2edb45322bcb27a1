//! OSC (Operating System Command) sub-parser.
//!
//! The byte-stream parser accumulates an OSC payload and splits it on `;`
//! into raw segments; this module classifies those segments into a typed
//! [`OscCommand`] by the leading numeric code.
//!
//! Failure is always soft: an unknown code yields [`OscCommand::Unknown`],
//! and a malformed payload (non-numeric code, wrong arity, bad color spec)
//! yields `None`. Neither case disturbs parser state: the effect is simply
//! dropped and the next sequence parses normally.
//!
//! Text fields (titles, URIs, directories) are decoded lossily: a hostile
//! payload with broken UTF-8 degrades to replacement characters instead of
//! suppressing the whole command.

use crate::grid::style::Rgb;

/// Semantic prompt marks (OSC 133, the FinalTerm/iTerm2 shell protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMark {
    /// `133;A`: start of the shell prompt.
    PromptStart,
    /// `133;B`: end of the prompt, start of user input.
    InputStart,
    /// `133;C`: start of command output.
    OutputStart,
    /// `133;D[;exit]`: command finished, optionally with its exit code.
    CommandEnd {
        /// Exit code, when the shell reported one.
        exit_code: Option<i32>,
    },
}

/// A recognized OSC command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OscCommand {
    /// OSC 0: set window title and icon name.
    WindowAndIconTitle(String),
    /// OSC 1: set icon name.
    IconName(String),
    /// OSC 2: set window title.
    WindowTitle(String),
    /// OSC 4: set one palette entry.
    SetPaletteColor {
        /// Palette index (0..=255).
        index: u8,
        /// The new color.
        color: Rgb,
    },
    /// OSC 4 with a `?` spec: report one palette entry.
    QueryPaletteColor {
        /// Palette index (0..=255).
        index: u8,
    },
    /// OSC 7: working directory (a `file://` URL by convention).
    WorkingDirectory(String),
    /// OSC 8: open a hyperlink region.
    Hyperlink {
        /// Optional `id=` parameter for multi-cell link identity.
        id: Option<String>,
        /// Link target.
        uri: String,
    },
    /// OSC 8 with an empty URI: close the hyperlink region.
    HyperlinkEnd,
    /// OSC 10: set the default foreground.
    SetForeground(Rgb),
    /// OSC 10;?: report the default foreground.
    QueryForeground,
    /// OSC 11: set the default background.
    SetBackground(Rgb),
    /// OSC 11;?: report the default background.
    QueryBackground,
    /// OSC 52: clipboard access. Recognized so embedders can see it was
    /// asked for, but this core never reads or writes a clipboard.
    Clipboard,
    /// OSC 104: reset palette entries (all of them when `index` is None).
    ResetPaletteColor {
        /// Specific entry to reset, or the whole palette.
        index: Option<u8>,
    },
    /// OSC 110: reset the default foreground.
    ResetForeground,
    /// OSC 111: reset the default background.
    ResetBackground,
    /// OSC 133: semantic prompt mark.
    PromptMark(PromptMark),
    /// Numeric code this core does not interpret.
    Unknown {
        /// The leading code, clamped to `u16::MAX`.
        code: u16,
    },
}

/// Classify raw OSC segments into a command.
///
/// `params` is the payload split on `;` (the first segment is the numeric
/// code). Returns `None` when the payload is malformed.
#[must_use]
pub fn parse(params: &[&[u8]]) -> Option<OscCommand> {
    let code = parse_number(params.first()?)?;

    match code {
        0 => Some(OscCommand::WindowAndIconTitle(join_text(&params[1..]))),
        1 => Some(OscCommand::IconName(join_text(&params[1..]))),
        2 => Some(OscCommand::WindowTitle(join_text(&params[1..]))),
        4 => parse_palette(params),
        7 => Some(OscCommand::WorkingDirectory(join_text(&params[1..]))),
        8 => parse_hyperlink(params),
        10 => parse_dynamic_color(params, OscCommand::QueryForeground, OscCommand::SetForeground),
        11 => parse_dynamic_color(params, OscCommand::QueryBackground, OscCommand::SetBackground),
        52 => Some(OscCommand::Clipboard),
        104 => {
            let index = match params.get(1) {
                Some(seg) if !seg.is_empty() => Some(parse_index(seg)?),
                _ => None,
            };
            Some(OscCommand::ResetPaletteColor { index })
        }
        110 => Some(OscCommand::ResetForeground),
        111 => Some(OscCommand::ResetBackground),
        133 => parse_prompt_mark(params),
        other => Some(OscCommand::Unknown {
            code: other.min(u32::from(u16::MAX)) as u16,
        }),
    }
}

/// Parse an xterm color specification: `rgb:RR/GG/BB` (1..=4 hex digits per
/// channel, scaled to 8 bits) or `#RGB` / `#RRGGBB` / `#RRRGGGBBB` /
/// `#RRRRGGGGBBBB`.
#[must_use]
pub fn parse_color_spec(spec: &str) -> Option<Rgb> {
    if let Some(body) = spec.strip_prefix("rgb:") {
        let mut channels = body.split('/');
        let r = scale_hex_channel(channels.next()?)?;
        let g = scale_hex_channel(channels.next()?)?;
        let b = scale_hex_channel(channels.next()?)?;
        if channels.next().is_some() {
            return None;
        }
        return Some((r, g, b));
    }

    if let Some(body) = spec.strip_prefix('#') {
        if body.len() % 3 != 0 {
            return None;
        }
        let digits = body.len() / 3;
        if !(1..=4).contains(&digits) {
            return None;
        }
        let r = scale_hex_channel(&body[..digits])?;
        let g = scale_hex_channel(&body[digits..2 * digits])?;
        let b = scale_hex_channel(&body[2 * digits..])?;
        return Some((r, g, b));
    }

    None
}

/// Format a color the way xterm reports it: `rgb:rrrr/gggg/bbbb`.
#[must_use]
pub fn format_color_report((r, g, b): Rgb) -> String {
    // xterm reports 16-bit channels by repeating the 8-bit value.
    format!(
        "rgb:{r:02x}{r:02x}/{g:02x}{g:02x}/{b:02x}{b:02x}",
        r = r,
        g = g,
        b = b
    )
}

fn parse_palette(params: &[&[u8]]) -> Option<OscCommand> {
    // 4;index;spec. Extra index/spec pairs are legal in xterm; only the
    // first pair is interpreted here.
    let index = parse_index(params.get(1)?)?;
    let spec = text(params.get(2)?);
    if spec == "?" {
        Some(OscCommand::QueryPaletteColor { index })
    } else {
        Some(OscCommand::SetPaletteColor {
            index,
            color: parse_color_spec(&spec)?,
        })
    }
}

fn parse_hyperlink(params: &[&[u8]]) -> Option<OscCommand> {
    // 8;params;uri. The URI may itself contain ';', so rejoin everything
    // past the second segment.
    let link_params = params.get(1)?;
    let uri = join_text(&params[2..]);
    if uri.is_empty() {
        return Some(OscCommand::HyperlinkEnd);
    }

    let id = text(link_params)
        .split(':')
        .find_map(|kv| kv.strip_prefix("id=").map(str::to_owned))
        .filter(|id| !id.is_empty());

    Some(OscCommand::Hyperlink { id, uri })
}

fn parse_dynamic_color(
    params: &[&[u8]],
    query: OscCommand,
    set: impl FnOnce(Rgb) -> OscCommand,
) -> Option<OscCommand> {
    let spec = text(params.get(1)?);
    if spec == "?" {
        Some(query)
    } else {
        Some(set(parse_color_spec(&spec)?))
    }
}

fn parse_prompt_mark(params: &[&[u8]]) -> Option<OscCommand> {
    let mark = match *params.get(1)? {
        b"A" => PromptMark::PromptStart,
        b"B" => PromptMark::InputStart,
        b"C" => PromptMark::OutputStart,
        seg if seg.starts_with(b"D") => {
            let exit_code = match params.get(2) {
                Some(code) if !code.is_empty() => Some(
                    std::str::from_utf8(code)
                        .ok()
                        .and_then(|s| s.parse::<i32>().ok())?,
                ),
                _ => None,
            };
            PromptMark::CommandEnd { exit_code }
        }
        _ => return None,
    };
    Some(OscCommand::PromptMark(mark))
}

/// Decimal number; `None` when empty or non-numeric. Saturates far above
/// any assigned OSC code.
fn parse_number(segment: &[u8]) -> Option<u32> {
    if segment.is_empty() || segment.len() > 9 {
        return None;
    }
    let mut value: u32 = 0;
    for &b in segment {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u32::from(b - b'0');
    }
    Some(value)
}

fn parse_index(segment: &[u8]) -> Option<u8> {
    let value = parse_number(segment)?;
    u8::try_from(value).ok()
}

fn text(segment: &[u8]) -> String {
    String::from_utf8_lossy(segment).into_owned()
}

/// Rejoin segments that the splitter separated, restoring interior `;`.
fn join_text(segments: &[&[u8]]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&String::from_utf8_lossy(seg));
    }
    out
}

/// Scale a 1..=4 hex digit channel to 8 bits.
fn scale_hex_channel(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    let max = (1u32 << (4 * digits.len())) - 1;
    Some((value * 255 / max) as u8)
}
