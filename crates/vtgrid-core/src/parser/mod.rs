//! VT500-series escape sequence parser.
//!
//! ## Design
//!
//! Table-driven state machine in the shape of the
//! [vt100.net DEC ANSI parser](https://vt100.net/emu/dec_ansi_parser),
//! with UTF-8 decoding layered over ground state via [`crate::utf8`].
//!
//! Everything the parser accumulates is bounded: parameters
//! ([`MAX_PARAMS`]), intermediates ([`MAX_INTERMEDIATES`]), and OSC payloads
//! ([`MAX_OSC_DATA`]). Overflow is discarded, never an error: a malformed
//! or hostile sequence can skew its own interpretation but cannot hang the
//! session, grow memory without limit, or desynchronize subsequent
//! sequences.
//!
//! ## Entry points
//!
//! - [`Parser::advance`] processes bytes one at a time through the table.
//! - [`Parser::advance_fast`] additionally scans ground-state runs of
//!   printable ASCII eight bytes at a time and short-circuits simple CSI
//!   sequences. Its output is identical to `advance` for every input.

mod action;
mod simd;
mod state;
mod table;

pub use action::{ActionSink, NullSink};
pub use simd::{find_special_byte, take_printable};
pub use state::State;
pub use table::{ActionType, Transition, TRANSITIONS};

use arrayvec::ArrayVec;
use memchr::memchr_iter;

use crate::utf8::{Decode, Utf8Decoder};

/// Maximum number of CSI/DCS parameters.
pub const MAX_PARAMS: usize = 16;

/// Maximum number of intermediate bytes.
pub const MAX_INTERMEDIATES: usize = 4;

/// Maximum accumulated OSC payload (bytes beyond this are discarded).
pub const MAX_OSC_DATA: usize = 65536;

/// Maximum number of `;`-separated OSC segments passed to the sink.
pub const MAX_OSC_PARAMS: usize = 8;

/// The byte-stream state machine.
///
/// ## Example
///
/// ```
/// use vtgrid_core::parser::{ActionSink, Parser};
///
/// #[derive(Default)]
/// struct Collect(String);
/// impl ActionSink for Collect {
///     fn print(&mut self, c: char) { self.0.push(c); }
///     fn execute(&mut self, _byte: u8) {}
///     fn csi_dispatch(&mut self, _p: &[u16], _i: &[u8], _f: u8) {}
///     fn esc_dispatch(&mut self, _i: &[u8], _f: u8) {}
///     fn osc_dispatch(&mut self, _p: &[&[u8]]) {}
///     fn dcs_hook(&mut self, _p: &[u16], _i: &[u8], _f: u8) {}
///     fn dcs_put(&mut self, _byte: u8) {}
///     fn dcs_unhook(&mut self) {}
/// }
///
/// let mut parser = Parser::new();
/// let mut sink = Collect::default();
/// parser.advance_fast(b"\x1b[1mbold\x1b[0m", &mut sink);
/// assert_eq!(sink.0, "bold");
/// ```
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    params: ArrayVec<u16, MAX_PARAMS>,
    intermediates: ArrayVec<u8, MAX_INTERMEDIATES>,
    osc_data: Vec<u8>,
    current_param: u32,
    param_started: bool,
    /// A DCS handler is hooked and expects put/unhook.
    dcs_active: bool,
    /// Inside an APC string (as opposed to SOS/PM, which are discarded).
    apc_active: bool,
    /// Ground-state UTF-8 decoding.
    utf8: Utf8Decoder,
    /// Bit `i` set when `params[i]` was introduced by `:` (subparameter).
    subparam_mask: u16,
    last_was_colon: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser in the ground state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: ArrayVec::new_const(),
            intermediates: ArrayVec::new_const(),
            osc_data: Vec::with_capacity(128),
            current_param: 0,
            param_started: false,
            dcs_active: false,
            apc_active: false,
            utf8: Utf8Decoder::new(),
            subparam_mask: 0,
            last_was_colon: false,
        }
    }

    /// Reset to ground state, dropping any partial sequence.
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear();
        self.osc_data.clear();
        self.dcs_active = false;
        self.apc_active = false;
        self.utf8.reset();
    }

    /// Current state.
    #[must_use]
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Subparameter mask of the most recent CSI dispatch.
    #[must_use]
    #[inline]
    pub fn subparam_mask(&self) -> u16 {
        self.subparam_mask
    }

    /// Debug-build check of the parser's structural invariants.
    ///
    /// Release builds do nothing: the byte stream is untrusted and must
    /// never be able to trigger a panic.
    #[inline]
    pub fn assert_invariants(&self) {
        #[cfg(debug_assertions)]
        {
            assert!((self.state as usize) < State::COUNT);
            assert!(self.params.len() <= MAX_PARAMS);
            assert!(self.intermediates.len() <= MAX_INTERMEDIATES);
            assert!(self.osc_data.len() <= MAX_OSC_DATA);
            assert!(
                !(self.dcs_active && self.apc_active),
                "DCS and APC strings cannot be active at once"
            );
        }
    }

    /// Process input one byte at a time.
    pub fn advance<S: ActionSink>(&mut self, input: &[u8], sink: &mut S) {
        for &byte in input {
            self.process_byte(byte, sink);
        }
    }

    /// Process input with the ground-state fast path.
    ///
    /// Printable ASCII runs are located with wide scanning and handed to
    /// [`ActionSink::print_ascii_run`] in bulk; simple CSI sequences are
    /// parsed without re-entering the table per byte. Produces the same
    /// sink calls as [`advance`](Self::advance) for every input.
    pub fn advance_fast<S: ActionSink>(&mut self, input: &[u8], sink: &mut S) {
        let mut remaining = input;

        while !remaining.is_empty() {
            if self.state != State::Ground || !self.utf8.is_idle() {
                self.process_byte(remaining[0], sink);
                remaining = &remaining[1..];
                continue;
            }

            let (printable, rest) = simd::take_printable(remaining);
            if !printable.is_empty() {
                sink.print_ascii_run(printable);
            }
            remaining = rest;
            let Some((&byte, _)) = remaining.split_first() else {
                break;
            };

            if byte == 0x1B && remaining.len() >= 2 && remaining[1] == b'[' {
                if let Some(consumed) = self.try_parse_csi_fast(&remaining[2..], sink) {
                    remaining = &remaining[2 + consumed..];
                    continue;
                }
            }

            self.process_byte(byte, sink);
            remaining = &remaining[1..];
        }
    }

    /// Process one byte.
    #[inline]
    pub fn process_byte<S: ActionSink>(&mut self, byte: u8, sink: &mut S) {
        if self.state == State::Ground {
            if !self.utf8.is_idle() {
                self.process_utf8_byte(byte, sink);
                return;
            }
            // 0x80..=0x9F standalone are 8-bit C1 controls; 0xA0 and above
            // start (or fail) a UTF-8 sequence.
            if byte >= 0xA0 {
                self.process_utf8_byte(byte, sink);
                return;
            }
        }
        self.process_byte_table(byte, sink);
    }

    /// Route a ground-state byte through the UTF-8 decoder.
    fn process_utf8_byte<S: ActionSink>(&mut self, byte: u8, sink: &mut S) {
        match self.utf8.push(byte) {
            Decode::Incomplete => {}
            Decode::Char(c) => sink.print(c),
            Decode::Reject { retry } => {
                sink.print(char::REPLACEMENT_CHARACTER);
                if retry {
                    // The offending byte starts something new: another
                    // sequence, a control, or another rejection.
                    self.process_byte(byte, sink);
                }
            }
        }
    }

    /// One step of the state machine proper.
    fn process_byte_table<S: ActionSink>(&mut self, byte: u8, sink: &mut S) {
        let transition = TRANSITIONS[self.state as usize][byte as usize];
        let prev_state = self.state;

        // Implicit string termination: leaving a string state by any byte
        // that is not itself the terminator still closes the string. CAN and
        // SUB abort an OSC without dispatching it.
        if prev_state == State::DcsPassthrough
            && transition.next_state != State::DcsPassthrough
            && transition.action != ActionType::DcsUnhook
            && self.dcs_active
        {
            sink.dcs_unhook();
            self.dcs_active = false;
        }
        if prev_state == State::OscString
            && transition.next_state != State::OscString
            && transition.action != ActionType::OscEnd
        {
            if byte == 0x18 || byte == 0x1A {
                self.osc_data.clear();
            } else {
                self.dispatch_osc(sink);
            }
        }
        if prev_state == State::SosPmApcString
            && transition.next_state != State::SosPmApcString
            && transition.action != ActionType::ApcEnd
            && self.apc_active
        {
            sink.apc_end();
            self.apc_active = false;
        }

        match transition.action {
            ActionType::None | ActionType::Ignore => {}
            ActionType::Print => sink.print(byte as char),
            ActionType::Execute => sink.execute(byte),
            ActionType::Clear => {
                self.clear();
                self.osc_data.clear();
            }
            ActionType::Collect => self.collect(byte),
            ActionType::Param => self.add_param_byte(byte),
            ActionType::EscDispatch => sink.esc_dispatch(&self.intermediates, byte),
            ActionType::CsiDispatch => {
                if self.param_started {
                    self.finalize_param();
                }
                if self.subparam_mask != 0 {
                    sink.csi_dispatch_with_subparams(
                        &self.params,
                        &self.intermediates,
                        byte,
                        self.subparam_mask,
                    );
                } else {
                    sink.csi_dispatch(&self.params, &self.intermediates, byte);
                }
            }
            ActionType::DcsHook => {
                if self.param_started {
                    self.finalize_param();
                }
                sink.dcs_hook(&self.params, &self.intermediates, byte);
                self.dcs_active = true;
            }
            ActionType::DcsPut => {
                if self.dcs_active {
                    sink.dcs_put(byte);
                }
            }
            ActionType::DcsUnhook => {
                if self.dcs_active {
                    sink.dcs_unhook();
                    self.dcs_active = false;
                }
            }
            ActionType::OscStart => self.osc_data.clear(),
            ActionType::OscPut => {
                if self.osc_data.len() < MAX_OSC_DATA {
                    self.osc_data.push(byte);
                }
            }
            ActionType::OscEnd => self.dispatch_osc(sink),
            ActionType::ApcStart => {
                sink.apc_start();
                self.apc_active = true;
            }
            ActionType::ApcPut => {
                if self.apc_active {
                    sink.apc_put(byte);
                }
            }
            ActionType::ApcEnd => {
                if self.apc_active {
                    sink.apc_end();
                    self.apc_active = false;
                }
            }
        }

        self.state = transition.next_state;
    }

    /// Fast path for CSI sequences with only digits, `;`, a private marker,
    /// and intermediates. `input` starts after `ESC [`. Returns consumed
    /// byte count through the final byte, or `None` to fall back.
    fn try_parse_csi_fast<S: ActionSink>(&mut self, input: &[u8], sink: &mut S) -> Option<usize> {
        let final_pos = input.iter().position(|&b| (0x40..=0x7E).contains(&b))?;
        // Real sequences are short; long ones are either malformed or
        // colon-heavy, both handled by the table path.
        if final_pos > 64 {
            return None;
        }

        let seq = &input[..final_pos];
        let final_byte = input[final_pos];

        self.clear();
        let mut pos = 0;

        if let Some(&marker) = seq.first() {
            if (0x3C..=0x3F).contains(&marker) {
                self.intermediates.push(marker);
                pos = 1;
            }
        }

        while pos < seq.len() {
            let b = seq[pos];
            match b {
                b'0'..=b'9' => {
                    self.current_param = self
                        .current_param
                        .saturating_mul(10)
                        .saturating_add(u32::from(b - b'0'));
                    self.param_started = true;
                    pos += 1;
                }
                b';' => {
                    self.finalize_param();
                    pos += 1;
                }
                0x20..=0x2F => break,
                // Colons and stray bytes go through the full table path.
                _ => {
                    self.clear();
                    return None;
                }
            }
        }

        if self.param_started {
            self.finalize_param();
        }

        while pos < seq.len() {
            let b = seq[pos];
            if (0x20..=0x2F).contains(&b) {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(b);
                }
                pos += 1;
            } else {
                self.clear();
                return None;
            }
        }

        sink.csi_dispatch(&self.params, &self.intermediates, final_byte);
        self.state = State::Ground;
        Some(final_pos + 1)
    }

    /// Reset per-sequence accumulation.
    #[inline]
    fn clear(&mut self) {
        self.params.clear();
        self.intermediates.clear();
        self.current_param = 0;
        self.param_started = false;
        self.subparam_mask = 0;
        self.last_was_colon = false;
    }

    /// Digit or separator inside a parameter list.
    #[inline]
    fn add_param_byte(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                self.current_param = self
                    .current_param
                    .saturating_mul(10)
                    .saturating_add(u32::from(byte - b'0'));
                self.param_started = true;
            }
            b';' => {
                self.finalize_param();
                self.last_was_colon = false;
            }
            b':' => {
                self.finalize_param();
                self.last_was_colon = true;
            }
            _ => {}
        }
    }

    /// Push the accumulated parameter, clamped to `u16::MAX`. Parameters
    /// beyond [`MAX_PARAMS`] are dropped; the retained ones are unaffected.
    #[inline]
    fn finalize_param(&mut self) {
        let index = self.params.len();
        if index < MAX_PARAMS {
            let value = self.current_param.min(u32::from(u16::MAX)) as u16;
            self.params.push(value);
            if self.last_was_colon {
                self.subparam_mask |= 1 << index;
            }
        }
        self.current_param = 0;
        self.param_started = false;
    }

    /// Store an intermediate byte (excess silently dropped).
    #[inline]
    fn collect(&mut self, byte: u8) {
        if self.intermediates.len() < MAX_INTERMEDIATES {
            self.intermediates.push(byte);
        }
    }

    /// Split the OSC payload on `;` and hand the segments to the sink.
    fn dispatch_osc<S: ActionSink>(&mut self, sink: &mut S) {
        {
            let mut params: ArrayVec<&[u8], MAX_OSC_PARAMS> = ArrayVec::new();
            let mut start = 0;
            for semi in memchr_iter(b';', &self.osc_data) {
                if params.try_push(&self.osc_data[start..semi]).is_err() {
                    break;
                }
                start = semi + 1;
            }
            let _ = params.try_push(&self.osc_data[start..]);
            sink.osc_dispatch(&params);
        }
        self.osc_data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every sink call for verification.
    #[derive(Default)]
    struct RecordingSink {
        prints: Vec<char>,
        executes: Vec<u8>,
        csi_dispatches: Vec<(Vec<u16>, Vec<u8>, u8)>,
        csi_subparam_masks: Vec<u16>,
        esc_dispatches: Vec<(Vec<u8>, u8)>,
        osc_dispatches: Vec<Vec<Vec<u8>>>,
        dcs_hooks: Vec<(Vec<u16>, Vec<u8>, u8)>,
        dcs_puts: Vec<u8>,
        dcs_unhooks: usize,
        apc_payloads: Vec<Vec<u8>>,
        apc_open: bool,
    }

    impl ActionSink for RecordingSink {
        fn print(&mut self, c: char) {
            self.prints.push(c);
        }
        fn execute(&mut self, byte: u8) {
            self.executes.push(byte);
        }
        fn csi_dispatch(&mut self, params: &[u16], intermediates: &[u8], final_byte: u8) {
            self.csi_dispatches
                .push((params.to_vec(), intermediates.to_vec(), final_byte));
            self.csi_subparam_masks.push(0);
        }
        fn csi_dispatch_with_subparams(
            &mut self,
            params: &[u16],
            intermediates: &[u8],
            final_byte: u8,
            subparam_mask: u16,
        ) {
            self.csi_dispatches
                .push((params.to_vec(), intermediates.to_vec(), final_byte));
            self.csi_subparam_masks.push(subparam_mask);
        }
        fn esc_dispatch(&mut self, intermediates: &[u8], final_byte: u8) {
            self.esc_dispatches
                .push((intermediates.to_vec(), final_byte));
        }
        fn osc_dispatch(&mut self, params: &[&[u8]]) {
            self.osc_dispatches
                .push(params.iter().map(|p| p.to_vec()).collect());
        }
        fn dcs_hook(&mut self, params: &[u16], intermediates: &[u8], final_byte: u8) {
            self.dcs_hooks
                .push((params.to_vec(), intermediates.to_vec(), final_byte));
        }
        fn dcs_put(&mut self, byte: u8) {
            self.dcs_puts.push(byte);
        }
        fn dcs_unhook(&mut self) {
            self.dcs_unhooks += 1;
        }
        fn apc_start(&mut self) {
            self.apc_payloads.push(Vec::new());
            self.apc_open = true;
        }
        fn apc_put(&mut self, byte: u8) {
            if let Some(last) = self.apc_payloads.last_mut() {
                last.push(byte);
            }
        }
        fn apc_end(&mut self) {
            self.apc_open = false;
        }
    }

    fn run(input: &[u8]) -> RecordingSink {
        let mut parser = Parser::new();
        let mut sink = RecordingSink::default();
        parser.advance(input, &mut sink);
        parser.assert_invariants();
        sink
    }

    #[test]
    fn plain_text() {
        let sink = run(b"Hello");
        assert_eq!(sink.prints, vec!['H', 'e', 'l', 'l', 'o']);
    }

    #[test]
    fn control_characters_execute() {
        let sink = run(b"\n\r\t");
        assert_eq!(sink.executes, vec![b'\n', b'\r', b'\t']);
    }

    #[test]
    fn csi_simple() {
        let sink = run(b"\x1b[31m");
        assert_eq!(sink.csi_dispatches, vec![(vec![31], vec![], b'm')]);
    }

    #[test]
    fn csi_multiple_params() {
        let sink = run(b"\x1b[1;31m");
        assert_eq!(sink.csi_dispatches, vec![(vec![1, 31], vec![], b'm')]);
    }

    #[test]
    fn csi_no_params() {
        let sink = run(b"\x1b[H");
        assert_eq!(sink.csi_dispatches, vec![(vec![], vec![], b'H')]);
    }

    #[test]
    fn csi_private_marker_collected() {
        let sink = run(b"\x1b[?1049h");
        assert_eq!(sink.csi_dispatches, vec![(vec![1049], vec![b'?'], b'h')]);
    }

    #[test]
    fn csi_intermediate_collected() {
        let sink = run(b"\x1b[2 q");
        assert_eq!(sink.csi_dispatches, vec![(vec![2], vec![b' '], b'q')]);
    }

    #[test]
    fn csi_param_clamped_to_u16() {
        let sink = run(b"\x1b[99999999999999m");
        assert_eq!(sink.csi_dispatches[0].0, vec![u16::MAX]);
    }

    #[test]
    fn csi_excess_params_dropped() {
        let sink = run(b"\x1b[1;2;3;4;5;6;7;8;9;10;11;12;13;14;15;16;17;18m");
        let (params, _, final_byte) = &sink.csi_dispatches[0];
        assert_eq!(params.len(), MAX_PARAMS);
        assert_eq!(params[..3], [1, 2, 3]);
        assert_eq!(params[15], 16);
        assert_eq!(*final_byte, b'm');
    }

    #[test]
    fn csi_subparams_set_mask() {
        // SGR 4:3 (curly underline)
        let sink = run(b"\x1b[4:3m");
        assert_eq!(sink.csi_dispatches, vec![(vec![4, 3], vec![], b'm')]);
        assert_eq!(sink.csi_subparam_masks, vec![0b10]);
    }

    #[test]
    fn esc_dispatch_plain() {
        let sink = run(b"\x1b7");
        assert_eq!(sink.esc_dispatches, vec![(vec![], b'7')]);
    }

    #[test]
    fn esc_dispatch_with_intermediate() {
        let sink = run(b"\x1b(B");
        assert_eq!(sink.esc_dispatches, vec![(vec![b'('], b'B')]);
    }

    #[test]
    fn osc_bel_terminated() {
        let sink = run(b"\x1b]0;My Title\x07");
        assert_eq!(
            sink.osc_dispatches,
            vec![vec![b"0".to_vec(), b"My Title".to_vec()]]
        );
    }

    #[test]
    fn osc_esc_backslash_terminated() {
        let sink = run(b"\x1b]2;Title\x1b\\");
        assert_eq!(
            sink.osc_dispatches,
            vec![vec![b"2".to_vec(), b"Title".to_vec()]]
        );
        // The trailing backslash is an ESC dispatch, not a print.
        assert_eq!(sink.esc_dispatches, vec![(vec![], b'\\')]);
    }

    #[test]
    fn osc_c1_st_terminated() {
        let sink = run(b"\x1b]0;Title\x9c");
        assert_eq!(sink.osc_dispatches.len(), 1);
    }

    #[test]
    fn osc_cancel_discards() {
        let sink = run(b"\x1b]0;junk\x18\x1b]0;good\x07");
        assert_eq!(
            sink.osc_dispatches,
            vec![vec![b"0".to_vec(), b"good".to_vec()]]
        );
    }

    #[test]
    fn osc_payload_bounded() {
        let mut input = b"\x1b]0;".to_vec();
        input.extend(std::iter::repeat(b'x').take(MAX_OSC_DATA + 4096));
        input.push(0x07);
        input.extend_from_slice(b"\x1b[31m");

        let sink = run(&input);
        assert_eq!(sink.osc_dispatches.len(), 1);
        let title = &sink.osc_dispatches[0][1];
        assert!(title.len() <= MAX_OSC_DATA);
        // Recovery: the CSI right after still dispatches.
        assert_eq!(sink.csi_dispatches, vec![(vec![31], vec![], b'm')]);
    }

    #[test]
    fn osc_segments_bounded() {
        let sink = run(b"\x1b]1;2;3;4;5;6;7;8;9;10;11\x07");
        assert_eq!(sink.osc_dispatches[0].len(), MAX_OSC_PARAMS);
    }

    #[test]
    fn dcs_hook_put_unhook() {
        let sink = run(b"\x1bPqABC\x1b\\");
        assert_eq!(sink.dcs_hooks, vec![(vec![], vec![], b'q')]);
        assert_eq!(sink.dcs_puts, vec![b'A', b'B', b'C']);
        assert_eq!(sink.dcs_unhooks, 1);
    }

    #[test]
    fn dcs_with_params() {
        let sink = run(b"\x1bP1;2$qm\x1b\\");
        assert_eq!(sink.dcs_hooks, vec![(vec![1, 2], vec![b'$'], b'q')]);
        assert_eq!(sink.dcs_unhooks, 1);
    }

    #[test]
    fn apc_payload_forwarded() {
        let sink = run(b"\x1b_Gi=1\x1b\\");
        assert_eq!(sink.apc_payloads, vec![b"Gi=1".to_vec()]);
        assert!(!sink.apc_open);
    }

    #[test]
    fn sos_and_pm_discarded() {
        let sink = run(b"\x1bXsos data\x1b\\\x1b^pm data\x1b\\");
        assert!(sink.apc_payloads.is_empty());
        assert!(sink.prints.is_empty());
    }

    #[test]
    fn cancel_aborts_csi() {
        let sink = run(b"\x1b[31\x18Hello");
        assert!(sink.csi_dispatches.is_empty());
        assert_eq!(sink.prints, vec!['H', 'e', 'l', 'l', 'o']);
    }

    #[test]
    fn esc_restarts_inside_csi() {
        let sink = run(b"\x1b[31\x1b[32m");
        assert_eq!(sink.csi_dispatches, vec![(vec![32], vec![], b'm')]);
    }

    #[test]
    fn utf8_two_byte_print() {
        let sink = run("é".as_bytes());
        assert_eq!(sink.prints, vec!['é']);
    }

    #[test]
    fn utf8_four_byte_print() {
        let sink = run("🦀".as_bytes());
        assert_eq!(sink.prints, vec!['🦀']);
    }

    #[test]
    fn utf8_split_across_advance_calls() {
        let mut parser = Parser::new();
        let mut sink = RecordingSink::default();
        let bytes = "日本".as_bytes();
        for i in 0..bytes.len() {
            parser.advance(&bytes[i..=i], &mut sink);
        }
        assert_eq!(sink.prints, vec!['日', '本']);
    }

    #[test]
    fn invalid_utf8_replacement_and_resync() {
        let sink = run(&[0xE2, b'a']);
        assert_eq!(sink.prints, vec![char::REPLACEMENT_CHARACTER, 'a']);
    }

    #[test]
    fn esc_interrupts_utf8_sequence() {
        let sink = run(&[0xE2, 0x1B, b'[', b'm']);
        assert_eq!(sink.prints, vec![char::REPLACEMENT_CHARACTER]);
        assert_eq!(sink.csi_dispatches, vec![(vec![], vec![], b'm')]);
    }

    #[test]
    fn c1_csi_entry() {
        let sink = run(&[0x9B, b'3', b'1', b'm']);
        assert_eq!(sink.csi_dispatches, vec![(vec![31], vec![], b'm')]);
    }

    #[test]
    fn advance_fast_matches_advance() {
        let inputs: &[&[u8]] = &[
            b"plain text only",
            b"\x1b[1;31mred\x1b[0m normal",
            b"\x1b]0;title\x07text",
            b"\x1bPqpayload\x1b\\after",
            b"mixed \x1b[2J\x1b[H\xc3\xa9\xf0\x9f\xa6\x80 end",
            b"\x1b[?1049h\x1b[?1049l",
            b"partial csi \x1b[31",
            b"\x1b[4:3munderline\x1b[m",
            &[0xE2, 0x82],
        ];
        for input in inputs {
            let mut a = Parser::new();
            let mut b = Parser::new();
            let mut sink_a = RecordingSink::default();
            let mut sink_b = RecordingSink::default();
            a.advance(input, &mut sink_a);
            b.advance_fast(input, &mut sink_b);
            assert_eq!(sink_a.prints, sink_b.prints, "input {input:?}");
            assert_eq!(sink_a.executes, sink_b.executes, "input {input:?}");
            assert_eq!(
                sink_a.csi_dispatches, sink_b.csi_dispatches,
                "input {input:?}"
            );
            assert_eq!(
                sink_a.osc_dispatches, sink_b.osc_dispatches,
                "input {input:?}"
            );
            assert_eq!(sink_a.dcs_puts, sink_b.dcs_puts, "input {input:?}");
            assert_eq!(a.state(), b.state(), "input {input:?}");
        }
    }

    #[test]
    fn csi_fast_path_consumes_exactly_one_sequence() {
        let mut parser = Parser::new();
        let mut sink = RecordingSink::default();
        parser.advance_fast(b"\x1b[31m\x1b[32m", &mut sink);
        assert_eq!(sink.csi_dispatches.len(), 2);
        assert_eq!(sink.csi_dispatches[0].0, vec![31]);
        assert_eq!(sink.csi_dispatches[1].0, vec![32]);
    }

    #[test]
    fn reset_returns_to_ground() {
        let mut parser = Parser::new();
        let mut sink = RecordingSink::default();
        parser.advance(b"\x1b[31", &mut sink);
        assert_eq!(parser.state(), State::CsiParam);
        parser.reset();
        assert_eq!(parser.state(), State::Ground);
        parser.advance(b"x", &mut sink);
        assert_eq!(sink.prints, vec!['x']);
    }
}
