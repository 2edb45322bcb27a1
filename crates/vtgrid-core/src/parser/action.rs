//! The handler capability consumed by the parser.

/// Receiver for parser actions.
///
/// Implemented by the terminal (the screen mutator) and by test/bench sinks.
/// The parser is generic over the sink, so the hot print path monomorphizes
/// with no virtual dispatch.
///
/// All methods are infallible: malformed input is already filtered by the
/// parser, and the sink's own recovery (clamping, ignoring unknown
/// sequences) never surfaces errors back through this interface.
pub trait ActionSink {
    /// A printable codepoint in ground state.
    fn print(&mut self, c: char);

    /// A run of printable ASCII bytes (0x20..=0x7E) in ground state.
    ///
    /// Fast-path hook for the batched entry point; the default forwards to
    /// [`print`](Self::print) one character at a time.
    fn print_ascii_run(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.print(b as char);
        }
    }

    /// A C0 or C1 control byte.
    fn execute(&mut self, byte: u8);

    /// A complete CSI sequence.
    fn csi_dispatch(&mut self, params: &[u16], intermediates: &[u8], final_byte: u8);

    /// A complete CSI sequence containing colon subparameters.
    ///
    /// Bit `i` of `subparam_mask` is set when `params[i]` was separated from
    /// its predecessor by `:` rather than `;`. The default drops the mask.
    fn csi_dispatch_with_subparams(
        &mut self,
        params: &[u16],
        intermediates: &[u8],
        final_byte: u8,
        subparam_mask: u16,
    ) {
        let _ = subparam_mask;
        self.csi_dispatch(params, intermediates, final_byte);
    }

    /// A complete ESC sequence.
    fn esc_dispatch(&mut self, intermediates: &[u8], final_byte: u8);

    /// A complete OSC string, split on `;` into at most
    /// [`MAX_OSC_PARAMS`](super::MAX_OSC_PARAMS) segments.
    fn osc_dispatch(&mut self, params: &[&[u8]]);

    /// A DCS header final byte; payload bytes follow via
    /// [`dcs_put`](Self::dcs_put) until [`dcs_unhook`](Self::dcs_unhook).
    fn dcs_hook(&mut self, params: &[u16], intermediates: &[u8], final_byte: u8);

    /// One DCS payload byte.
    fn dcs_put(&mut self, byte: u8);

    /// The DCS string ended (or was aborted).
    fn dcs_unhook(&mut self);

    /// An APC string started (ESC `_` or 0x9F).
    fn apc_start(&mut self) {}

    /// One APC payload byte.
    fn apc_put(&mut self, _byte: u8) {}

    /// The APC string ended (or was aborted).
    fn apc_end(&mut self) {}
}

/// Sink that discards every action.
///
/// Used to benchmark the parser itself with zero handler cost, and as a
/// stand-in wherever a sink is required but output is irrelevant.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ActionSink for NullSink {
    fn print(&mut self, _c: char) {}
    fn print_ascii_run(&mut self, _bytes: &[u8]) {}
    fn execute(&mut self, _byte: u8) {}
    fn csi_dispatch(&mut self, _params: &[u16], _intermediates: &[u8], _final_byte: u8) {}
    fn esc_dispatch(&mut self, _intermediates: &[u8], _final_byte: u8) {}
    fn osc_dispatch(&mut self, _params: &[&[u8]]) {}
    fn dcs_hook(&mut self, _params: &[u16], _intermediates: &[u8], _final_byte: u8) {}
    fn dcs_put(&mut self, _byte: u8) {}
    fn dcs_unhook(&mut self) {}
}
