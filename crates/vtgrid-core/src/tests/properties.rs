//! Property tests for parser and grid invariants.

use proptest::prelude::*;

use crate::grid::StyleId;
use crate::parser::{ActionSink, Parser, MAX_PARAMS};
use crate::terminal::Terminal;

/// Sink that records the observable action stream.
#[derive(Default, Debug, PartialEq, Eq)]
struct CollectSink {
    prints: Vec<char>,
    executes: Vec<u8>,
    csi: Vec<(Vec<u16>, Vec<u8>, u8)>,
    esc: Vec<(Vec<u8>, u8)>,
    osc: Vec<Vec<Vec<u8>>>,
    dcs_puts: Vec<u8>,
}

impl ActionSink for CollectSink {
    fn print(&mut self, c: char) {
        self.prints.push(c);
    }
    fn execute(&mut self, byte: u8) {
        self.executes.push(byte);
    }
    fn csi_dispatch(&mut self, params: &[u16], intermediates: &[u8], final_byte: u8) {
        self.csi
            .push((params.to_vec(), intermediates.to_vec(), final_byte));
    }
    fn esc_dispatch(&mut self, intermediates: &[u8], final_byte: u8) {
        self.esc.push((intermediates.to_vec(), final_byte));
    }
    fn osc_dispatch(&mut self, params: &[&[u8]]) {
        self.osc.push(params.iter().map(|p| p.to_vec()).collect());
    }
    fn dcs_hook(&mut self, _: &[u16], _: &[u8], _: u8) {}
    fn dcs_put(&mut self, byte: u8) {
        self.dcs_puts.push(byte);
    }
    fn dcs_unhook(&mut self) {}
}

fn parse_with(input: &[u8], split: usize, fast: bool) -> CollectSink {
    let mut parser = Parser::new();
    let mut sink = CollectSink::default();
    let split = split.min(input.len());
    if fast {
        parser.advance_fast(&input[..split], &mut sink);
        parser.advance_fast(&input[split..], &mut sink);
    } else {
        parser.advance(&input[..split], &mut sink);
        parser.advance(&input[split..], &mut sink);
    }
    parser.assert_invariants();
    sink
}

proptest! {
    /// Valid UTF-8 decodes identically no matter where the byte stream is
    /// split across feed calls.
    #[test]
    fn utf8_split_invariance(s in "\\PC{0,40}", split in 0usize..200) {
        let bytes = s.as_bytes();
        let whole = parse_with(bytes, bytes.len(), false);
        let halves = parse_with(bytes, split, false);
        prop_assert_eq!(&whole.prints, &halves.prints);
        prop_assert_eq!(whole.prints.iter().collect::<String>(), s);
    }

    /// The batched entry point produces the same action stream as the
    /// byte-wise one for arbitrary input, at any split point.
    #[test]
    fn advance_fast_equivalence(
        bytes in proptest::collection::vec(any::<u8>(), 0..300),
        split in 0usize..300,
    ) {
        let slow = parse_with(&bytes, split, false);
        let fast = parse_with(&bytes, split, true);
        prop_assert_eq!(slow, fast);
    }

    /// A CSI sequence with any number of parameters dispatches exactly
    /// once with the correct final byte; parameters beyond the cap are
    /// dropped without corrupting the retained ones.
    #[test]
    fn csi_param_bounding(params in proptest::collection::vec(0u16..10_000, 0..40)) {
        let body: Vec<String> = params.iter().map(u16::to_string).collect();
        let input = format!("\x1b[{}m", body.join(";"));
        let sink = parse_with(input.as_bytes(), input.len(), false);

        prop_assert_eq!(sink.csi.len(), 1);
        let (got, _, final_byte) = &sink.csi[0];
        prop_assert_eq!(*final_byte, b'm');
        prop_assert!(got.len() <= MAX_PARAMS);
        // An empty parameter string still dispatches with no parameters.
        let expected: Vec<u16> = if params.is_empty() {
            Vec::new()
        } else {
            params.iter().copied().take(MAX_PARAMS).collect()
        };
        prop_assert_eq!(got, &expected);
    }

    /// No byte stream leaves the cursor out of bounds or violates the
    /// wide-pair invariant.
    #[test]
    fn arbitrary_bytes_keep_invariants(
        bytes in proptest::collection::vec(any::<u8>(), 0..600),
    ) {
        let mut term = Terminal::new(8, 20);
        term.process(&bytes);
        let cursor = term.cursor();
        prop_assert!(cursor.row < term.rows());
        prop_assert!(cursor.col < term.cols());
        term.assert_invariants();
    }

    /// Wide characters always materialize as a lead cell plus exactly one
    /// spacer cell, and the spacer never appears in extracted text.
    #[test]
    fn wide_pair_invariant(text in "[a-z\u{4e00}-\u{4e20}]{0,60}") {
        let mut term = Terminal::new(6, 11);
        term.process(text.as_bytes());
        let grid = term.grid();
        for r in 0..grid.rows() {
            let cells = grid.row_cells(r).unwrap().to_vec();
            for (col, cell) in cells.iter().enumerate() {
                if cell.is_wide() {
                    prop_assert!(cells[col + 1].is_wide_spacer());
                }
                if cell.is_wide_spacer() {
                    prop_assert!(col > 0 && cells[col - 1].is_wide());
                }
            }
            prop_assert!(!grid.row_text(r).unwrap().contains('\0'));
        }
    }

    /// Reflowing to a wider grid and back reproduces the original cell
    /// contents and wrap flags.
    #[test]
    fn reflow_round_trip(
        text in "[a-z ]{0,120}",
        w1 in 4u16..16,
        extra in 1u16..20,
    ) {
        let mut term = Terminal::new(4, w1);
        term.process(text.as_bytes());
        let before = term.grid().visible_content();
        let flags: Vec<bool> = (0..4).map(|r| term.grid().row(r).unwrap().is_wrapped()).collect();

        term.resize(4, w1 + extra);
        term.resize(4, w1);

        prop_assert_eq!(term.grid().visible_content(), before);
        let after: Vec<bool> = (0..4).map(|r| term.grid().row(r).unwrap().is_wrapped()).collect();
        prop_assert_eq!(after, flags);
    }

    /// A pin minted before scrolling still resolves to the same content
    /// afterwards, as long as nothing was evicted.
    #[test]
    fn pin_survives_scroll(n in 0usize..50) {
        let mut grid = crate::grid::Grid::with_scrollback(4, 10, 100);
        for c in "anchor".chars() {
            grid.print_char(c, StyleId::DEFAULT, true);
        }
        let pin = grid.create_pin(0, 0);
        grid.scroll_up(n);
        // The view may move, the content reference may not.
        prop_assert!(grid.is_pin_valid(&pin));
        prop_assert_eq!(grid.resolve_pin_to_cell(&pin).unwrap().char(), 'a');
        grid.scroll_display(n as i32);
        grid.scroll_display(-(n as i32));
        prop_assert_eq!(grid.resolve_pin_to_cell(&pin).unwrap().char(), 'a');
    }
}
