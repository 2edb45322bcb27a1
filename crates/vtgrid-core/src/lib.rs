//! Host-agnostic terminal emulation core.
//!
//! `vtgrid-core` turns an untrusted PTY byte stream into a structured,
//! addressable grid of cells and keeps that grid consistent across printing,
//! cursor movement, scrolling, resizing, and selection. It contains no
//! rendering, font, windowing, or PTY code; embedders feed bytes in and read
//! rows, damage, and selections back out.
//!
//! ## Pipeline
//!
//! ```text
//! raw bytes ──▶ Utf8Decoder ──▶ Parser ──▶ ActionSink (Terminal)
//!                                             │
//!                                             ▼
//!                                  Grid / Cursor / CellExtras
//!                                             │
//!                                             ▼
//!                            renderer (rows, damage, selection text)
//! ```
//!
//! - [`parser::Parser`] is a table-driven VT500-series state machine. It is
//!   bounded everywhere: parameters, intermediates, and OSC/DCS payload
//!   accumulation all have hard caps, so a hostile stream can neither hang
//!   the session nor grow memory without limit.
//! - [`terminal::Terminal`] implements the parser's [`parser::ActionSink`]
//!   capability and owns a primary and an alternate [`grid::Grid`].
//! - [`grid::Grid`] stores rows in pooled 64 KiB pages with a ring buffer
//!   for O(1) scrolling, per-row damage tracking, and generation-checked
//!   [`grid::Pin`]s that survive scrolling and detect eviction.
//! - [`selection::Selection`] is a pair of pins plus a mode; extraction is
//!   gated by the pin generation check so a stale selection yields nothing
//!   rather than the wrong text.
//!
//! ## Threading
//!
//! Parsing and grid mutation are synchronous and single-writer. Embedders
//! that split PTY reading and rendering across threads wrap the terminal in
//! [`sync::FairMutex`] and lock it for the duration of one `process` batch;
//! the per-row damage bitmap keeps render-side copies small.
//!
//! ## Example
//!
//! ```
//! use vtgrid_core::terminal::Terminal;
//!
//! let mut term = Terminal::new(24, 80);
//! term.process(b"\x1b[31mhello\x1b[0m");
//! assert_eq!(term.grid().row_text(0).unwrap().trim_end(), "hello");
//! ```

pub mod config;
pub mod grapheme;
pub mod grid;
pub mod osc;
pub mod parser;
pub mod selection;
pub mod sync;
pub mod terminal;
pub mod utf8;

#[cfg(test)]
mod tests;

pub use config::{ConfigChange, TerminalConfig};
pub use grid::{Cell, CellFlags, Cursor, Grid, Pin};
pub use parser::{ActionSink, NullSink, Parser};
pub use selection::{Selection, SelectionKind};
pub use terminal::Terminal;
