//! Crate-level test suites.
//!
//! - [`terminal_integration`]: full-pipeline tests from input bytes to grid
//!   state, covering the CSI/ESC/OSC repertoire.
//! - [`hostile_input`]: regression tests for attack patterns derived from
//!   real terminal emulator CVEs.
//! - [`properties`]: property tests for the parsing and grid invariants.

mod properties;
