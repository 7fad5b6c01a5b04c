//! TUI debugger for the Vole emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register bank view
//! - Memory view
//! - Step/run/breakpoint controls
//! - Disassembly around the program counter
//! - The events produced by the last step

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
