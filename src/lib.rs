//! # Vole Emulator
//!
//! An emulator of the Vole machine, the small von Neumann computer used to
//! teach machine language: sixteen byte registers, 256 words of memory and
//! an eight-opcode instruction set running one fetch-decode-execute step at
//! a time.

pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, StopReason, Snapshot, Memory, Registers, Instruction};
pub use cpu::{Event, Observer, LogObserver, Recorder};
pub use asm::{assemble, disassemble, AssemblerError, ProgramError, EntrySession, load_program, save_program};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
