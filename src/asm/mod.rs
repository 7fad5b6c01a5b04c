//! Program input and output for the Vole machine.
//!
//! This module provides:
//! - Program files and interactive word-by-word entry
//! - A small two-pass assembler (mnemonics → program words)
//! - A disassembler (program words → mnemonics)

pub mod assembler;
pub mod disasm;
pub mod program;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use program::{Entry, EntrySession, ProgramError, load_program, parse_program, save_program};
