//! CPU emulation for the Vole machine.
//!
//! This module implements the complete Vole architecture:
//! - 16 one-byte general-purpose registers (R0-RF)
//! - 256 memory cells holding four-hex-digit words
//! - 8-instruction set with a fixed 16-bit instruction word

pub mod memory;
pub mod registers;
pub mod alu;
pub mod control;
pub mod decode;
pub mod execute;
pub mod trace;

pub use memory::{Memory, MEMORY_SIZE, EMPTY_WORD};
pub use registers::{Registers, REGISTER_COUNT};
pub use decode::{Instruction, DecodeError, decode, encode};
pub use execute::{Cpu, CpuError, CpuState, StopReason, Snapshot};
pub use trace::{Event, Observer, LogObserver, Recorder};
