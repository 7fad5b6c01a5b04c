//! Arithmetic unit.
//!
//! The Vole ALU knows a single operation, unsigned byte addition. Overflow
//! is not detected: the sum is handed to the register bank, which keeps the
//! low 8 bits.
//!
//! Memory cells hold their words as hexadecimal text, so the conversions
//! between text and numbers live here too.

use crate::cpu::execute::CpuError;
use crate::cpu::registers::Registers;
use crate::cpu::trace::{Event, Observer};

/// Parse hexadecimal text (no prefix, either case).
pub fn hex_to_decimal(text: &str) -> Result<u32, CpuError> {
    u32::from_str_radix(text, 16).map_err(|_| CpuError::Parse {
        text: text.to_string(),
    })
}

/// Format a value as lowercase hexadecimal, zero-padded to two digits.
///
/// Values above 0xFF keep all their digits.
pub fn decimal_to_hex(value: u32) -> String {
    format!("{:02x}", value)
}

/// Parse an instruction word. The text must fit in 16 bits.
pub fn parse_word(text: &str) -> Result<u16, CpuError> {
    u16::from_str_radix(text, 16).map_err(|_| CpuError::Parse {
        text: text.to_string(),
    })
}

/// `dest := src_a + src_b`, wrapping modulo 256.
pub fn add(
    src_a: usize,
    src_b: usize,
    dest: usize,
    regs: &mut Registers,
    observer: &mut dyn Observer,
) -> Result<(), CpuError> {
    let sum = regs.get(src_a)? as i64 + regs.get(src_b)? as i64;
    if sum == 0 {
        observer.on_event(&Event::ZeroSum { dest });
    }
    regs.write(dest, sum, observer)
}
