//! Control unit: data movement and control flow.
//!
//! Each operation borrows exactly the state it touches. Nothing is kept
//! between calls.

use crate::cpu::alu::{decimal_to_hex, hex_to_decimal};
use crate::cpu::execute::CpuError;
use crate::cpu::memory::Memory;
use crate::cpu::registers::Registers;
use crate::cpu::trace::{Event, Observer};

/// `reg := parse_hex(mem[addr])`, keeping the low byte.
pub fn load(
    reg: usize,
    addr: usize,
    regs: &mut Registers,
    mem: &Memory,
    observer: &mut dyn Observer,
) -> Result<(), CpuError> {
    let value = hex_to_decimal(mem.get(addr)?)?;
    regs.write(reg, value as i64, observer)
}

/// `reg := value`
pub fn set_immediate(
    reg: usize,
    value: u8,
    regs: &mut Registers,
    observer: &mut dyn Observer,
) -> Result<(), CpuError> {
    regs.write(reg, value as i64, observer)
}

/// `mem[addr] := hex(reg)` as a two-digit byte.
pub fn store(
    reg: usize,
    addr: usize,
    regs: &Registers,
    mem: &mut Memory,
    observer: &mut dyn Observer,
) -> Result<(), CpuError> {
    let text = decimal_to_hex(regs.get(reg)? as u32);
    mem.write(addr, text, observer)
}

/// `dst := src`
pub fn move_register(
    src: usize,
    dst: usize,
    regs: &mut Registers,
    observer: &mut dyn Observer,
) -> Result<(), CpuError> {
    let value = regs.get(src)?;
    regs.write(dst, value as i64, observer)
}

/// `pc := target`
pub fn jump(target: usize, pc: &mut usize, observer: &mut dyn Observer) {
    *pc = target;
    observer.on_event(&Event::Jump { target });
}

/// `if a == b then pc := target`
///
/// Returns whether the jump was taken.
pub fn compare_jump(
    a: usize,
    b: usize,
    target: usize,
    regs: &Registers,
    pc: &mut usize,
    observer: &mut dyn Observer,
) -> Result<bool, CpuError> {
    let taken = regs.get(a)? == regs.get(b)?;
    if taken {
        *pc = target;
    }
    observer.on_event(&Event::CompareJump { a, b, target, taken });
    Ok(taken)
}
