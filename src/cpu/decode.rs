//! Instruction decoder for the Vole machine.
//!
//! Every instruction is one 16-bit word split into four nibbles:
//!
//! ```text
//!  15   12 11    8 7     4 3     0
//! +-------+-------+-------+-------+
//! |opcode |   R   |   X   |   Y   |
//! +-------+-------+-------+-------+
//! ```
//!
//! `R` is a register index; the operand byte `XY` is read differently by
//! each opcode (address, immediate, register pair or jump target).

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Raw fields of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    /// Bits 15-12.
    pub opcode: u8,
    /// Bits 11-8.
    pub reg: usize,
    /// Bits 7-0.
    pub operand: u8,
}

impl Fields {
    pub fn from_word(word: u16) -> Self {
        Self {
            opcode: ((word & 0xF000) >> 12) as u8,
            reg: ((word & 0x0F00) >> 8) as usize,
            operand: (word & 0x00FF) as u8,
        }
    }

    /// High nibble of the operand byte.
    pub fn x(&self) -> usize {
        (self.operand >> 4) as usize
    }

    /// Low nibble of the operand byte.
    pub fn y(&self) -> usize {
        (self.operand & 0x0F) as usize
    }
}

/// Decoded Vole instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `1RXY`: R := parse_hex([XY])
    Load { reg: usize, addr: usize },

    /// `2RXY`: R := XY
    SetImmediate { reg: usize, value: u8 },

    /// `3RXY`: [XY] := hex(R)
    Store { reg: usize, addr: usize },

    /// `4_SD`: RD := RS. The `_` nibble of the word holds S.
    Move { src: usize, dst: usize },

    /// `5RST`: R := RS + RT (mod 256)
    Add { dst: usize, a: usize, b: usize },

    /// `B_X0`: PC := X0
    Jump { target: usize },

    /// `BRXS`: if R == RS then PC := X0
    CompareJump { a: usize, b: usize, target: usize },

    /// `C000`: stop
    Halt,
}

/// Opcode values.
mod opcode {
    pub const LOAD: u8 = 0x1;
    pub const SET_IMMEDIATE: u8 = 0x2;
    pub const STORE: u8 = 0x3;
    pub const MOVE: u8 = 0x4;
    pub const ADD: u8 = 0x5;
    pub const JUMP: u8 = 0xB;
    pub const HALT: u8 = 0xC;
}

/// Decode a 16-bit instruction word.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let f = Fields::from_word(word);

    let instruction = match f.opcode {
        opcode::LOAD => Instruction::Load { reg: f.reg, addr: f.operand as usize },
        opcode::SET_IMMEDIATE => Instruction::SetImmediate { reg: f.reg, value: f.operand },
        opcode::STORE => Instruction::Store { reg: f.reg, addr: f.operand as usize },
        opcode::MOVE => Instruction::Move { src: f.reg, dst: f.y() },
        opcode::ADD => Instruction::Add { dst: f.reg, a: f.x(), b: f.y() },
        opcode::JUMP if f.y() == 0 => Instruction::Jump { target: f.operand as usize },
        opcode::JUMP => Instruction::CompareJump {
            a: f.reg,
            b: f.y(),
            target: (f.operand & 0xF0) as usize,
        },
        opcode::HALT => Instruction::Halt,
        other => return Err(DecodeError::InvalidOpcode(other)),
    };

    Ok(instruction)
}

/// Encode an instruction back to its 16-bit word.
///
/// Register indices and addresses are truncated to their field widths.
/// A `Jump` keeps only the high nibble of its target, since a non-zero low
/// nibble would turn the word into a compare-jump.
/// A `CompareJump` against R0 encodes with a zero low nibble and therefore
/// decodes as a plain `Jump`.
pub fn encode(instr: &Instruction) -> u16 {
    let pack = |op: u8, r: usize, xy: usize| -> u16 {
        ((op as u16) << 12) | (((r & 0xF) as u16) << 8) | ((xy & 0xFF) as u16)
    };

    match *instr {
        Instruction::Load { reg, addr } => pack(opcode::LOAD, reg, addr),
        Instruction::SetImmediate { reg, value } => pack(opcode::SET_IMMEDIATE, reg, value as usize),
        Instruction::Store { reg, addr } => pack(opcode::STORE, reg, addr),
        Instruction::Move { src, dst } => pack(opcode::MOVE, src, dst & 0xF),
        Instruction::Add { dst, a, b } => pack(opcode::ADD, dst, ((a & 0xF) << 4) | (b & 0xF)),
        Instruction::Jump { target } => pack(opcode::JUMP, 0, target & 0xF0),
        Instruction::CompareJump { a, b, target } => pack(opcode::JUMP, a, (target & 0xF0) | (b & 0xF)),
        Instruction::Halt => pack(opcode::HALT, 0, 0),
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode: {0:X}")]
    InvalidOpcode(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields() {
        let f = Fields::from_word(0x5A3C);
        assert_eq!(f.opcode, 0x5);
        assert_eq!(f.reg, 0xA);
        assert_eq!(f.operand, 0x3C);
        assert_eq!(f.x(), 0x3);
        assert_eq!(f.y(), 0xC);
    }

    #[test]
    fn test_decode_data_movement() {
        assert_eq!(decode(0x1320).unwrap(), Instruction::Load { reg: 3, addr: 0x20 });
        assert_eq!(decode(0x20FF).unwrap(), Instruction::SetImmediate { reg: 0, value: 0xFF });
        assert_eq!(decode(0x3200).unwrap(), Instruction::Store { reg: 2, addr: 0 });
        assert_eq!(decode(0x40A4).unwrap(), Instruction::Move { src: 0, dst: 4 });
    }

    #[test]
    fn test_decode_add() {
        assert_eq!(decode(0x5201).unwrap(), Instruction::Add { dst: 2, a: 0, b: 1 });
    }

    #[test]
    fn test_decode_jump_forms() {
        assert_eq!(decode(0xB000).unwrap(), Instruction::Jump { target: 0 });
        assert_eq!(decode(0xB0A0).unwrap(), Instruction::Jump { target: 0xA0 });
        assert_eq!(
            decode(0xB132).unwrap(),
            Instruction::CompareJump { a: 1, b: 2, target: 0x30 }
        );
    }

    #[test]
    fn test_decode_halt_ignores_operands() {
        assert_eq!(decode(0xC000).unwrap(), Instruction::Halt);
        assert_eq!(decode(0xC123).unwrap(), Instruction::Halt);
    }

    #[test]
    fn test_decode_invalid_opcodes() {
        for op in [0x0u16, 0x6, 0x7, 0x8, 0x9, 0xA, 0xD, 0xE, 0xF] {
            let word = op << 12;
            assert_eq!(decode(word), Err(DecodeError::InvalidOpcode(op as u8)));
        }
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&Instruction::Add { dst: 2, a: 2, b: 1 }), 0x5221);
        assert_eq!(encode(&Instruction::Move { src: 0, dst: 4 }), 0x4004);
        assert_eq!(encode(&Instruction::CompareJump { a: 1, b: 2, target: 0x30 }), 0xB132);
        assert_eq!(encode(&Instruction::Halt), 0xC000);
    }
}
