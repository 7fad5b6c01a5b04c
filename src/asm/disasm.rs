//! Disassembler for Vole programs.
//!
//! Converts program words back to the assembler's mnemonics.

use crate::cpu::alu::parse_word;
use crate::cpu::decode::{decode, Instruction};

/// Disassemble a single word to text.
pub fn disassemble_instruction(word: &str) -> String {
    match parse_word(word).ok().map(decode) {
        Some(Ok(decoded)) => format_instruction(&decoded),
        _ => format!("??? ; {}", word),
    }
}

/// Disassemble a slice of words.
pub fn disassemble<S: AsRef<str>>(words: &[S]) -> String {
    let mut output = String::new();
    output.push_str("; Vole Disassembly\n");
    output.push_str("; ----------------\n\n");

    for (addr, word) in words.iter().enumerate() {
        let word = word.as_ref();
        let line = disassemble_instruction(word);
        output.push_str(&format!("{:02X}: {:<18} ; {}\n", addr, line, word));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        Instruction::Load { reg, addr } => format!("LOAD R{:X}, 0x{:02X}", reg, addr),
        Instruction::SetImmediate { reg, value } => format!("LDI R{:X}, 0x{:02X}", reg, value),
        Instruction::Store { reg, addr } => format!("STORE R{:X}, 0x{:02X}", reg, addr),
        Instruction::Move { src, dst } => format!("MOVE R{:X}, R{:X}", src, dst),
        Instruction::Add { dst, a, b } => format!("ADD R{:X}, R{:X}, R{:X}", dst, a, b),
        Instruction::Jump { target } => format!("JMP 0x{:02X}", target),
        Instruction::CompareJump { a, b, target } => {
            format!("JEQ R{:X}, R{:X}, 0x{:02X}", a, b, target)
        }
        Instruction::Halt => "HALT".to_string(),
    }
}
