//! Simple assembler for Vole programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! START:              ; Define a label
//!     LDI   R0, 5     ; R0 := 5
//!     LOAD  R1, 0x20  ; R1 := [20]
//!     STORE R1, 0x21  ; [21] := R1
//!     MOVE  R1, R2    ; R2 := R1
//!     ADD   R3, R1, R2; R3 := R1 + R2
//!     JEQ   R1, R2, END
//!     JMP   START
//! END:
//!     HALT
//!
//!     ORG 0x20        ; Set origin address
//!     DAT 0x0042      ; Define a data word
//! ```
//!
//! Jump targets must have a zero low nibble: in the Vole encoding that
//! nibble names the second register of a compare-jump.

use crate::cpu::decode::{Instruction, encode};
use crate::cpu::memory::{MEMORY_SIZE, EMPTY_WORD};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to program words, starting at address 0.
///
/// Gaps left by `ORG` are filled with `0000`.
pub fn assemble(source: &str) -> Result<Vec<String>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// One instruction or `DAT` line waiting for pass 2.
struct Statement {
    addr: usize,
    line: usize,
    mnemonic: String,
    operands: Vec<String>,
}

/// The assembler state.
struct Assembler {
    /// Current address (origin).
    current_addr: usize,
    /// Symbol table (label -> address).
    symbols: HashMap<String, usize>,
    /// Statements collected in pass 1.
    statements: Vec<Statement>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            statements: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<String>, AssemblerError> {
        // Pass 1: Collect labels and statements
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Encode with every label known
        let mut output = vec![EMPTY_WORD.to_string(); self.current_addr];
        for stmt in &self.statements {
            let word = self.encode_statement(stmt)?;
            output[stmt.addr] = format!("{:04X}", word);
        }

        Ok(output)
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut line = line.trim();

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "malformed label".into(),
                });
            }
            if self.symbols.insert(label.clone(), self.current_addr).is_some() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("label {} defined twice", label),
                });
            }
            line = line[colon_idx + 1..].trim();
        }

        if line.is_empty() {
            return Ok(());
        }

        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, rest.trim()),
            None => (line, ""),
        };
        let mnemonic = mnemonic.to_uppercase();
        let operands: Vec<String> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(|op| op.trim().to_string()).collect()
        };

        if mnemonic == "ORG" {
            let [addr] = expect_operands::<1>(&operands, &mnemonic, line_num)?;
            let addr = parse_number(addr).ok_or_else(|| AssemblerError::SyntaxError {
                line: line_num,
                message: "ORG requires a numeric address".into(),
            })?;
            if addr < self.current_addr || addr >= MEMORY_SIZE {
                return Err(AssemblerError::ValueOutOfRange { line: line_num, value: addr });
            }
            self.current_addr = addr;
            return Ok(());
        }

        if self.current_addr >= MEMORY_SIZE {
            return Err(AssemblerError::ValueOutOfRange {
                line: line_num,
                value: self.current_addr,
            });
        }

        self.statements.push(Statement {
            addr: self.current_addr,
            line: line_num,
            mnemonic,
            operands,
        });
        self.current_addr += 1;

        Ok(())
    }

    fn encode_statement(&self, stmt: &Statement) -> Result<u16, AssemblerError> {
        let line = stmt.line;
        let ops = &stmt.operands;

        let instr = match stmt.mnemonic.as_str() {
            "DAT" | "DATA" => {
                let [value] = expect_operands::<1>(ops, &stmt.mnemonic, line)?;
                let value = self.value(value, line)?;
                if value > 0xFFFF {
                    return Err(AssemblerError::ValueOutOfRange { line, value });
                }
                return Ok(value as u16);
            }

            "LOAD" | "LD" => {
                let [reg, addr] = expect_operands::<2>(ops, &stmt.mnemonic, line)?;
                Instruction::Load { reg: register(reg, line)?, addr: self.byte(addr, line)? }
            }

            "LDI" | "SET" => {
                let [reg, value] = expect_operands::<2>(ops, &stmt.mnemonic, line)?;
                Instruction::SetImmediate {
                    reg: register(reg, line)?,
                    value: self.byte(value, line)? as u8,
                }
            }

            "STORE" | "ST" => {
                let [reg, addr] = expect_operands::<2>(ops, &stmt.mnemonic, line)?;
                Instruction::Store { reg: register(reg, line)?, addr: self.byte(addr, line)? }
            }

            "MOVE" | "MOV" => {
                let [src, dst] = expect_operands::<2>(ops, &stmt.mnemonic, line)?;
                Instruction::Move { src: register(src, line)?, dst: register(dst, line)? }
            }

            "ADD" => {
                let [dst, a, b] = expect_operands::<3>(ops, &stmt.mnemonic, line)?;
                Instruction::Add {
                    dst: register(dst, line)?,
                    a: register(a, line)?,
                    b: register(b, line)?,
                }
            }

            "JMP" | "JUMP" => {
                let [target] = expect_operands::<1>(ops, &stmt.mnemonic, line)?;
                Instruction::Jump { target: self.jump_target(target, line)? }
            }

            "JEQ" => {
                let [a, b, target] = expect_operands::<3>(ops, &stmt.mnemonic, line)?;
                let b = register(b, line)?;
                if b == 0 {
                    return Err(AssemblerError::SyntaxError {
                        line,
                        message: "JEQ cannot compare against R0".into(),
                    });
                }
                Instruction::CompareJump {
                    a: register(a, line)?,
                    b,
                    target: self.jump_target(target, line)?,
                }
            }

            "HALT" | "HLT" => {
                expect_operands::<0>(ops, &stmt.mnemonic, line)?;
                Instruction::Halt
            }

            _ => return Err(AssemblerError::UnknownMnemonic {
                line,
                mnemonic: stmt.mnemonic.clone(),
            }),
        };

        Ok(encode(&instr))
    }

    /// A number or a label.
    fn value(&self, operand: &str, line: usize) -> Result<usize, AssemblerError> {
        if let Some(value) = parse_number(operand) {
            return Ok(value);
        }

        self.symbols
            .get(&operand.to_uppercase())
            .copied()
            .ok_or_else(|| AssemblerError::UndefinedLabel {
                line,
                label: operand.to_string(),
            })
    }

    fn byte(&self, operand: &str, line: usize) -> Result<usize, AssemblerError> {
        let value = self.value(operand, line)?;
        if value > 0xFF {
            return Err(AssemblerError::ValueOutOfRange { line, value });
        }
        Ok(value)
    }

    fn jump_target(&self, operand: &str, line: usize) -> Result<usize, AssemblerError> {
        let target = self.byte(operand, line)?;
        if target & 0x0F != 0 {
            return Err(AssemblerError::MisalignedTarget { line, target });
        }
        Ok(target)
    }
}

fn expect_operands<'a, const N: usize>(
    operands: &'a [String],
    mnemonic: &str,
    line: usize,
) -> Result<[&'a str; N], AssemblerError> {
    let refs: Vec<&str> = operands.iter().map(String::as_str).collect();
    refs.try_into().map_err(|_| AssemblerError::SyntaxError {
        line,
        message: format!("{} takes {} operand(s), found {}", mnemonic, N, operands.len()),
    })
}

/// `R0`-`RF`, or a bare number 0-15.
fn register(operand: &str, line: usize) -> Result<usize, AssemblerError> {
    let upper = operand.to_uppercase();
    let index = match upper.strip_prefix('R') {
        Some(digit) => usize::from_str_radix(digit, 16).ok(),
        None => parse_number(&upper),
    };

    match index {
        Some(index) if index < 16 => Ok(index),
        _ => Err(AssemblerError::SyntaxError {
            line,
            message: format!("invalid register: {}", operand),
        }),
    }
}

/// Decimal or `0x` hexadecimal.
fn parse_number(operand: &str) -> Option<usize> {
    if let Some(hex) = operand.strip_prefix("0x").or_else(|| operand.strip_prefix("0X")) {
        return usize::from_str_radix(hex, 16).ok();
    }
    operand.parse::<usize>().ok()
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: usize },

    #[error("jump target {target:#04x} on line {line} must be a multiple of 0x10")]
    MisalignedTarget { line: usize, target: usize },
}
