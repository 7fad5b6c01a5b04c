//! WebAssembly bindings for the Vole emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::Cpu;
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_instruction;
use crate::asm::program::parse_program;
use crate::cpu::MEMORY_SIZE;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<String>,
    /// Message of the error that stopped the last step or run.
    last_error: Option<String>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Vec::new(),
            last_error: None,
        }
    }

    /// Load program words, one per line. Returns how many were loaded.
    #[wasm_bindgen]
    pub fn load_words(&mut self, text: &str) -> usize {
        self.program = parse_program(text);
        self.cpu = Cpu::new();
        self.last_error = None;
        self.cpu.load_program(&self.program)
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let words = assemble(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        self.program = words;
        self.cpu = Cpu::new();
        self.last_error = None;
        Ok(self.cpu.load_program(&self.program))
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        if !self.cpu.is_running() {
            return Err(JsError::new("CPU is halted"));
        }

        if let Err(e) = self.cpu.step() {
            let message = e.to_string();
            self.last_error = Some(message.clone());
            return Err(JsError::new(&message));
        }

        Ok(disassemble_instruction(&format!("{:04X}", self.cpu.ir)))
    }

    /// Run until halt or max steps. A fault is kept in `last_error`.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> u64 {
        if let Err(e) = self.cpu.run_limited(max_steps as u64) {
            self.last_error = Some(e.to_string());
        }
        self.cpu.cycles
    }

    /// The error that stopped the machine, if any.
    #[wasm_bindgen]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    /// Reset CPU to initial state with loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.last_error = None;
        if !self.program.is_empty() {
            self.cpu.load_program(&self.program);
        }
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Get step count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.cpu.pc
    }

    /// Get the instruction register.
    #[wasm_bindgen]
    pub fn ir(&self) -> u16 {
        self.cpu.ir
    }

    /// Get a register value (0 for an index outside R0-RF).
    #[wasm_bindgen]
    pub fn register(&self, index: usize) -> u8 {
        self.cpu.regs.get(index).unwrap_or(0)
    }

    /// Get all register values.
    #[wasm_bindgen]
    pub fn registers(&self) -> Vec<u8> {
        self.cpu.regs.values().to_vec()
    }

    /// Get memory cell text at an address (0-255).
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: usize) -> String {
        self.cpu.mem.get(addr).unwrap_or("").to_string()
    }

    /// Get all memory cells.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> Vec<String> {
        self.cpu.mem
            .dump(0, MEMORY_SIZE)
            .into_iter()
            .map(|(_, word)| word.to_string())
            .collect()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Get the machine snapshot as JSON.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot())
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the program words, one per line.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<String, JsError> {
    let words = assemble(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(words.join("\n"))
}

/// Disassemble a single word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: &str) -> String {
    disassemble_instruction(word)
}
