//! CPU execution engine for the Vole machine.
//!
//! Implements the fetch-decode-execute cycle and dispatches each decoded
//! instruction to the ALU or the control unit.

use crate::cpu::{alu, control};
use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, Instruction, DecodeError};
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::trace::{Event, LogObserver, Observer};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of memory cells included in a [`Snapshot`].
pub const SNAPSHOT_MEMORY_CELLS: usize = 16;

/// Why the machine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// A HALT instruction was executed.
    Halt,
    /// The fetched word carried an opcode outside the instruction set.
    UnrecognizedOpcode(u8),
    /// A step failed with a [`CpuError`].
    Fault,
}

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has stopped. Terminal until a program is loaded or the CPU reset.
    Halted(StopReason),
}

/// The Vole CPU together with its memory.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// General-purpose registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Address of the next instruction to fetch.
    pub pc: usize,
    /// The last fetched instruction word.
    pub ir: u16,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count (for profiling).
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            pc: 0,
            ir: 0,
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.pc = 0;
        self.ir = 0;
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load program words into memory from address 0.
    ///
    /// At most 256 words are kept. The program counter goes back to 0 and a
    /// halted CPU is made runnable again; registers and memory past the
    /// program are left as they were.
    pub fn load_program<S: AsRef<str>>(&mut self, program: &[S]) -> usize {
        let loaded = self.mem.load_program(program);
        if program.len() > MEMORY_SIZE {
            log::warn!(
                "program has {} words, only the first {} were loaded",
                program.len(),
                MEMORY_SIZE
            );
        }

        self.pc = 0;
        self.ir = 0;
        self.state = CpuState::Running;
        self.last_instr = None;
        loaded
    }

    /// Execute a single instruction, logging events through `log`.
    pub fn step(&mut self) -> Result<Option<Instruction>, CpuError> {
        self.step_observed(&mut LogObserver)
    }

    /// Execute a single instruction.
    ///
    /// Returns the executed instruction, or `None` when the fetched word had
    /// an unrecognized opcode and the CPU halted instead. Any error leaves
    /// the CPU halted with [`StopReason::Fault`].
    pub fn step_observed(&mut self, observer: &mut dyn Observer) -> Result<Option<Instruction>, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let result = self.cycle(observer);
        if result.is_err() {
            self.state = CpuState::Halted(StopReason::Fault);
        }
        result
    }

    fn cycle(&mut self, observer: &mut dyn Observer) -> Result<Option<Instruction>, CpuError> {
        // Fetch
        let pc = self.pc;
        self.ir = alu::parse_word(self.mem.get(pc)?)?;
        observer.on_event(&Event::Fetch { pc, word: self.ir });

        self.cycles += 1;

        // Decode
        let instr = match decode::decode(self.ir) {
            Ok(instr) => instr,
            Err(DecodeError::InvalidOpcode(opcode)) => {
                self.state = CpuState::Halted(StopReason::UnrecognizedOpcode(opcode));
                self.last_instr = None;
                observer.on_event(&Event::UnrecognizedOpcode { pc, opcode });
                return Ok(None);
            }
        };

        // Execute
        let jumped = self.execute(instr, observer)?;
        self.last_instr = Some(instr);

        if self.state == CpuState::Running && !jumped {
            self.pc += 1;
        }

        Ok(Some(instr))
    }

    /// Run until halt or error, logging events through `log`.
    ///
    /// A program that never halts keeps this looping forever; use
    /// [`Cpu::run_limited`] when that matters.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        self.run_observed(&mut LogObserver)
    }

    /// Run until halt or error. Returns the number of steps executed.
    pub fn run_observed(&mut self, observer: &mut dyn Observer) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step_observed(observer)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_steps` instructions.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        self.run_limited_observed(max_steps, &mut LogObserver)
    }

    /// Run for at most `max_steps` instructions, reporting to `observer`.
    pub fn run_limited_observed(&mut self, max_steps: u64, observer: &mut dyn Observer) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_steps;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step_observed(observer)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    ///
    /// Returns true when the instruction wrote the program counter.
    fn execute(&mut self, instr: Instruction, observer: &mut dyn Observer) -> Result<bool, CpuError> {
        let mut jumped = false;

        match instr {
            Instruction::Load { reg, addr } => {
                control::load(reg, addr, &mut self.regs, &self.mem, observer)?;
            }

            Instruction::SetImmediate { reg, value } => {
                control::set_immediate(reg, value, &mut self.regs, observer)?;
            }

            Instruction::Store { reg, addr } => {
                control::store(reg, addr, &self.regs, &mut self.mem, observer)?;
            }

            Instruction::Move { src, dst } => {
                control::move_register(src, dst, &mut self.regs, observer)?;
            }

            Instruction::Add { dst, a, b } => {
                alu::add(a, b, dst, &mut self.regs, observer)?;
            }

            Instruction::Jump { target } => {
                control::jump(target, &mut self.pc, observer);
                jumped = true;
            }

            Instruction::CompareJump { a, b, target } => {
                jumped = control::compare_jump(a, b, target, &self.regs, &mut self.pc, observer)?;
            }

            Instruction::Halt => {
                self.state = CpuState::Halted(StopReason::Halt);
                observer.on_event(&Event::Halt { pc: self.pc });
            }
        }

        Ok(jumped)
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted, for whatever reason.
    pub fn is_halted(&self) -> bool {
        matches!(self.state, CpuState::Halted(_))
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Why the CPU stopped, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.state {
            CpuState::Running => None,
            CpuState::Halted(reason) => Some(reason),
        }
    }

    /// Capture the state shown to users.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            program_counter: self.pc,
            instruction_register: format!("{:04X}", self.ir),
            registers: self.regs
                .values()
                .iter()
                .map(|value| format!("{:02x}", value))
                .collect(),
            memory: self.mem
                .dump(0, SNAPSHOT_MEMORY_CELLS)
                .into_iter()
                .map(|(_, word)| word.to_string())
                .collect(),
            state: self.state,
            cycles: self.cycles,
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("ir", &format_args!("{:04X}", self.ir))
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Machine state as presented to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub program_counter: usize,
    /// Four hex digits.
    pub instruction_register: String,
    /// Sixteen values, two hex digits each.
    pub registers: Vec<String>,
    /// The first sixteen memory cells, as stored.
    pub memory: Vec<String>,
    pub state: CpuState,
    pub cycles: u64,
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- Machine State ---")?;
        writeln!(f, "Program Counter: {:02X}", self.program_counter)?;
        writeln!(f, "Instruction Register: {}", self.instruction_register)?;
        writeln!(f, "Registers: {}", self.registers.join(" "))?;
        writeln!(f, "Memory first {} cells: {}", self.memory.len(), self.memory.join(" "))?;
        let state = match self.state {
            CpuState::Running => "running".to_string(),
            CpuState::Halted(StopReason::Halt) => "halted (HALT)".to_string(),
            CpuState::Halted(StopReason::UnrecognizedOpcode(op)) => {
                format!("halted (unrecognized opcode {:X})", op)
            }
            CpuState::Halted(StopReason::Fault) => "halted (fault)".to_string(),
        };
        write!(f, "State: {} after {} steps", state, self.cycles)
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("register index {0} out of range (0-15)")]
    RegisterOutOfRange(usize),

    #[error("memory address {0} out of range (0-255)")]
    AddressOutOfRange(usize),

    #[error("not a hexadecimal word: {text:?}")]
    Parse { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::trace::Recorder;

    fn loaded(program: &[&str]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(program);
        cpu
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = loaded(&["C000"]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.stop_reason(), Some(StopReason::Halt));
        assert_eq!(cpu.pc, 0);
    }

    #[test]
    fn test_cpu_sum_program() {
        let mut cpu = loaded(&["2005", "2103", "5201", "3200", "C000"]);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0).unwrap(), 5);
        assert_eq!(cpu.regs.get(1).unwrap(), 3);
        assert_eq!(cpu.regs.get(2).unwrap(), 8);
        assert_eq!(cpu.mem.get(0).unwrap(), "08");
        assert_eq!(cpu.pc, 4);
        assert_eq!(cpu.ir, 0xC000);
        assert_eq!(cpu.cycles, 5);
    }

    #[test]
    fn test_step_advances_pc() {
        let mut cpu = loaded(&["2005", "C000"]);

        let instr = cpu.step().unwrap();
        assert_eq!(instr, Some(Instruction::SetImmediate { reg: 0, value: 5 }));
        assert_eq!(cpu.pc, 1);
        assert_eq!(cpu.ir, 0x2005);
    }

    #[test]
    fn test_jump_overrides_increment() {
        let mut cpu = loaded(&["2001", "2002", "B000"]);

        cpu.run_limited(3).unwrap();
        assert_eq!(cpu.pc, 0);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_compare_jump_taken_and_not() {
        // R1 = R2 = 7, so the compare at 02 jumps to 0x10 which halts.
        let mut cpu = loaded(&["2107", "2207", "B112"]);
        cpu.mem.set(0x10, "C000").unwrap();

        cpu.run().unwrap();
        assert_eq!(cpu.pc, 0x10);
        assert_eq!(cpu.stop_reason(), Some(StopReason::Halt));

        // Different values fall through to the HALT right after.
        let mut cpu = loaded(&["2107", "2208", "B112", "C000"]);
        cpu.run().unwrap();
        assert_eq!(cpu.pc, 3);
    }

    #[test]
    fn test_unrecognized_opcode_halts() {
        let mut cpu = loaded(&["2001", "7123"]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 2);
        assert_eq!(cpu.stop_reason(), Some(StopReason::UnrecognizedOpcode(7)));
        assert_eq!(cpu.pc, 1);
    }

    #[test]
    fn test_zero_word_is_unrecognized() {
        let mut cpu = Cpu::new();
        assert_eq!(cpu.step().unwrap(), None);
        assert_eq!(cpu.stop_reason(), Some(StopReason::UnrecognizedOpcode(0)));
    }

    #[test]
    fn test_halted_cpu_refuses_to_step() {
        let mut cpu = loaded(&["C000"]);
        cpu.run().unwrap();

        assert!(matches!(cpu.step(), Err(CpuError::NotRunning(_))));
        assert_eq!(cpu.cycles, 1);
    }

    #[test]
    fn test_bad_fetch_is_fatal() {
        let mut cpu = loaded(&["20G5"]);

        let err = cpu.run().unwrap_err();
        assert_eq!(err, CpuError::Parse { text: "20G5".into() });
        assert_eq!(cpu.stop_reason(), Some(StopReason::Fault));
    }

    #[test]
    fn test_pc_past_end_is_fatal() {
        let mut cpu = Cpu::new();
        cpu.load_program(&["2001"]);
        cpu.pc = 255;
        cpu.mem.set(255, "2001").unwrap();

        cpu.step().unwrap();
        assert_eq!(cpu.pc, 256);
        assert_eq!(cpu.step(), Err(CpuError::AddressOutOfRange(256)));
    }

    #[test]
    fn test_reload_clears_halt() {
        let mut cpu = loaded(&["2001", "C000"]);
        cpu.run().unwrap();
        assert!(cpu.is_halted());

        cpu.load_program(&["2102", "C000"]);
        assert!(cpu.is_running());
        assert_eq!(cpu.pc, 0);

        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).unwrap(), 1);
        assert_eq!(cpu.regs.get(1).unwrap(), 2);
    }

    #[test]
    fn test_observer_sees_events() {
        let mut cpu = loaded(&["2005", "C000"]);
        let mut rec = Recorder::new();

        cpu.run_observed(&mut rec).unwrap();

        assert_eq!(rec.events, vec![
            Event::Fetch { pc: 0, word: 0x2005 },
            Event::RegisterWrite { index: 0, old: 0, new: 5 },
            Event::Fetch { pc: 1, word: 0xC000 },
            Event::Halt { pc: 1 },
        ]);
    }

    #[test]
    fn test_run_limited_stops_loop() {
        let mut cpu = loaded(&["B000"]);

        let executed = cpu.run_limited(50).unwrap();
        assert_eq!(executed, 50);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_snapshot() {
        let mut cpu = loaded(&["2005", "2103", "5201", "3200", "C000"]);
        cpu.run().unwrap();

        let snap = cpu.snapshot();
        assert_eq!(snap.program_counter, 4);
        assert_eq!(snap.instruction_register, "C000");
        assert_eq!(snap.registers.len(), 16);
        assert_eq!(snap.registers[2], "08");
        assert_eq!(snap.memory.len(), 16);
        assert_eq!(snap.memory[0], "08");
        assert_eq!(snap.memory[1], "2103");

        let text = snap.to_string();
        assert!(text.contains("halted (HALT)"));
    }

    #[test]
    fn test_reset() {
        let mut cpu = loaded(&["2005", "C000"]);
        cpu.run().unwrap();
        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.regs.get(0).unwrap(), 0);
        assert_eq!(cpu.mem.get(0).unwrap(), "0000");
        assert_eq!(cpu.cycles, 0);
    }
}
