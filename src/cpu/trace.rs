//! Execution events.
//!
//! The engine never prints. Everything worth showing a user (register and
//! memory writes, jumps, halts, advisories) is handed to an [`Observer`]
//! supplied by the caller.

use serde::{Serialize, Deserialize};

/// A single observable side effect of executing an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// An instruction word was fetched into the instruction register.
    Fetch { pc: usize, word: u16 },
    /// A register changed.
    RegisterWrite { index: usize, old: u8, new: u8 },
    /// A memory cell changed.
    MemoryWrite { address: usize, old: String, new: String },
    /// Unconditional jump taken.
    Jump { target: usize },
    /// Compare-jump evaluated.
    CompareJump { a: usize, b: usize, target: usize, taken: bool },
    /// An addition produced zero.
    ZeroSum { dest: usize },
    /// HALT executed.
    Halt { pc: usize },
    /// The opcode is not part of the instruction set; the machine stopped.
    UnrecognizedOpcode { pc: usize, opcode: u8 },
}

/// Receives execution events.
pub trait Observer {
    fn on_event(&mut self, event: &Event);
}

/// Discards every event.
impl Observer for () {
    fn on_event(&mut self, _event: &Event) {}
}

/// Forwards events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::Fetch { pc, word } => {
                log::debug!("fetch PC={:02X}: {:04X}", pc, word);
            }
            Event::RegisterWrite { index, old, new } => {
                log::trace!("R{:X}: {:02x} -> {:02x}", index, old, new);
            }
            Event::MemoryWrite { address, old, new } => {
                log::trace!("[{:02X}]: {} -> {}", address, old, new);
            }
            Event::Jump { target } => {
                log::debug!("jump to {:02X}", target);
            }
            Event::CompareJump { a, b, target, taken } => {
                if *taken {
                    log::debug!("R{:X} == R{:X}, jump to {:02X}", a, b, target);
                } else {
                    log::debug!("R{:X} != R{:X}, fall through", a, b);
                }
            }
            Event::ZeroSum { dest } => {
                log::warn!("addition into R{:X} produced zero", dest);
            }
            Event::Halt { pc } => {
                log::info!("halted at PC={:02X}", pc);
            }
            Event::UnrecognizedOpcode { pc, opcode } => {
                log::warn!("unrecognized opcode {:X} at PC={:02X}, halting", opcode, pc);
            }
        }
    }
}

/// Keeps every event in order. Handy in tests and for the debugger's log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Observer for Recorder {
    fn on_event(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}
