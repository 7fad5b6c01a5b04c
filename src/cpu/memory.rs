//! Vole main memory.
//!
//! 256 cells addressed 0x00-0xFF. Each cell holds its word as hexadecimal
//! text, exactly as it was loaded or stored; nothing is validated until the
//! cell is fetched or loaded into a register.

use crate::cpu::execute::CpuError;
use crate::cpu::trace::{Event, Observer};
use serde::{Serialize, Deserialize};

/// The number of memory cells.
pub const MEMORY_SIZE: usize = 256;

/// The content of a cell that has never been written.
pub const EMPTY_WORD: &str = "0000";

/// Vole memory: 256 text cells.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<String>,
}

impl Memory {
    /// Create a new memory with every cell set to `0000`.
    pub fn new() -> Self {
        Self {
            cells: vec![EMPTY_WORD.to_string(); MEMORY_SIZE],
        }
    }

    /// Read a cell by address (0-255).
    pub fn get(&self, addr: usize) -> Result<&str, CpuError> {
        self.cells
            .get(addr)
            .map(String::as_str)
            .ok_or(CpuError::AddressOutOfRange(addr))
    }

    /// Overwrite a cell verbatim.
    pub fn set(&mut self, addr: usize, word: impl Into<String>) -> Result<(), CpuError> {
        let cell = self.cells
            .get_mut(addr)
            .ok_or(CpuError::AddressOutOfRange(addr))?;
        *cell = word.into();
        Ok(())
    }

    /// Overwrite a cell and report the change to an observer.
    pub fn write(&mut self, addr: usize, word: String, observer: &mut dyn Observer) -> Result<(), CpuError> {
        let cell = self.cells
            .get_mut(addr)
            .ok_or(CpuError::AddressOutOfRange(addr))?;
        let old = std::mem::replace(cell, word);
        observer.on_event(&Event::MemoryWrite {
            address: addr,
            old,
            new: cell.clone(),
        });
        Ok(())
    }

    /// Clear all cells back to `0000`.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = EMPTY_WORD.to_string();
        }
    }

    /// Copy program words into memory starting at address 0.
    ///
    /// Words past the end of memory are dropped. Returns how many were copied.
    pub fn load_program<S: AsRef<str>>(&mut self, program: &[S]) -> usize {
        let count = program.len().min(MEMORY_SIZE);
        for (cell, word) in self.cells.iter_mut().zip(program) {
            *cell = word.as_ref().to_string();
        }
        count
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, &str)> {
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        (start.min(end)..end)
            .map(|i| (i, self.cells[i].as_str()))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.cells
            .iter()
            .filter(|cell| cell.as_str() != EMPTY_WORD)
            .count();

        f.debug_struct("Memory")
            .field("used_cells", &used)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::trace::Recorder;

    #[test]
    fn test_fresh_memory_is_zero_words() {
        let mem = Memory::new();
        assert_eq!(mem.get(0).unwrap(), "0000");
        assert_eq!(mem.get(255).unwrap(), "0000");
    }

    #[test]
    fn test_set_is_verbatim() {
        let mut mem = Memory::new();
        mem.set(10, "zz").unwrap();
        assert_eq!(mem.get(10).unwrap(), "zz");
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::new();
        assert!(matches!(mem.get(256), Err(CpuError::AddressOutOfRange(256))));
        assert!(matches!(mem.set(300, "0000"), Err(CpuError::AddressOutOfRange(300))));
    }

    #[test]
    fn test_load_program_truncates() {
        let mut mem = Memory::new();
        let program: Vec<String> = (0..300).map(|i| format!("{:04X}", i)).collect();

        assert_eq!(mem.load_program(&program), MEMORY_SIZE);
        assert_eq!(mem.get(0).unwrap(), "0000");
        assert_eq!(mem.get(255).unwrap(), "00FF");
    }

    #[test]
    fn test_load_program_keeps_tail() {
        let mut mem = Memory::new();
        mem.set(5, "1234").unwrap();

        assert_eq!(mem.load_program(&["2005", "C000"]), 2);
        assert_eq!(mem.get(1).unwrap(), "C000");
        assert_eq!(mem.get(5).unwrap(), "1234");
    }

    #[test]
    fn test_write_emits_event() {
        let mut mem = Memory::new();
        let mut rec = Recorder::new();

        mem.write(0, "08".to_string(), &mut rec).unwrap();

        assert_eq!(rec.events, vec![Event::MemoryWrite {
            address: 0,
            old: "0000".to_string(),
            new: "08".to_string(),
        }]);
    }

    #[test]
    fn test_dump_clamps() {
        let mem = Memory::new();
        assert_eq!(mem.dump(250, 10).len(), 6);
        assert!(mem.dump(400, 4).is_empty());
    }
}
