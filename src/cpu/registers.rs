//! Vole register bank.
//!
//! The machine has 16 general-purpose registers, R0 through RF, each holding
//! a single unsigned byte. Every write is masked to the low 8 bits, so a
//! register can never hold anything outside 0-255.

use crate::cpu::execute::CpuError;
use crate::cpu::trace::{Event, Observer};
use serde::{Serialize, Deserialize};

/// The number of general-purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// The Vole register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    cells: [u8; REGISTER_COUNT],
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self {
            cells: [0; REGISTER_COUNT],
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.cells = [0; REGISTER_COUNT];
    }

    /// Read register `index` (0-15).
    pub fn get(&self, index: usize) -> Result<u8, CpuError> {
        self.cells
            .get(index)
            .copied()
            .ok_or(CpuError::RegisterOutOfRange(index))
    }

    /// Write register `index`, keeping only the low 8 bits of `value`.
    ///
    /// Returns the value the register held before the write.
    pub fn set(&mut self, index: usize, value: i64) -> Result<u8, CpuError> {
        let cell = self.cells
            .get_mut(index)
            .ok_or(CpuError::RegisterOutOfRange(index))?;
        let old = *cell;
        *cell = (value & 0xFF) as u8;
        Ok(old)
    }

    /// Write a register and report the change to an observer.
    pub fn write(&mut self, index: usize, value: i64, observer: &mut dyn Observer) -> Result<(), CpuError> {
        let old = self.set(index, value)?;
        observer.on_event(&Event::RegisterWrite {
            index,
            old,
            new: self.cells[index],
        });
        Ok(())
    }

    /// All register values in index order.
    pub fn values(&self) -> &[u8; REGISTER_COUNT] {
        &self.cells
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::trace::Recorder;

    #[test]
    fn test_set_masks_to_byte() {
        let mut regs = Registers::new();

        regs.set(3, 0x1FF).unwrap();
        assert_eq!(regs.get(3).unwrap(), 0xFF);

        regs.set(3, 256).unwrap();
        assert_eq!(regs.get(3).unwrap(), 0);

        regs.set(3, -1).unwrap();
        assert_eq!(regs.get(3).unwrap(), 0xFF);
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut regs = Registers::new();
        assert_eq!(regs.set(0, 7).unwrap(), 0);
        assert_eq!(regs.set(0, 9).unwrap(), 7);
    }

    #[test]
    fn test_bounds() {
        let mut regs = Registers::new();

        assert!(regs.get(15).is_ok());
        assert!(matches!(regs.get(16), Err(CpuError::RegisterOutOfRange(16))));
        assert!(matches!(regs.set(16, 1), Err(CpuError::RegisterOutOfRange(16))));
    }

    #[test]
    fn test_write_emits_event() {
        let mut regs = Registers::new();
        let mut rec = Recorder::new();

        regs.set(2, 5).unwrap();
        regs.write(2, 0x108, &mut rec).unwrap();

        assert_eq!(rec.events, vec![Event::RegisterWrite { index: 2, old: 5, new: 8 }]);
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        regs.set(4, 42).unwrap();
        regs.reset();
        assert_eq!(regs, Registers::new());
    }
}
