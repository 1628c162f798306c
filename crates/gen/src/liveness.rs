//! Which registers hold a defined value at the current generation point.

use rvdiff_core::instruction::Instruction;
use rvdiff_core::register::{self, Float, RiscV};

/// Bitsets of written integer and floating point registers. `x0` is always live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLiveness {
    int: u32,
    float: u32,
}

impl Default for RegisterLiveness {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterLiveness {
    #[must_use]
    pub const fn new() -> Self {
        Self { int: 1, float: 0 }
    }

    #[must_use]
    pub fn is_int_live(&self, reg: Option<RiscV>) -> bool {
        self.int & (1 << register::index(reg)) != 0
    }

    #[must_use]
    pub fn is_float_live(&self, reg: Float) -> bool {
        self.float & (1 << reg.get()) != 0
    }

    /// Whether every register `instruction` reads has been written.
    #[must_use]
    pub fn reads_live(&self, instruction: &Instruction) -> bool {
        instruction.int_sources().into_iter().all(|reg| self.is_int_live(reg))
            && instruction.float_source().is_none_or(|reg| self.is_float_live(reg))
    }

    /// Marks the destinations of `instruction` as live.
    pub fn record(&mut self, instruction: &Instruction) {
        if let Some(reg) = instruction.int_dest() {
            self.int |= 1 << reg.get();
        }

        if let Some(reg) = instruction.float_dest() {
            self.float |= 1 << reg.get();
        }
    }

    pub fn record_all<'a>(&mut self, instructions: impl IntoIterator<Item = &'a Instruction>) {
        for it in instructions {
            self.record(it);
        }
    }

    /// Live integer registers, `None` (`x0`) first.
    #[must_use]
    pub fn live_ints(&self) -> Vec<Option<RiscV>> {
        (0..32).filter(|idx| self.int & (1 << idx) != 0).map(RiscV::with_u8).collect()
    }

    #[must_use]
    pub fn live_floats(&self) -> Vec<Float> {
        (0..32).filter(|idx| self.float & (1 << idx) != 0).map(Float::masked).collect()
    }
}

#[cfg(test)]
mod tests {
    use rvdiff_core::instruction::{I, Instruction, IntToF, R};
    use rvdiff_core::opcode;
    use rvdiff_core::register::{Float, RiscV};

    use super::RegisterLiveness;

    #[test]
    fn writes_make_registers_readable() {
        let mut live = RegisterLiveness::new();
        assert_eq!(live.live_ints(), vec![None]);
        assert!(live.live_floats().is_empty());

        let add = Instruction::from(R::new(Some(RiscV::T2), None, Some(RiscV::RA), opcode::R::ADD));
        assert!(!live.reads_live(&add));

        live.record(&Instruction::from(I::new(7, None, Some(RiscV::T2), opcode::I::ADDI)));
        assert!(live.reads_live(&add));
        assert_eq!(live.live_ints(), vec![None, Some(RiscV::T2)]);

        let fmv = Instruction::from(IntToF {
            rd: Float::masked(31),
            rs1: Some(RiscV::T2),
            rm: opcode::RoundingMode::RNE,
            opcode: opcode::IntToF::FMV_D_X,
        });
        live.record(&fmv);
        assert_eq!(live.live_floats(), vec![Float::masked(31)]);
    }
}
