use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rvdiff_core::INSTRUCTION_LEN;
use rvdiff_core::instruction::Instruction;

use crate::liveness::RegisterLiveness;
use crate::memstore::MemStoreState;
use crate::memview::MemoryView;
use crate::picker::PickerWeights;
use crate::privilege::PrivilegeState;

/// Everything known about one generated program while it is being built.
///
/// Instruction `i` of block `b` lives at `bb_start_addr_seq[b] + 4 * i`.
/// Block addresses are absolute; the memory view works on offsets from `mem_base`.
#[derive(Debug, Clone)]
pub struct FuzzerState {
    pub memsize: u64,
    pub mem_base: u64,
    pub is_design_64bit: bool,

    pub bb_start_addr_seq: Vec<u64>,
    pub instr_objs_seq: Vec<Vec<Instruction>>,

    pub final_bb_base_addr: u64,
    pub final_bb: Vec<Instruction>,

    pub ctxsv_bb_base_addr: u64,
    pub ctxsv_bb: Vec<Instruction>,
    pub ctxsv_size_upperbound: u64,

    pub memview_blacklist: MemoryView,
    pub memstorestate: MemStoreState,
    pub privilegestate: PrivilegeState,
    pub picker_weights: PickerWeights,
    pub liveness: RegisterLiveness,

    pub rng: ChaCha8Rng,
}

impl FuzzerState {
    #[must_use]
    pub fn new(memsize: u64, is_design_64bit: bool, seed: u64) -> Self {
        Self {
            memsize,
            mem_base: 0,
            is_design_64bit,
            bb_start_addr_seq: Vec::new(),
            instr_objs_seq: Vec::new(),
            final_bb_base_addr: 0,
            final_bb: Vec::new(),
            ctxsv_bb_base_addr: 0,
            ctxsv_bb: Vec::new(),
            ctxsv_size_upperbound: 0,
            memview_blacklist: MemoryView::new(memsize),
            memstorestate: MemStoreState::new(),
            privilegestate: PrivilegeState::new(),
            picker_weights: PickerWeights::default(),
            liveness: RegisterLiveness::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Absolute address of instruction `idx` in block `bb`.
    #[must_use]
    pub fn instr_addr(&self, bb: usize, idx: usize) -> u64 {
        self.bb_start_addr_seq[bb] + INSTRUCTION_LEN * idx as u64
    }

    /// Offset of an absolute address from the region start.
    #[must_use]
    pub fn offset_of(&self, addr: u64) -> u64 {
        addr - self.mem_base
    }

    pub fn push_block(&mut self, base: u64, instructions: Vec<Instruction>) {
        invariant!(base % INSTRUCTION_LEN == 0, "misaligned block at {base:#x}");

        self.bb_start_addr_seq.push(base);
        self.instr_objs_seq.push(instructions);
    }

    /// Every block with its base address: the ordinary blocks, then the context setter and
    /// the terminator.
    pub fn all_blocks(&self) -> impl Iterator<Item = (u64, &[Instruction])> {
        self.bb_start_addr_seq
            .iter()
            .copied()
            .zip(self.instr_objs_seq.iter().map(Vec::as_slice))
            .chain([
                (self.ctxsv_bb_base_addr, self.ctxsv_bb.as_slice()),
                (self.final_bb_base_addr, self.final_bb.as_slice()),
            ])
    }

    /// One past the last byte any block occupies, as a region offset.
    #[must_use]
    pub fn used_len(&self) -> u64 {
        let ctxsv_end = self.offset_of(self.ctxsv_bb_base_addr)
            + self.ctxsv_size_upperbound.max(INSTRUCTION_LEN * self.ctxsv_bb.len() as u64);

        self.all_blocks()
            .map(|(base, block)| self.offset_of(base) + INSTRUCTION_LEN * block.len() as u64)
            .chain([ctxsv_end])
            .max()
            .unwrap_or(0)
    }

    /// A `memsize`-byte buffer of random bytes from the instance RNG, for the encoder to
    /// overwrite with the program.
    pub fn random_region(&mut self) -> Vec<u8> {
        let mut region = vec![0; self.memsize as usize];
        self.rng.fill_bytes(&mut region);
        region
    }
}
