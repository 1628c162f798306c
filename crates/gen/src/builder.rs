//! Reference block builder.
//!
//! Lays out a complete program in the fuzzer state: the initial block with the relocator
//! prologue and register initialization, the context setter, a run of random blocks and
//! the terminator. Memory operations get their targets only once every block is in place
//! and blacklisted.

use std::ops::RangeInclusive;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::IndexedRandom;
use rvdiff_core::INSTRUCTION_LEN;
use rvdiff_core::disassemble::FmtInstruction;
use rvdiff_core::instruction::{
    Branch, Consumer, Csr, CsrI, FLoad, FStore, FToInt, I, Instruction, IntToF, J, Load, Producer0,
    Producer1, R, Store, U,
};
use rvdiff_core::opcode;
use rvdiff_core::register::{Float, RiscV};
use strum::IntoEnumIterator;

use crate::descent::gen_priv_descent_instr;
use crate::liveness::RegisterLiveness;
use crate::picker::pick_memop_addr;
use crate::privilege::Privilege;
use crate::resolve::split_hi_lo;
use crate::{FuzzerState, GenError, blacklist};

/// Holds the physical base of the region for the whole program.
pub const RELOC: RiscV = RiscV::S1;
/// Address register of memory operations.
const ADDR: RiscV = RiscV::T1;
/// Scratch register of CSR setup sequences.
const TMP: RiscV = RiscV::T0;

/// Destinations available to random instructions: everything but `x0`, `t0`, `t1` and `s1`.
const DEST_REGS: [RiscV; 28] = {
    let mut regs = [RiscV::RA; 28];
    let mut idx = 0;
    let mut reg = 1;
    while reg < 32 {
        if reg != TMP.get() && reg != ADDR.get() && reg != RELOC.get() {
            regs[idx] = match RiscV::with_u8(reg) {
                Some(it) => it,
                None => unreachable!(),
            };
            idx += 1;
        }
        reg += 1;
    }
    regs
};

/// Region offsets at or above this cannot be materialized with `lui`/`addi` without
/// sign-extension on 64-bit designs.
pub const MAX_MEMSIZE: u64 = 0x7fff_f000;

mod csr {
    pub const SSTATUS: u16 = 0x100;
    pub const SSCRATCH: u16 = 0x140;
    pub const SEPC: u16 = 0x141;
    pub const MSTATUS: u16 = 0x300;
    pub const MTVEC: u16 = 0x305;
    pub const MSCRATCH: u16 = 0x340;
    pub const MEPC: u16 = 0x341;
    pub const PMPCFG0: u16 = 0x3a0;
    pub const PMPADDR0: u16 = 0x3b0;
}

const MSTATUS_MPP_SHIFT: u32 = 11;
const MSTATUS_MPP_MASK: u32 = 0b11 << MSTATUS_MPP_SHIFT;
const MSTATUS_FS_INITIAL: u32 = 0b01 << 13;
const SSTATUS_SPP: u32 = 1 << 8;

/// `pmpcfg0` entry 0: NAPOT, readable, writable, executable.
const PMP_ALL_RWX: u16 = 0x1f;

/// Instructions in the context setter; it never varies in length.
const CTXSV_LEN: u64 = 22;

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderConfig {
    /// Random blocks between the context setter and the terminator.
    pub n_blocks: usize,
    /// Random instructions in each block body, before its ending.
    pub block_len: RangeInclusive<usize>,
    /// Unused instruction slots left between consecutive blocks.
    pub max_gap: usize,
    /// Bytes reserved for the context setter; raised to fit it if too small.
    pub ctxsv_size_upperbound: u64,
    /// Probability that a block not in user mode ends with a privilege descent.
    pub descent_probability: f64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            n_blocks: 8,
            block_len: 4..=24,
            max_gap: 4,
            ctxsv_size_upperbound: 0x80,
            descent_probability: 0.25,
        }
    }
}

/// A memory operation whose address materialization (`lui`, `addi` at `idx`, `idx + 1`) still
/// needs its target.
#[derive(Debug, Clone, Copy)]
struct PendingMemOp {
    bb: usize,
    idx: usize,
    is_load: bool,
    align_bits: u8,
}

#[derive(Debug, Clone, Copy)]
enum MemOp {
    Load(opcode::Load),
    FLoad(opcode::FLoad),
    Store(opcode::Store),
    FStore(opcode::FStore),
}

impl MemOp {
    fn candidates(is_load: bool, is_64bit: bool, with_float: bool) -> Vec<Self> {
        match is_load {
            true => opcode::Load::iter()
                .filter(|op| is_64bit || !op.is_rv64_only())
                .map(Self::Load)
                .chain(opcode::FLoad::iter().filter(|_| with_float).map(Self::FLoad))
                .collect(),

            false => opcode::Store::iter()
                .filter(|op| is_64bit || !op.is_rv64_only())
                .map(Self::Store)
                .chain(opcode::FStore::iter().filter(|_| with_float).map(Self::FStore))
                .collect(),
        }
    }

    const fn is_load(self) -> bool {
        matches!(self, Self::Load(_) | Self::FLoad(_))
    }

    const fn align_bits(self) -> u8 {
        match self {
            Self::Load(op) => op.alignment_bits(),
            Self::FLoad(op) => op.alignment_bits(),
            Self::Store(op) => op.alignment_bits(),
            Self::FStore(op) => op.alignment_bits(),
        }
    }

    /// The access itself, through `ADDR` with a zero offset.
    fn instruction<G: Rng + ?Sized>(self, rng: &mut G, live: &Live) -> Instruction {
        let rs1 = Some(ADDR);

        match self {
            Self::Load(op) => Load::new(0, rs1, Some(dest(rng)), op).into(),
            Self::FLoad(opcode) => FLoad { imm: 0, rs1, rd: float(rng), opcode }.into(),
            Self::Store(op) => Store::new(0, rs1, live.int(rng), op).into(),
            Self::FStore(opcode) => FStore { imm: 0, rs1, rs2: live.float(rng), opcode }.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    AluR,
    AluI,
    Load,
    Store,
    Csr,
    Branch,
    Float,
}

impl BodyKind {
    const ALL: [Self; 7] =
        [Self::AluR, Self::AluI, Self::Load, Self::Store, Self::Csr, Self::Branch, Self::Float];

    const fn weight(self, with_float: bool) -> u32 {
        match self {
            Self::AluR | Self::AluI => 4,
            Self::Load | Self::Store => 2,
            Self::Csr | Self::Branch => 1,
            Self::Float if with_float => 1,
            Self::Float => 0,
        }
    }
}

fn dest<G: Rng + ?Sized>(rng: &mut G) -> RiscV {
    DEST_REGS[rng.random_range(0..DEST_REGS.len())]
}

fn float<G: Rng + ?Sized>(rng: &mut G) -> Float {
    Float::masked(rng.random_range(0..32))
}

/// Registers random instructions may read from.
struct Live {
    ints: Vec<Option<RiscV>>,
    floats: Vec<Float>,
}

impl Live {
    fn of(liveness: &RegisterLiveness) -> Self {
        Self { ints: liveness.live_ints(), floats: liveness.live_floats() }
    }

    /// `x0` when nothing else has been written yet.
    fn int<G: Rng + ?Sized>(&self, rng: &mut G) -> Option<RiscV> {
        self.ints.choose(rng).copied().flatten()
    }

    /// Callers check [`Self::has_floats`] first.
    fn float<G: Rng + ?Sized>(&self, rng: &mut G) -> Float {
        self.floats.choose(rng).copied().unwrap_or(Float::masked(0))
    }

    fn has_floats(&self) -> bool {
        !self.floats.is_empty()
    }
}

/// `lui rd, hi; addi rd, rd, lo`, always both, so the sequence can be patched later.
fn li_fixed(rd: RiscV, value: u32) -> [Instruction; 2] {
    let (hi, lo) = split_hi_lo(value);

    [
        U::new(hi, Some(rd), opcode::U::LUI).into(),
        I::new(lo, Some(rd), Some(rd), opcode::I::ADDI).into(),
    ]
}

/// `rd = RELOC + offset`.
fn relocated(rd: RiscV, offset: u32) -> [Instruction; 3] {
    let [lui, addi] = li_fixed(rd, offset);

    [lui, addi, R::new(Some(rd), Some(RELOC), Some(rd), opcode::R::ADD).into()]
}

/// Rewrites the `li_fixed` pair at `idx` to load `value`.
fn patch_li(block: &mut [Instruction], idx: usize, value: u32) {
    let (hi, lo) = split_hi_lo(value);

    match &mut block[idx..=idx + 1] {
        [Instruction::U(lui), Instruction::I(addi)] => {
            lui.imm = hi;
            addi.imm = lo;
        }

        _ => invariant!(false, "no lui/addi pair at index {idx}"),
    }
}

fn csr_write(op: opcode::Csr, csr: u16, rs1: RiscV) -> Instruction {
    Csr::new(csr, Some(rs1), None, op).into()
}

/// `jal x0` from `from` to `to`; the encoder rejects offsets out of reach.
fn jal_to(from: u64, to: u64) -> Instruction {
    J::new(to.wrapping_sub(from) as u32, None, opcode::J::JAL).into()
}

fn offset_u32(state: &FuzzerState, at: u64, addr: u64) -> Result<u32, GenError> {
    u32::try_from(state.offset_of(addr))
        .map_err(|_| GenError::ResolutionOutOfRange { addr: at, value: addr })
}

struct Builder<'a> {
    state: &'a mut FuzzerState,
    config: &'a BuilderConfig,
    pending: Vec<PendingMemOp>,
}

/// Fills `state` with a runnable program.
///
/// # Errors
/// [`GenError::RegionTooLarge`] for regions past [`MAX_MEMSIZE`],
/// [`GenError::LayoutOverflow`] when the region cannot hold the code and a data slot,
/// or any error of the address picker and privilege descent.
pub fn populate(state: &mut FuzzerState, config: &BuilderConfig) -> Result<(), GenError> {
    if state.memsize > MAX_MEMSIZE {
        return Err(GenError::RegionTooLarge { memsize: state.memsize, max: MAX_MEMSIZE });
    }

    let mut builder = Builder { state, config, pending: Vec::new() };

    let ctxsv_base = builder.initial_block();
    let first_block = builder.context_setter(ctxsv_base)?;

    let mut cursor = first_block;
    for _ in 0..builder.config.n_blocks {
        cursor = builder.fuzzed_block(cursor)?;
    }

    builder.terminator(cursor)?;
    builder.place_memops()?;

    if tracing::enabled!(tracing::Level::TRACE) {
        for (base, block) in builder.state.all_blocks() {
            for (idx, instruction) in block.iter().enumerate() {
                let addr = base + INSTRUCTION_LEN * idx as u64;
                tracing::trace!("{addr:#010x}: {}", FmtInstruction::new(instruction));
            }
        }
    }

    Ok(())
}

impl Builder<'_> {
    fn is_64bit(&self) -> bool {
        self.state.is_design_64bit
    }

    /// Lays out the initial block at the region start; returns the context setter base.
    fn initial_block(&mut self) -> u64 {
        let base = self.state.mem_base;

        let mut block: Vec<Instruction> = vec![
            Producer0 { rd: Some(RELOC), imm: None }.into(),
            Producer1 { rd: Some(RELOC), imm: None }.into(),
        ];

        if self.is_64bit() {
            // `lui` sign-extends; bases at or above 2GiB need the upper half cleared.
            block.push(I::new(32, Some(RELOC), Some(RELOC), opcode::I::SLLI).into());
            block.push(I::new(32, Some(RELOC), Some(RELOC), opcode::I::SRLI).into());
        }

        block.extend(self.register_init());

        let jal_addr = base + INSTRUCTION_LEN * block.len() as u64;
        let ctxsv_base = jal_addr + INSTRUCTION_LEN;
        block.push(jal_to(jal_addr, ctxsv_base));

        tracing::debug!(base = format_args!("{base:#x}"), len = block.len(), "initial block");
        self.state.liveness.record_all(&block);
        self.state.push_block(base, block);

        ctxsv_base
    }

    /// Random values for every register but `x0` and `RELOC`, and zero for the scratch CSRs.
    fn register_init(&mut self) -> Vec<Instruction> {
        let mut init = Vec::new();

        if self.is_64bit() {
            // FP register writes trap while `mstatus.FS` is off.
            init.extend(li_fixed(TMP, MSTATUS_FS_INITIAL));
            init.push(csr_write(opcode::Csr::CSRRS, csr::MSTATUS, TMP));

            for idx in 0..32 {
                init.extend(li_fixed(TMP, self.state.rng.random()));
                init.push(
                    IntToF {
                        rd: Float::masked(idx),
                        rs1: Some(TMP),
                        rm: opcode::RoundingMode::RNE,
                        opcode: opcode::IntToF::FMV_D_X,
                    }
                    .into(),
                );
            }
        }

        for scratch in [csr::MSCRATCH, csr::SSCRATCH] {
            init.push(Csr::new(scratch, None, None, opcode::Csr::CSRRW).into());
        }

        for reg in DEST_REGS.into_iter().chain([TMP, ADDR]) {
            init.extend(li_fixed(reg, self.state.rng.random()));
        }

        init
    }

    /// Lays out the context setter; returns the base of the first fuzzed block.
    ///
    /// The `mtvec` value is patched in by [`Self::terminator`].
    fn context_setter(&mut self, base: u64) -> Result<u64, GenError> {
        let upperbound = self.config.ctxsv_size_upperbound.max(CTXSV_LEN * INSTRUCTION_LEN);
        let first_block = base + upperbound;

        self.state.ctxsv_bb_base_addr = base;
        self.state.ctxsv_size_upperbound = upperbound;

        let target = *[Privilege::Machine, Privilege::Supervisor, Privilege::User]
            .choose(&mut self.state.rng)
            .unwrap_or(&Privilege::Machine);

        let mut block: Vec<Instruction> = Vec::with_capacity(CTXSV_LEN as usize);

        // open all of memory to every privilege level.
        block.push(I::new(0xffff, None, Some(TMP), opcode::I::ADDI).into());
        block.push(csr_write(opcode::Csr::CSRRW, csr::PMPADDR0, TMP));
        block.push(I::new(PMP_ALL_RWX, None, Some(TMP), opcode::I::ADDI).into());
        block.push(csr_write(opcode::Csr::CSRRW, csr::PMPCFG0, TMP));

        block.extend(relocated(TMP, 0));
        block.push(csr_write(opcode::Csr::CSRRW, csr::MTVEC, TMP));

        block.extend(li_fixed(TMP, MSTATUS_FS_INITIAL));
        block.push(csr_write(opcode::Csr::CSRRS, csr::MSTATUS, TMP));

        block.extend(self.mpp_sequence(target));

        let mepc_at = base + INSTRUCTION_LEN * block.len() as u64;
        block.extend(relocated(TMP, offset_u32(self.state, mepc_at, first_block)?));
        block.push(csr_write(opcode::Csr::CSRRW, csr::MEPC, TMP));
        self.state.privilegestate.set_mepc();

        block.push(gen_priv_descent_instr(&mut self.state.privilegestate)?);

        invariant!(block.len() as u64 == CTXSV_LEN, "context setter has {} instructions", block.len());

        self.state.liveness.record_all(&block);

        tracing::debug!(
            base = format_args!("{base:#x}"),
            upperbound,
            privilege = %self.state.privilegestate.privstate,
            "context setter"
        );

        self.state.ctxsv_bb = block;

        Ok(first_block)
    }

    /// Sets `mstatus.MPP` to `target`.
    fn mpp_sequence(&mut self, target: Privilege) -> [Instruction; 6] {
        let [clear_hi, clear_lo] = li_fixed(TMP, MSTATUS_MPP_MASK);
        let [set_hi, set_lo] = li_fixed(TMP, u32::from(target.encoding()) << MSTATUS_MPP_SHIFT);

        self.state.privilegestate.set_mpp(target);

        [
            clear_hi,
            clear_lo,
            csr_write(opcode::Csr::CSRRC, csr::MSTATUS, TMP),
            set_hi,
            set_lo,
            csr_write(opcode::Csr::CSRRS, csr::MSTATUS, TMP),
        ]
    }

    /// Lays out one random block at `base`; returns the base of the block after it.
    fn fuzzed_block(&mut self, base: u64) -> Result<u64, GenError> {
        let bb = self.state.instr_objs_seq.len();
        let len = self.state.rng.random_range(self.config.block_len.clone());
        let gap = INSTRUCTION_LEN * self.state.rng.random_range(0..=self.config.max_gap) as u64;

        let mut block = Vec::with_capacity(len + 12);
        for _ in 0..len {
            self.body_instruction(bb, &mut block);
        }

        let body_end = block.len();

        let descend = self.state.privilegestate.privstate != Privilege::User
            && self.state.rng.random_bool(self.config.descent_probability);

        let successor = match descend {
            true => self.descent_ending(base, gap, &mut block)?,
            false => {
                let end_addr = base + INSTRUCTION_LEN * block.len() as u64;
                let successor = end_addr + INSTRUCTION_LEN + gap;

                let ending = match self.state.offset_of(successor) < 0x800
                    && self.state.rng.random_bool(0.5)
                {
                    true => Consumer { rd: None, rs1: Some(RELOC), imm: None }.into(),
                    false => jal_to(end_addr, successor),
                };

                block.push(ending);
                successor
            }
        };

        self.state.liveness.record_all(&block[body_end..]);

        tracing::debug!(
            bb,
            base = format_args!("{base:#x}"),
            len = block.len(),
            privilege = %self.state.privilegestate.privstate,
            "fuzzed block"
        );

        self.state.push_block(base, block);

        Ok(successor)
    }

    /// Ends `block` by returning to the next block in a lower (or equal) privilege level.
    fn descent_ending(
        &mut self,
        base: u64,
        gap: u64,
        block: &mut Vec<Instruction>,
    ) -> Result<u64, GenError> {
        let (epc, status_setup) = match self.state.privilegestate.privstate {
            Privilege::Machine => {
                let target = *[Privilege::Machine, Privilege::Supervisor, Privilege::User]
                    .choose(&mut self.state.rng)
                    .unwrap_or(&Privilege::User);

                (csr::MEPC, self.mpp_sequence(target).to_vec())
            }

            Privilege::Supervisor => {
                let (op, target) = match self.state.rng.random_bool(0.5) {
                    true => (opcode::Csr::CSRRS, Privilege::Supervisor),
                    false => (opcode::Csr::CSRRC, Privilege::User),
                };

                self.state.privilegestate.set_spp(target);

                let [hi, lo] = li_fixed(TMP, SSTATUS_SPP);
                (csr::SEPC, vec![hi, lo, csr_write(op, csr::SSTATUS, TMP)])
            }

            Privilege::User => {
                return Err(GenError::InvalidDescent {
                    from: Privilege::User,
                    reason: "user mode has no lower level",
                });
            }
        };

        block.extend(status_setup);

        let epc_idx = block.len();
        block.extend(relocated(TMP, 0));
        block.push(csr_write(opcode::Csr::CSRRW, epc, TMP));

        match epc {
            csr::MEPC => self.state.privilegestate.set_mepc(),
            _ => self.state.privilegestate.set_sepc(),
        }

        block.push(gen_priv_descent_instr(&mut self.state.privilegestate)?);

        let successor = base + INSTRUCTION_LEN * block.len() as u64 + gap;
        let epc_at = base + INSTRUCTION_LEN * epc_idx as u64;
        patch_li(block, epc_idx, offset_u32(self.state, epc_at, successor)?);

        Ok(successor)
    }

    /// Appends one random instruction, with its address setup for memory operations.
    /// Sources are drawn only from registers already written.
    fn body_instruction(&mut self, bb: usize, block: &mut Vec<Instruction>) {
        let is_64bit = self.is_64bit();
        let start = block.len();
        let live = Live::of(&self.state.liveness);
        let with_float = is_64bit && live.has_floats();
        let rng = &mut self.state.rng;

        let kind = match WeightedIndex::new(BodyKind::ALL.map(|kind| kind.weight(with_float))) {
            Ok(dist) => BodyKind::ALL[dist.sample(rng)],
            Err(_) => BodyKind::AluR,
        };

        let scratch = match self.state.privilegestate.privstate {
            Privilege::Machine => Some(csr::MSCRATCH),
            Privilege::Supervisor => Some(csr::SSCRATCH),
            Privilege::User => None,
        };

        let instruction: Instruction = match (kind, scratch) {
            (BodyKind::AluI, _) => {
                let ops: Vec<_> =
                    opcode::I::iter().filter(|op| is_64bit || !op.is_rv64_only()).collect();
                let op = *ops.choose(rng).unwrap_or(&opcode::I::ADDI);

                let imm = match op.max_shamt() {
                    Some(max) if is_64bit => rng.random_range(0..=max),
                    Some(max) => rng.random_range(0..=max.min(31)),
                    None => rng.random_range(-2048_i16..=2047) as u16,
                };

                I::new(imm, live.int(rng), Some(dest(rng)), op).into()
            }

            (BodyKind::Load | BodyKind::Store, _) => {
                let candidates = MemOp::candidates(kind == BodyKind::Load, is_64bit, with_float);
                let Some(&op) = candidates.choose(rng) else {
                    return;
                };

                self.pending.push(PendingMemOp {
                    bb,
                    idx: block.len(),
                    is_load: op.is_load(),
                    align_bits: op.align_bits(),
                });

                block.extend(relocated(ADDR, 0));
                op.instruction(rng, &live)
            }

            (BodyKind::Csr, Some(scratch)) => match rng.random_bool(0.5) {
                true => {
                    let op = *[opcode::Csr::CSRRW, opcode::Csr::CSRRS, opcode::Csr::CSRRC]
                        .choose(rng)
                        .unwrap_or(&opcode::Csr::CSRRW);

                    Csr::new(scratch, live.int(rng), Some(dest(rng)), op).into()
                }

                false => {
                    let opcode = *[opcode::CsrI::CSRRWI, opcode::CsrI::CSRRSI, opcode::CsrI::CSRRCI]
                        .choose(rng)
                        .unwrap_or(&opcode::CsrI::CSRRWI);

                    let uimm = rng.random_range(0..32);
                    CsrI { csr: scratch, uimm, rd: Some(dest(rng)), opcode }.into()
                }
            },

            (BodyKind::Branch, _) => {
                let ops: Vec<_> = opcode::B::iter().collect();
                let op = *ops.choose(rng).unwrap_or(&opcode::B::BEQ);

                // both outcomes fall through to the next instruction.
                Branch::new(4, live.int(rng), live.int(rng), op).into()
            }

            (BodyKind::Float, _) => float_conversion(rng, &live),

            (BodyKind::AluR | BodyKind::Csr, _) => {
                let ops: Vec<_> =
                    opcode::R::iter().filter(|op| is_64bit || !op.is_rv64_only()).collect();
                let op = *ops.choose(rng).unwrap_or(&opcode::R::ADD);

                R::new(live.int(rng), live.int(rng), Some(dest(rng)), op).into()
            }
        };

        block.push(instruction);
        self.state.liveness.record_all(&block[start..]);
    }

    /// Places the terminator at `base` and points `mtvec` at it.
    fn terminator(&mut self, base: u64) -> Result<(), GenError> {
        let jal_addr = base + INSTRUCTION_LEN;

        self.state.final_bb_base_addr = base;
        self.state.final_bb = vec![I::nop().into(), jal_to(jal_addr, jal_addr)];

        // the `relocated` pair installing mtvec follows the four PMP instructions.
        let mtvec_idx = 4;
        let mtvec_at = self.state.ctxsv_bb_base_addr + INSTRUCTION_LEN * mtvec_idx as u64;
        let value = offset_u32(self.state, mtvec_at, base)?;
        patch_li(&mut self.state.ctxsv_bb, mtvec_idx, value);

        tracing::debug!(base = format_args!("{base:#x}"), "terminator");

        Ok(())
    }

    /// Blacklists the finished layout, then picks every memory operation's target.
    fn place_memops(&mut self) -> Result<(), GenError> {
        let code_end = self.state.used_len();
        let data_lo = code_end.next_multiple_of(8);

        if data_lo + 8 >= self.state.memsize {
            return Err(GenError::LayoutOverflow { needed: data_lo + 16, memsize: self.state.memsize });
        }

        blacklist::blacklist_all(self.state);

        for op in std::mem::take(&mut self.pending) {
            let addr = match pick_memop_addr(self.state, op.is_load, op.align_bits) {
                Ok(addr) => addr,

                // the first store opens a fresh slot past the code.
                Err(GenError::NoAddressAvailable { is_load: false, .. }) => {
                    let state = &mut *self.state;
                    let slot = state.memview_blacklist.random_free(
                        &mut state.rng,
                        3,
                        8,
                        data_lo,
                        state.memsize - 1,
                    )?;

                    state.memstorestate.record_store(slot, 3);
                    pick_memop_addr(state, false, op.align_bits)?
                }

                Err(e) => return Err(e),
            };

            let at = self.state.instr_addr(op.bb, op.idx);
            let value = u32::try_from(addr)
                .map_err(|_| GenError::ResolutionOutOfRange { addr: at, value: addr })?;

            patch_li(&mut self.state.instr_objs_seq[op.bb], op.idx, value);
        }

        Ok(())
    }
}

fn float_conversion<G: Rng + ?Sized>(rng: &mut G, live: &Live) -> Instruction {
    let rm = |has_rounding_mode| match has_rounding_mode {
        true => opcode::RoundingMode::DYN,
        false => opcode::RoundingMode::RNE,
    };

    match rng.random_bool(0.5) {
        true => {
            let ops: Vec<_> = opcode::FToInt::iter().collect();
            let opcode = *ops.choose(rng).unwrap_or(&opcode::FToInt::FMV_X_D);

            let rm = rm(opcode.has_rounding_mode());
            FToInt { rd: Some(dest(rng)), rs1: live.float(rng), rm, opcode }.into()
        }

        false => {
            let ops: Vec<_> = opcode::IntToF::iter().collect();
            let opcode = *ops.choose(rng).unwrap_or(&opcode::IntToF::FMV_D_X);

            let rm = rm(opcode.has_rounding_mode());
            IntToF { rd: float(rng), rs1: live.int(rng), rm, opcode }.into()
        }
    }
}
