#![forbid(unsafe_code)]
#![warn(clippy::must_use_candidate)]

use rvdiff_core::instruction::{self, Instruction};
use rvdiff_core::{Mnemonic, opcode, register};


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("immediate {imm:#x} does not fit `{mnemonic}`")]
    ImmediateOutOfRange { mnemonic: Mnemonic, imm: u32 },
}

const OP: u8 = 0b011_0011;
const OP_32: u8 = 0b011_1011;
const OP_IMM: u8 = 0b001_0011;
const OP_IMM_32: u8 = 0b001_1011;
const LOAD: u8 = 0b000_0011;
const LOAD_FP: u8 = 0b000_0111;
const STORE: u8 = 0b010_0011;
const STORE_FP: u8 = 0b010_0111;
const OP_FP: u8 = 0b101_0011;
const SYSTEM: u8 = 0b111_0011;
const MISC_MEM: u8 = 0b000_1111;
const BRANCH: u8 = 0b110_0011;
const JALR: u8 = 0b110_0111;
const JAL: u8 = 0b110_1111;
const LUI: u8 = 0b011_0111;
const AUIPC: u8 = 0b001_0111;

#[inline]
const fn reg(register: Option<register::RiscV>) -> u8 {
    register::index(register)
}

/// Whether `imm` survives truncation to `BITS` bits followed by sign extension.
#[inline]
const fn fits_signed<const BITS: u32>(imm: u32) -> bool {
    let shift = u32::BITS - BITS;
    ((imm << shift).cast_signed() >> shift).cast_unsigned() == imm
}

#[inline]
const fn fits_signed_16<const BITS: u32>(imm: u16) -> bool {
    let shift = u16::BITS - BITS;
    ((imm << shift).cast_signed() >> shift).cast_unsigned() == imm
}

/// `funct7[31:25] rs2[24:20] rs1[19:15] funct3[14:12] rd[11:7] opcode[6:0]`
#[must_use]
pub const fn r(opcode: u8, rd: u8, funct3: u8, rs1: u8, rs2: u8, funct7: u8) -> u32 {
    ((funct7 as u32 & 0b111_1111) << 25)
        | ((rs2 as u32 & 0b1_1111) << 20)
        | ((rs1 as u32 & 0b1_1111) << 15)
        | ((funct3 as u32 & 0b111) << 12)
        | ((rd as u32 & 0b1_1111) << 7)
        | (opcode as u32 & 0b111_1111)
}

/// `imm12` is truncated to its low 12 bits.
#[must_use]
pub const fn i(opcode: u8, rd: u8, funct3: u8, rs1: u8, imm12: u16) -> u32 {
    ((imm12 as u32 & 0xfff) << 20)
        | ((rs1 as u32 & 0b1_1111) << 15)
        | ((funct3 as u32 & 0b111) << 12)
        | ((rd as u32 & 0b1_1111) << 7)
        | (opcode as u32 & 0b111_1111)
}

/// `imm12` is split into `imm[11:5]` at bit 25 and `imm[4:0]` at bit 7.
#[must_use]
pub const fn s(opcode: u8, funct3: u8, rs1: u8, rs2: u8, imm12: u16) -> u32 {
    let imm = imm12 as u32 & 0xfff;

    ((imm & !0b1_1111) << 20)
        | ((rs2 as u32 & 0b1_1111) << 20)
        | ((rs1 as u32 & 0b1_1111) << 15)
        | ((funct3 as u32 & 0b111) << 12)
        | ((imm & 0b1_1111) << 7)
        | (opcode as u32 & 0b111_1111)
}

/// `imm13` is the byte offset, bit 0 is dropped.
#[must_use]
pub const fn b(opcode: u8, funct3: u8, rs1: u8, rs2: u8, imm13: u16) -> u32 {
    let imm = imm13 as u32;

    let imm = ((imm & 0b0001_0000_0000_0000) << 19)
        | ((imm & 0b0000_0111_1110_0000) << 20)
        | ((imm & 0b0000_1000_0000_0000) >> 4)
        | ((imm & 0b0000_0000_0001_1110) << 7);

    imm | ((rs2 as u32 & 0b1_1111) << 20)
        | ((rs1 as u32 & 0b1_1111) << 15)
        | ((funct3 as u32 & 0b111) << 12)
        | (opcode as u32 & 0b111_1111)
}

/// `imm` is the already-shifted upper 20 bits.
#[must_use]
pub const fn u(opcode: u8, rd: u8, imm: u32) -> u32 {
    (imm & 0xffff_f000) | ((rd as u32 & 0b1_1111) << 7) | (opcode as u32 & 0b111_1111)
}

/// `imm21` is the byte offset, bit 0 is dropped.
#[must_use]
pub const fn j(opcode: u8, rd: u8, imm21: u32) -> u32 {
    // 000a_dddd_dddd_cbbb_bbbb_bbb0 -> abbb_bbbb_bbbc_dddd_dddd_xxxx_xxxx_xxxx
    let imm = ((imm21 & 0b0001_0000_0000_0000_0000_0000) << 11)
        | ((imm21 & 0b0000_0000_0000_0111_1111_1110) << 20)
        | ((imm21 & 0b0000_0000_0000_1000_0000_0000) << 9)
        | (imm21 & 0b0000_1111_1111_0000_0000_0000);

    imm | ((rd as u32 & 0b1_1111) << 7) | (opcode as u32 & 0b111_1111)
}

struct Checker {
    mnemonic: Mnemonic,
}

impl Checker {
    fn signed12(&self, imm: u16) -> Result<u16, EncodeError> {
        match fits_signed_16::<12>(imm) {
            true => Ok(imm),
            false => Err(self.out_of_range(u32::from(imm))),
        }
    }

    fn at_most(&self, imm: u16, max: u16) -> Result<u16, EncodeError> {
        match imm <= max {
            true => Ok(imm),
            false => Err(self.out_of_range(u32::from(imm))),
        }
    }

    fn branch_offset(&self, imm: u16) -> Result<u16, EncodeError> {
        match fits_signed_16::<13>(imm) && imm & 1 == 0 {
            true => Ok(imm),
            false => Err(self.out_of_range(u32::from(imm))),
        }
    }

    fn jump_offset(&self, imm: u32) -> Result<u32, EncodeError> {
        match fits_signed::<21>(imm) && imm & 1 == 0 {
            true => Ok(imm),
            false => Err(self.out_of_range(imm)),
        }
    }

    fn upper(&self, imm: u32) -> Result<u32, EncodeError> {
        match imm & 0xffff_f000 == imm {
            true => Ok(imm),
            false => Err(self.out_of_range(imm)),
        }
    }

    const fn out_of_range(&self, imm: u32) -> EncodeError {
        EncodeError::ImmediateOutOfRange { mnemonic: self.mnemonic, imm }
    }
}

const fn r_fields(op: opcode::R) -> (u8, u8, u8) {
    use opcode::R;

    match op {
        R::ADD => (OP, 0b000, 0b000_0000),
        R::SUB => (OP, 0b000, 0b010_0000),
        R::SLL => (OP, 0b001, 0b000_0000),
        R::SLT => (OP, 0b010, 0b000_0000),
        R::SLTU => (OP, 0b011, 0b000_0000),
        R::XOR => (OP, 0b100, 0b000_0000),
        R::SRL => (OP, 0b101, 0b000_0000),
        R::SRA => (OP, 0b101, 0b010_0000),
        R::OR => (OP, 0b110, 0b000_0000),
        R::AND => (OP, 0b111, 0b000_0000),
        R::MUL => (OP, 0b000, 0b000_0001),
        R::MULH => (OP, 0b001, 0b000_0001),
        R::MULHSU => (OP, 0b010, 0b000_0001),
        R::MULHU => (OP, 0b011, 0b000_0001),
        R::DIV => (OP, 0b100, 0b000_0001),
        R::DIVU => (OP, 0b101, 0b000_0001),
        R::REM => (OP, 0b110, 0b000_0001),
        R::REMU => (OP, 0b111, 0b000_0001),
        R::ADDW => (OP_32, 0b000, 0b000_0000),
        R::SUBW => (OP_32, 0b000, 0b010_0000),
        R::SLLW => (OP_32, 0b001, 0b000_0000),
        R::SRLW => (OP_32, 0b101, 0b000_0000),
        R::SRAW => (OP_32, 0b101, 0b010_0000),
        R::MULW => (OP_32, 0b000, 0b000_0001),
        R::DIVW => (OP_32, 0b100, 0b000_0001),
        R::DIVUW => (OP_32, 0b101, 0b000_0001),
        R::REMW => (OP_32, 0b110, 0b000_0001),
        R::REMUW => (OP_32, 0b111, 0b000_0001),
    }
}

const fn i_fields(op: opcode::I) -> (u8, u8) {
    use opcode::I;

    match op {
        I::ADDI => (OP_IMM, 0b000),
        I::SLTI => (OP_IMM, 0b010),
        I::SLTIU => (OP_IMM, 0b011),
        I::XORI => (OP_IMM, 0b100),
        I::ORI => (OP_IMM, 0b110),
        I::ANDI => (OP_IMM, 0b111),
        I::SLLI => (OP_IMM, 0b001),
        I::SRLI | I::SRAI => (OP_IMM, 0b101),
        I::ADDIW => (OP_IMM_32, 0b000),
        I::SLLIW => (OP_IMM_32, 0b001),
        I::SRLIW | I::SRAIW => (OP_IMM_32, 0b101),
    }
}

const fn load_funct3(op: opcode::Load) -> u8 {
    use opcode::Load;

    match op {
        Load::LB => 0b000,
        Load::LH => 0b001,
        Load::LW => 0b010,
        Load::LD => 0b011,
        Load::LBU => 0b100,
        Load::LHU => 0b101,
        Load::LWU => 0b110,
    }
}

const fn f_to_int_fields(op: opcode::FToInt) -> (u8, u8) {
    use opcode::FToInt;

    // (funct7, rs2)
    match op {
        FToInt::FCVT_L_S => (0b110_0000, 0b00010),
        FToInt::FCVT_LU_S => (0b110_0000, 0b00011),
        FToInt::FCVT_L_D => (0b110_0001, 0b00010),
        FToInt::FCVT_LU_D => (0b110_0001, 0b00011),
        FToInt::FMV_X_D => (0b111_0001, 0b00000),
    }
}

const fn int_to_f_fields(op: opcode::IntToF) -> (u8, u8) {
    use opcode::IntToF;

    match op {
        IntToF::FCVT_S_L => (0b110_1000, 0b00010),
        IntToF::FCVT_S_LU => (0b110_1000, 0b00011),
        IntToF::FCVT_D_L => (0b110_1001, 0b00010),
        IntToF::FCVT_D_LU => (0b110_1001, 0b00011),
        IntToF::FMV_D_X => (0b111_1001, 0b00000),
    }
}

const fn branch_funct3(op: opcode::B) -> u8 {
    use opcode::B;

    match op {
        B::BEQ => 0b000,
        B::BNE => 0b001,
        B::BLT => 0b100,
        B::BGE => 0b101,
        B::BLTU => 0b110,
        B::BGEU => 0b111,
    }
}

/// Encoding of the operand-less instructions.
#[must_use]
pub const fn sys(op: opcode::Sys) -> u32 {
    use opcode::Sys;

    match op {
        Sys::ECALL => i(SYSTEM, 0, 0b000, 0, 0b0000_0000_0000),
        Sys::EBREAK => i(SYSTEM, 0, 0b000, 0, 0b0000_0000_0001),
        Sys::MRET => r(SYSTEM, 0, 0b000, 0, 0b00010, 0b001_1000),
        Sys::SRET => r(SYSTEM, 0, 0b000, 0, 0b00010, 0b000_1000),
        Sys::WFI => r(SYSTEM, 0, 0b000, 0, 0b00101, 0b000_1000),
        Sys::FENCE_I => i(MISC_MEM, 0, 0b001, 0, 0),
        Sys::SFENCE_W_INVAL => r(SYSTEM, 0, 0b000, 0, 0b00000, 0b000_1100),
        Sys::SFENCE_INVAL_IR => r(SYSTEM, 0, 0b000, 0, 0b00001, 0b000_1100),
    }
}

/// Encodes a single instruction into its 32-bit word.
///
/// Placeholders that haven't been resolved encode with a zero immediate.
///
/// # Errors
/// Fails if an immediate doesn't fit its field.
pub fn instruction(instruction: &Instruction) -> Result<u32, EncodeError> {
    let check = Checker { mnemonic: instruction.mnemonic() };

    match instruction {
        Instruction::R(instruction::R { rs1, rs2, rd, opcode }) => {
            let (opcode, funct3, funct7) = r_fields(*opcode);
            Ok(r(opcode, reg(*rd), funct3, reg(*rs1), reg(*rs2), funct7))
        }

        Instruction::I(instruction::I { imm, rs1, rd, opcode }) => {
            let imm = match (opcode, opcode.max_shamt()) {
                (opcode::I::SRAI | opcode::I::SRAIW, Some(max)) => {
                    0b0100_0000_0000 | check.at_most(*imm, max)?
                }
                (_, Some(max)) => check.at_most(*imm, max)?,
                (_, None) => check.signed12(*imm)?,
            };

            let (opcode, funct3) = i_fields(*opcode);
            Ok(i(opcode, reg(*rd), funct3, reg(*rs1), imm))
        }

        Instruction::Load(instruction::Load { imm, rs1, rd, opcode }) => {
            let imm = check.signed12(*imm)?;
            Ok(i(LOAD, reg(*rd), load_funct3(*opcode), reg(*rs1), imm))
        }

        Instruction::FLoad(instruction::FLoad { imm, rs1, rd, opcode }) => {
            let imm = check.signed12(*imm)?;
            // funct3 is the access width: 0b010 for words, 0b011 for doubles.
            Ok(i(LOAD_FP, rd.get(), opcode.alignment_bits(), reg(*rs1), imm))
        }

        Instruction::Store(instruction::Store { imm, rs1, rs2, opcode }) => {
            let imm = check.signed12(*imm)?;
            Ok(s(STORE, opcode.alignment_bits(), reg(*rs1), reg(*rs2), imm))
        }

        Instruction::FStore(instruction::FStore { imm, rs1, rs2, opcode }) => {
            let imm = check.signed12(*imm)?;
            Ok(s(STORE_FP, opcode.alignment_bits(), reg(*rs1), rs2.get(), imm))
        }

        Instruction::FToInt(instruction::FToInt { rd, rs1, rm, opcode }) => {
            let (funct7, rs2) = f_to_int_fields(*opcode);
            let rm = match opcode.has_rounding_mode() {
                true => *rm as u8,
                false => 0b000,
            };

            Ok(r(OP_FP, reg(*rd), rm, rs1.get(), rs2, funct7))
        }

        Instruction::IntToF(instruction::IntToF { rd, rs1, rm, opcode }) => {
            let (funct7, rs2) = int_to_f_fields(*opcode);
            let rm = match opcode.has_rounding_mode() {
                true => *rm as u8,
                false => 0b000,
            };

            Ok(r(OP_FP, rd.get(), rm, reg(*rs1), rs2, funct7))
        }

        Instruction::Csr(instruction::Csr { csr, rs1, rd, opcode }) => {
            let csr = check.at_most(*csr, 0xfff)?;
            let funct3 = match opcode {
                opcode::Csr::CSRRW => 0b001,
                opcode::Csr::CSRRS => 0b010,
                opcode::Csr::CSRRC => 0b011,
            };

            Ok(i(SYSTEM, reg(*rd), funct3, reg(*rs1), csr))
        }

        Instruction::CsrI(instruction::CsrI { csr, uimm, rd, opcode }) => {
            let csr = check.at_most(*csr, 0xfff)?;
            let uimm = check.at_most(u16::from(*uimm), 0b1_1111)?;
            let funct3 = match opcode {
                opcode::CsrI::CSRRWI => 0b101,
                opcode::CsrI::CSRRSI => 0b110,
                opcode::CsrI::CSRRCI => 0b111,
            };

            Ok(i(SYSTEM, reg(*rd), funct3, uimm as u8, csr))
        }

        Instruction::U(instruction::U { imm, rd, opcode }) => {
            let opcode = match opcode {
                opcode::U::LUI => LUI,
                opcode::U::AUIPC => AUIPC,
            };

            Ok(u(opcode, reg(*rd), check.upper(*imm)?))
        }

        Instruction::J(instruction::J { imm, rd, opcode: opcode::J::JAL }) => {
            Ok(j(JAL, reg(*rd), check.jump_offset(*imm)?))
        }

        Instruction::IJump(instruction::IJump { imm, rs1, rd, opcode: opcode::IJump::JALR }) => {
            Ok(i(JALR, reg(*rd), 0b000, reg(*rs1), check.signed12(*imm)?))
        }

        Instruction::Branch(instruction::Branch { rs1, rs2, imm, opcode }) => {
            let imm = check.branch_offset(*imm)?;
            Ok(b(BRANCH, branch_funct3(*opcode), reg(*rs1), reg(*rs2), imm))
        }

        Instruction::Sys(instruction::Sys { opcode }) => Ok(sys(*opcode)),

        Instruction::Vma(instruction::Vma { rs1, rs2, opcode }) => {
            let funct7 = match opcode {
                opcode::Vma::SFENCE_VMA => 0b000_1001,
                opcode::Vma::SINVAL_VMA => 0b000_1011,
            };

            Ok(r(SYSTEM, 0, 0b000, reg(*rs1), reg(*rs2), funct7))
        }

        Instruction::PlaceholderProducer0(instruction::Producer0 { rd, imm }) => {
            Ok(u(LUI, reg(*rd), check.upper(imm.unwrap_or(0))?))
        }

        Instruction::PlaceholderProducer1(instruction::Producer1 { rd, imm }) => {
            let imm = check.signed12(imm.unwrap_or(0))?;
            Ok(i(OP_IMM, reg(*rd), 0b000, reg(*rd), imm))
        }

        Instruction::PlaceholderConsumer(instruction::Consumer { rd, rs1, imm }) => {
            let imm = check.signed12(imm.unwrap_or(0))?;
            Ok(i(JALR, reg(*rd), 0b000, reg(*rs1), imm))
        }
    }
}

/// Encodes `instructions` back to back as little-endian words into `out`.
///
/// # Errors
/// Fails on the first instruction that can't be encoded, reporting its index.
pub fn block_into(instructions: &[Instruction], out: &mut [u8]) -> Result<(), (usize, EncodeError)> {
    debug_assert!(out.len() >= instructions.len() * 4);

    for (idx, (it, chunk)) in instructions.iter().zip(out.chunks_exact_mut(4)).enumerate() {
        let word = instruction(it).map_err(|e| (idx, e))?;
        chunk.copy_from_slice(&word.to_le_bytes());
    }

    Ok(())
}
