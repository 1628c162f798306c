// these opcode names are _exact_, and naming rules don't apply to them
#![allow(non_camel_case_types)]

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Register-register operations, including the M extension and the RV64 `*W` forms.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum R {
    ADD,
    SUB,
    SLL,
    SLT,
    SLTU,
    XOR,
    SRL,
    SRA,
    OR,
    AND,
    MUL,
    MULH,
    MULHSU,
    MULHU,
    DIV,
    DIVU,
    REM,
    REMU,
    ADDW,
    SUBW,
    SLLW,
    SRLW,
    SRAW,
    MULW,
    DIVW,
    DIVUW,
    REMW,
    REMUW,
}

impl R {
    #[must_use]
    pub const fn is_m_extension(self) -> bool {
        matches!(
            self,
            Self::MUL
                | Self::MULH
                | Self::MULHSU
                | Self::MULHU
                | Self::DIV
                | Self::DIVU
                | Self::REM
                | Self::REMU
                | Self::MULW
                | Self::DIVW
                | Self::DIVUW
                | Self::REMW
                | Self::REMUW,
        )
    }

    #[must_use]
    pub const fn is_rv64_only(self) -> bool {
        matches!(
            self,
            Self::ADDW
                | Self::SUBW
                | Self::SLLW
                | Self::SRLW
                | Self::SRAW
                | Self::MULW
                | Self::DIVW
                | Self::DIVUW
                | Self::REMW
                | Self::REMUW
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Register-immediate operations.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum I {
    ADDI,
    SLTI,
    SLTIU,
    XORI,
    ORI,
    ANDI,
    SLLI,
    SRLI,
    SRAI,
    ADDIW,
    SLLIW,
    SRLIW,
    SRAIW,
}

impl I {
    /// The largest shift amount accepted, if this is a shift.
    #[must_use]
    pub const fn max_shamt(self) -> Option<u16> {
        match self {
            Self::SLLI | Self::SRLI | Self::SRAI => Some(63),
            Self::SLLIW | Self::SRLIW | Self::SRAIW => Some(31),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_rv64_only(self) -> bool {
        matches!(self, Self::ADDIW | Self::SLLIW | Self::SRLIW | Self::SRAIW)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Load {
    LB,
    LH,
    LW,
    LD,
    LBU,
    LHU,
    LWU,
}

impl Load {
    #[must_use]
    pub const fn alignment_bits(self) -> u8 {
        match self {
            Self::LB | Self::LBU => 0,
            Self::LH | Self::LHU => 1,
            Self::LW | Self::LWU => 2,
            Self::LD => 3,
        }
    }

    #[must_use]
    pub const fn is_rv64_only(self) -> bool {
        matches!(self, Self::LD | Self::LWU)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FLoad {
    FLW,
    FLD,
}

impl FLoad {
    #[must_use]
    pub const fn alignment_bits(self) -> u8 {
        match self {
            Self::FLW => 2,
            Self::FLD => 3,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Store {
    SB,
    SH,
    SW,
    SD,
}

impl Store {
    #[must_use]
    pub const fn alignment_bits(self) -> u8 {
        match self {
            Self::SB => 0,
            Self::SH => 1,
            Self::SW => 2,
            Self::SD => 3,
        }
    }

    #[must_use]
    pub const fn is_rv64_only(self) -> bool {
        matches!(self, Self::SD)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FStore {
    FSW,
    FSD,
}

impl FStore {
    #[must_use]
    pub const fn alignment_bits(self) -> u8 {
        match self {
            Self::FSW => 2,
            Self::FSD => 3,
        }
    }
}

/// Float source, integer destination.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
pub enum FToInt {
    #[strum(to_string = "fcvt.l.s")]
    FCVT_L_S,
    #[strum(to_string = "fcvt.lu.s")]
    FCVT_LU_S,
    #[strum(to_string = "fcvt.l.d")]
    FCVT_L_D,
    #[strum(to_string = "fcvt.lu.d")]
    FCVT_LU_D,
    #[strum(to_string = "fmv.x.d")]
    FMV_X_D,
}

impl FToInt {
    /// `fmv` is a bit move and has no rounding mode field.
    #[must_use]
    pub const fn has_rounding_mode(self) -> bool {
        !matches!(self, Self::FMV_X_D)
    }
}

/// Integer source, float destination.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
pub enum IntToF {
    #[strum(to_string = "fcvt.s.l")]
    FCVT_S_L,
    #[strum(to_string = "fcvt.s.lu")]
    FCVT_S_LU,
    #[strum(to_string = "fcvt.d.l")]
    FCVT_D_L,
    #[strum(to_string = "fcvt.d.lu")]
    FCVT_D_LU,
    #[strum(to_string = "fmv.d.x")]
    FMV_D_X,
}

impl IntToF {
    #[must_use]
    pub const fn has_rounding_mode(self) -> bool {
        !matches!(self, Self::FMV_D_X)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum RoundingMode {
    RNE = 0b000,
    RTZ = 0b001,
    RDN = 0b010,
    RUP = 0b011,
    RMM = 0b100,
    DYN = 0b111,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Csr {
    CSRRW,
    CSRRS,
    CSRRC,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CsrI {
    CSRRWI,
    CSRRSI,
    CSRRCI,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum U {
    LUI,
    AUIPC,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum J {
    JAL,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum IJump {
    JALR,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum B {
    BEQ,
    BNE,
    BLT,
    BGE,
    BLTU,
    BGEU,
}

/// Instructions with no operands, so a single fixed encoding each.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
pub enum Sys {
    #[strum(to_string = "ecall")]
    ECALL,
    #[strum(to_string = "ebreak")]
    EBREAK,
    #[strum(to_string = "mret")]
    MRET,
    #[strum(to_string = "sret")]
    SRET,
    #[strum(to_string = "wfi")]
    WFI,
    #[strum(to_string = "fence.i")]
    FENCE_I,
    #[strum(to_string = "sfence.w.inval")]
    SFENCE_W_INVAL,
    #[strum(to_string = "sfence.inval.ir")]
    SFENCE_INVAL_IR,
}

/// Address-translation fences taking `rs1, rs2`.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
pub enum Vma {
    #[strum(to_string = "sfence.vma")]
    SFENCE_VMA,
    #[strum(to_string = "sinval.vma")]
    SINVAL_VMA,
}
