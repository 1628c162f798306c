use crate::mnemonic::Mnemonic;
use crate::opcode;
use crate::register::{Float, RiscV as RiscVRegister};

/// A generated instruction.
///
/// The set is closed: anything the generator can emit is one of these variants,
/// and every variant knows how to describe its own mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    R(R),
    I(I),
    Load(Load),
    FLoad(FLoad),
    Store(Store),
    FStore(FStore),
    FToInt(FToInt),
    IntToF(IntToF),
    Csr(Csr),
    CsrI(CsrI),
    U(U),
    J(J),
    IJump(IJump),
    Branch(Branch),
    Sys(Sys),
    Vma(Vma),
    PlaceholderProducer0(Producer0),
    PlaceholderProducer1(Producer1),
    PlaceholderConsumer(Consumer),
}

impl Instruction {
    /// Whether the encoded bytes of this instruction may differ between the
    /// golden-model run and the replay on the design under test.
    #[must_use]
    pub const fn is_resolution_dependent(&self) -> bool {
        matches!(
            self,
            Self::Branch(_)
                | Self::PlaceholderProducer0(_)
                | Self::PlaceholderProducer1(_)
                | Self::PlaceholderConsumer(_)
        )
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(
            self,
            Self::PlaceholderProducer0(_)
                | Self::PlaceholderProducer1(_)
                | Self::PlaceholderConsumer(_)
        )
    }

    #[must_use]
    pub const fn mnemonic(&self) -> Mnemonic {
        match self {
            Self::R(it) => Mnemonic::R(it.opcode),
            Self::I(it) => Mnemonic::I(it.opcode),
            Self::Load(it) => Mnemonic::Load(it.opcode),
            Self::FLoad(it) => Mnemonic::FLoad(it.opcode),
            Self::Store(it) => Mnemonic::Store(it.opcode),
            Self::FStore(it) => Mnemonic::FStore(it.opcode),
            Self::FToInt(it) => Mnemonic::FToInt(it.opcode),
            Self::IntToF(it) => Mnemonic::IntToF(it.opcode),
            Self::Csr(it) => Mnemonic::Csr(it.opcode),
            Self::CsrI(it) => Mnemonic::CsrI(it.opcode),
            Self::U(it) => Mnemonic::U(it.opcode),
            Self::J(it) => Mnemonic::J(it.opcode),
            Self::IJump(it) => Mnemonic::IJump(it.opcode),
            Self::Branch(it) => Mnemonic::B(it.opcode),
            Self::Sys(it) => Mnemonic::Sys(it.opcode),
            Self::Vma(it) => Mnemonic::Vma(it.opcode),
            Self::PlaceholderProducer0(_) => Mnemonic::U(opcode::U::LUI),
            Self::PlaceholderProducer1(_) => Mnemonic::I(opcode::I::ADDI),
            Self::PlaceholderConsumer(_) => Mnemonic::IJump(opcode::IJump::JALR),
        }
    }

    /// Whether this instruction only exists on RV64.
    #[must_use]
    pub const fn is_rv64_only(&self) -> bool {
        match self {
            Self::R(it) => it.opcode.is_rv64_only(),
            Self::I(it) => it.opcode.is_rv64_only(),
            Self::Load(it) => it.opcode.is_rv64_only(),
            Self::Store(it) => it.opcode.is_rv64_only(),
            Self::FToInt(_) | Self::IntToF(_) => true,
            _ => false,
        }
    }

    /// Integer registers read, `None` for `x0` or an unused slot.
    #[must_use]
    pub const fn int_sources(&self) -> [Option<RiscVRegister>; 2] {
        match self {
            Self::R(R { rs1, rs2, .. })
            | Self::Store(Store { rs1, rs2, .. })
            | Self::Branch(Branch { rs1, rs2, .. })
            | Self::Vma(Vma { rs1, rs2, .. }) => [*rs1, *rs2],

            Self::I(I { rs1, .. })
            | Self::Load(Load { rs1, .. })
            | Self::FLoad(FLoad { rs1, .. })
            | Self::FStore(FStore { rs1, .. })
            | Self::IntToF(IntToF { rs1, .. })
            | Self::Csr(Csr { rs1, .. })
            | Self::IJump(IJump { rs1, .. })
            | Self::PlaceholderConsumer(Consumer { rs1, .. }) => [*rs1, None],

            // `addi rd, rd, imm`
            Self::PlaceholderProducer1(Producer1 { rd, .. }) => [*rd, None],

            Self::FToInt(_)
            | Self::CsrI(_)
            | Self::U(_)
            | Self::J(_)
            | Self::Sys(_)
            | Self::PlaceholderProducer0(_) => [None, None],
        }
    }

    /// Integer register written, `None` for `x0` or no destination.
    #[must_use]
    pub const fn int_dest(&self) -> Option<RiscVRegister> {
        match self {
            Self::R(R { rd, .. })
            | Self::I(I { rd, .. })
            | Self::Load(Load { rd, .. })
            | Self::FToInt(FToInt { rd, .. })
            | Self::Csr(Csr { rd, .. })
            | Self::CsrI(CsrI { rd, .. })
            | Self::U(U { rd, .. })
            | Self::J(J { rd, .. })
            | Self::IJump(IJump { rd, .. })
            | Self::PlaceholderProducer0(Producer0 { rd, .. })
            | Self::PlaceholderProducer1(Producer1 { rd, .. })
            | Self::PlaceholderConsumer(Consumer { rd, .. }) => *rd,

            Self::FLoad(_)
            | Self::Store(_)
            | Self::FStore(_)
            | Self::IntToF(_)
            | Self::Branch(_)
            | Self::Sys(_)
            | Self::Vma(_) => None,
        }
    }

    #[must_use]
    pub const fn float_source(&self) -> Option<Float> {
        match self {
            Self::FStore(it) => Some(it.rs2),
            Self::FToInt(it) => Some(it.rs1),
            _ => None,
        }
    }

    #[must_use]
    pub const fn float_dest(&self) -> Option<Float> {
        match self {
            Self::FLoad(it) => Some(it.rd),
            Self::IntToF(it) => Some(it.rd),
            _ => None,
        }
    }
}

macro_rules! from_variant {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Instruction {
                #[inline(always)]
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

from_variant! {
    R => R,
    I => I,
    Load => Load,
    FLoad => FLoad,
    Store => Store,
    FStore => FStore,
    FToInt => FToInt,
    IntToF => IntToF,
    Csr => Csr,
    CsrI => CsrI,
    U => U,
    J => J,
    IJump => IJump,
    Branch => Branch,
    Sys => Sys,
    Vma => Vma,
    Producer0 => PlaceholderProducer0,
    Producer1 => PlaceholderProducer1,
    Consumer => PlaceholderConsumer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct R {
    pub rs1: Option<RiscVRegister>,
    pub rs2: Option<RiscVRegister>,
    pub rd: Option<RiscVRegister>,
    pub opcode: opcode::R,
}

impl R {
    #[must_use]
    #[inline(always)]
    pub const fn new(
        rs1: Option<RiscVRegister>,
        rs2: Option<RiscVRegister>,
        rd: Option<RiscVRegister>,
        opcode: opcode::R,
    ) -> Self {
        Self { rs1, rs2, rd, opcode }
    }
}

/// `imm` holds the 12-bit immediate as a sign-extended 16-bit pattern,
/// or the shift amount for shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I {
    pub imm: u16,
    pub rs1: Option<RiscVRegister>,
    pub rd: Option<RiscVRegister>,
    pub opcode: opcode::I,
}

impl I {
    #[must_use]
    #[inline(always)]
    pub const fn new(
        imm: u16,
        rs1: Option<RiscVRegister>,
        rd: Option<RiscVRegister>,
        opcode: opcode::I,
    ) -> Self {
        Self { imm, rs1, rd, opcode }
    }

    #[must_use]
    pub const fn nop() -> Self {
        Self::new(0, None, None, opcode::I::ADDI)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Load {
    pub imm: u16,
    pub rs1: Option<RiscVRegister>,
    pub rd: Option<RiscVRegister>,
    pub opcode: opcode::Load,
}

impl Load {
    #[must_use]
    #[inline(always)]
    pub const fn new(
        imm: u16,
        rs1: Option<RiscVRegister>,
        rd: Option<RiscVRegister>,
        opcode: opcode::Load,
    ) -> Self {
        Self { imm, rs1, rd, opcode }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FLoad {
    pub imm: u16,
    pub rs1: Option<RiscVRegister>,
    pub rd: Float,
    pub opcode: opcode::FLoad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Store {
    pub imm: u16,
    pub rs1: Option<RiscVRegister>,
    pub rs2: Option<RiscVRegister>,
    pub opcode: opcode::Store,
}

impl Store {
    #[must_use]
    #[inline(always)]
    pub const fn new(
        imm: u16,
        rs1: Option<RiscVRegister>,
        rs2: Option<RiscVRegister>,
        opcode: opcode::Store,
    ) -> Self {
        Self { imm, rs1, rs2, opcode }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FStore {
    pub imm: u16,
    pub rs1: Option<RiscVRegister>,
    pub rs2: Float,
    pub opcode: opcode::FStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FToInt {
    pub rd: Option<RiscVRegister>,
    pub rs1: Float,
    pub rm: opcode::RoundingMode,
    pub opcode: opcode::FToInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntToF {
    pub rd: Float,
    pub rs1: Option<RiscVRegister>,
    pub rm: opcode::RoundingMode,
    pub opcode: opcode::IntToF,
}

/// `csr` is the 12-bit CSR index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Csr {
    pub csr: u16,
    pub rs1: Option<RiscVRegister>,
    pub rd: Option<RiscVRegister>,
    pub opcode: opcode::Csr,
}

impl Csr {
    #[must_use]
    #[inline(always)]
    pub const fn new(
        csr: u16,
        rs1: Option<RiscVRegister>,
        rd: Option<RiscVRegister>,
        opcode: opcode::Csr,
    ) -> Self {
        Self { csr, rs1, rd, opcode }
    }
}

/// `uimm` is the 5-bit zero-extended immediate that takes the place of `rs1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrI {
    pub csr: u16,
    pub uimm: u8,
    pub rd: Option<RiscVRegister>,
    pub opcode: opcode::CsrI,
}

/// `imm` holds the already-shifted upper 20 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U {
    pub imm: u32,
    pub rd: Option<RiscVRegister>,
    pub opcode: opcode::U,
}

impl U {
    #[must_use]
    #[inline(always)]
    pub const fn new(imm: u32, rd: Option<RiscVRegister>, opcode: opcode::U) -> Self {
        Self { imm, rd, opcode }
    }
}

/// `imm` is the 21-bit signed byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct J {
    pub imm: u32,
    pub rd: Option<RiscVRegister>,
    pub opcode: opcode::J,
}

impl J {
    #[must_use]
    #[inline(always)]
    pub const fn new(imm: u32, rd: Option<RiscVRegister>, opcode: opcode::J) -> Self {
        Self { imm, rd, opcode }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IJump {
    pub imm: u16,
    pub rs1: Option<RiscVRegister>,
    pub rd: Option<RiscVRegister>,
    pub opcode: opcode::IJump,
}

/// `imm` is the 13-bit signed byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub rs1: Option<RiscVRegister>,
    pub rs2: Option<RiscVRegister>,
    pub imm: u16,
    pub opcode: opcode::B,
}

impl Branch {
    #[must_use]
    #[inline(always)]
    pub const fn new(
        imm: u16,
        rs1: Option<RiscVRegister>,
        rs2: Option<RiscVRegister>,
        opcode: opcode::B,
    ) -> Self {
        Self { rs1, rs2, imm, opcode }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sys {
    pub opcode: opcode::Sys,
}

impl Sys {
    #[must_use]
    #[inline(always)]
    pub const fn new(opcode: opcode::Sys) -> Self {
        Self { opcode }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vma {
    pub rs1: Option<RiscVRegister>,
    pub rs2: Option<RiscVRegister>,
    pub opcode: opcode::Vma,
}

/// Upper half of a value only known after golden-model resolution, as `lui rd, imm`.
///
/// `imm` is `None` until resolved; unresolved placeholders encode a zero immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Producer0 {
    pub rd: Option<RiscVRegister>,
    pub imm: Option<u32>,
}

/// Lower half of a resolved value, as `addi rd, rd, imm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Producer1 {
    pub rd: Option<RiscVRegister>,
    pub imm: Option<u16>,
}

/// Use of a resolved value, as `jalr rd, imm(rs1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumer {
    pub rd: Option<RiscVRegister>,
    pub rs1: Option<RiscVRegister>,
    pub imm: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::{Branch, Consumer, FStore, I, Instruction, Producer0, Producer1, Store, Sys};
    use crate::opcode;
    use crate::register::{Float, RiscV};

    #[test]
    fn classifier_set() {
        let changing = [
            Instruction::from(Branch::new(4, None, None, opcode::B::BEQ)),
            Instruction::from(Producer0 { rd: Some(RiscV::S1), imm: None }),
            Instruction::from(Producer1 { rd: Some(RiscV::S1), imm: Some(4) }),
            Instruction::from(Consumer { rd: None, rs1: Some(RiscV::S1), imm: None }),
        ];

        for it in &changing {
            assert!(it.is_resolution_dependent(), "{it:?}");
        }

        let stable = [Instruction::from(I::nop()), Instruction::from(Sys::new(opcode::Sys::MRET))];

        for it in &stable {
            assert!(!it.is_resolution_dependent(), "{it:?}");
        }
    }

    #[test]
    fn placeholder_mnemonics() {
        let p0 = Instruction::from(Producer0 { rd: Some(RiscV::S1), imm: None });
        let c = Instruction::from(Consumer { rd: None, rs1: Some(RiscV::S1), imm: Some(8) });
        assert_eq!(p0.mnemonic().as_str(), "lui");
        assert_eq!(c.mnemonic().as_str(), "jalr");
    }

    #[test]
    fn operands() {
        let addi = Instruction::from(I::new(1, Some(RiscV::T2), Some(RiscV::RA), opcode::I::ADDI));
        assert_eq!(addi.int_sources(), [Some(RiscV::T2), None]);
        assert_eq!(addi.int_dest(), Some(RiscV::RA));

        let sd = Instruction::from(Store::new(0, Some(RiscV::T1), Some(RiscV::SP), opcode::Store::SD));
        assert_eq!(sd.int_sources(), [Some(RiscV::T1), Some(RiscV::SP)]);
        assert_eq!(sd.int_dest(), None);

        let fsd = Instruction::from(FStore {
            imm: 0,
            rs1: Some(RiscV::T1),
            rs2: Float::masked(3),
            opcode: opcode::FStore::FSD,
        });
        assert_eq!(fsd.float_source(), Some(Float::masked(3)));
        assert_eq!(fsd.float_dest(), None);

        let p1 = Instruction::from(Producer1 { rd: Some(RiscV::S1), imm: None });
        assert_eq!(p1.int_sources(), [Some(RiscV::S1), None]);
        assert_eq!(p1.int_dest(), Some(RiscV::S1));
    }
}
