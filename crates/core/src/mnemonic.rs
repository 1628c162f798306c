use core::fmt;
use core::str::FromStr;

use crate::opcode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mnemonic `{0}`")]
pub struct UnknownMnemonic(pub String);

/// Any mnemonic the generator knows how to encode.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Mnemonic {
    R(opcode::R),
    I(opcode::I),
    Load(opcode::Load),
    FLoad(opcode::FLoad),
    Store(opcode::Store),
    FStore(opcode::FStore),
    FToInt(opcode::FToInt),
    IntToF(opcode::IntToF),
    Csr(opcode::Csr),
    CsrI(opcode::CsrI),
    U(opcode::U),
    J(opcode::J),
    IJump(opcode::IJump),
    B(opcode::B),
    Sys(opcode::Sys),
    Vma(opcode::Vma),
}

impl Mnemonic {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::R(it) => it.into(),
            Self::I(it) => it.into(),
            Self::Load(it) => it.into(),
            Self::FLoad(it) => it.into(),
            Self::Store(it) => it.into(),
            Self::FStore(it) => it.into(),
            Self::FToInt(it) => it.into(),
            Self::IntToF(it) => it.into(),
            Self::Csr(it) => it.into(),
            Self::CsrI(it) => it.into(),
            Self::U(it) => it.into(),
            Self::J(it) => it.into(),
            Self::IJump(it) => it.into(),
            Self::B(it) => it.into(),
            Self::Sys(it) => it.into(),
            Self::Vma(it) => it.into(),
        }
    }

    /// log2 of the access width, for memory operations only.
    #[must_use]
    pub const fn alignment_bits(self) -> Option<u8> {
        match self {
            Self::Load(it) => Some(it.alignment_bits()),
            Self::FLoad(it) => Some(it.alignment_bits()),
            Self::Store(it) => Some(it.alignment_bits()),
            Self::FStore(it) => Some(it.alignment_bits()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_load(self) -> bool {
        matches!(self, Self::Load(_) | Self::FLoad(_))
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mnemonic {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let s = lower.as_str();

        // the per-format tables are disjoint, so the first hit is the only hit.
        s.parse()
            .ok()
            .map(Self::R)
            .or_else(|| s.parse().ok().map(Self::I))
            .or_else(|| s.parse().ok().map(Self::Load))
            .or_else(|| s.parse().ok().map(Self::FLoad))
            .or_else(|| s.parse().ok().map(Self::Store))
            .or_else(|| s.parse().ok().map(Self::FStore))
            .or_else(|| s.parse().ok().map(Self::FToInt))
            .or_else(|| s.parse().ok().map(Self::IntToF))
            .or_else(|| s.parse().ok().map(Self::Csr))
            .or_else(|| s.parse().ok().map(Self::CsrI))
            .or_else(|| s.parse().ok().map(Self::U))
            .or_else(|| s.parse().ok().map(Self::J))
            .or_else(|| s.parse().ok().map(Self::IJump))
            .or_else(|| s.parse().ok().map(Self::B))
            .or_else(|| s.parse().ok().map(Self::Sys))
            .or_else(|| s.parse().ok().map(Self::Vma))
            .ok_or_else(|| UnknownMnemonic(s.to_owned()))
    }
}

/// log2 of the access width of a memory mnemonic.
///
/// # Errors
/// Fails with [`UnknownMnemonic`] for anything that isn't a load or store.
pub fn alignment_bits(mnemonic: &str) -> Result<u8, UnknownMnemonic> {
    mnemonic
        .parse::<Mnemonic>()?
        .alignment_bits()
        .ok_or_else(|| UnknownMnemonic(mnemonic.to_owned()))
}

#[must_use]
pub fn is_load(mnemonic: &str) -> bool {
    mnemonic.parse::<Mnemonic>().is_ok_and(Mnemonic::is_load)
}
