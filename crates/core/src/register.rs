use core::fmt;
use core::num::NonZeroU8;

/// An integer register other than `x0`.
///
/// `x0` is represented as `None` wherever an `Option<RiscV>` is accepted.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct RiscV(NonZeroU8);

impl fmt::Debug for RiscV {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X{}", self.0)
    }
}

// all of these functions are super trivial and should *always* be inlined.
#[allow(clippy::inline_always)]
impl RiscV {
    #[inline(always)]
    #[must_use]
    pub const fn new(inner: NonZeroU8) -> Option<Self> {
        match inner.get() < 32 {
            true => Some(Self(inner)),
            false => None,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn with_u8(v: u8) -> Option<Self> {
        match NonZeroU8::new(v) {
            Some(v) => Self::new(v),
            None => None,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0.get()
    }

    pub const RA: Self = Self::with_u8(1).unwrap();
    pub const SP: Self = Self::with_u8(2).unwrap();
    pub const T0: Self = Self::with_u8(5).unwrap();
    pub const T1: Self = Self::with_u8(6).unwrap();
    pub const T2: Self = Self::with_u8(7).unwrap();
    pub const S1: Self = Self::with_u8(9).unwrap();
    pub const X31: Self = Self::with_u8(31).unwrap();

    pub const XLEN: usize = 32;
}

/// A floating point register, `f0` included.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Float(u8);

impl fmt::Debug for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

#[allow(clippy::inline_always)]
impl Float {
    #[inline(always)]
    #[must_use]
    pub const fn with_u8(v: u8) -> Option<Self> {
        match v < 32 {
            true => Some(Self(v)),
            false => None,
        }
    }

    /// The register named by the low five bits of `v`.
    #[inline(always)]
    #[must_use]
    pub const fn masked(v: u8) -> Self {
        Self(v & 0b1_1111)
    }

    #[inline(always)]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Raw register index as it appears in an encoded field.
#[inline]
#[must_use]
pub const fn index(register: Option<RiscV>) -> u8 {
    match register {
        None => 0,
        Some(it) => it.get(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Float, RiscV};

    #[test]
    fn bounds() {
        assert!(RiscV::with_u8(0).is_none());
        assert!(RiscV::with_u8(32).is_none());
        assert_eq!(RiscV::with_u8(31), Some(RiscV::X31));
        assert_eq!(Float::with_u8(0).map(Float::get), Some(0));
        assert!(Float::with_u8(32).is_none());
    }
}
