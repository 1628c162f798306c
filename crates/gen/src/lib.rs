#![forbid(unsafe_code)]
#![warn(clippy::must_use_candidate)]

/// Checks an internal invariant.
///
/// Always on in debug builds, and in release builds with the `assertions` feature.
/// A failure is a bug in the generator, never a recoverable condition.
macro_rules! invariant {
    ($($arg:tt)*) => {
        if cfg!(any(debug_assertions, feature = "assertions")) {
            assert!($($arg)*);
        }
    };
}

pub mod blacklist;
pub mod builder;
pub mod descent;
pub mod fuzzerstate;
pub mod liveness;
pub mod memstore;
pub mod memview;
pub mod picker;
pub mod privilege;
pub mod resolve;

pub use fuzzerstate::FuzzerState;
pub use privilege::{Privilege, PrivilegeState};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenError {
    #[error(
        "no free {len}-byte region aligned to 2^{align_bits} in [{lo:#x}, {hi:#x})"
    )]
    NoFreeRegion { align_bits: u8, len: u64, lo: u64, hi: u64 },

    #[error("no previous store location suits a 2^{align_bits}-byte access")]
    NoStoreHistory { align_bits: u8 },

    #[error("no address policy can place a 2^{align_bits}-byte {}", if *is_load { "load" } else { "store" })]
    NoAddressAvailable { is_load: bool, align_bits: u8 },

    #[error("cannot descend from {from}: {reason}")]
    InvalidDescent { from: Privilege, reason: &'static str },

    #[error("placeholder at {addr:#x} cannot hold {value:#x}")]
    ResolutionOutOfRange { addr: u64, value: u64 },

    #[error("a {memsize:#x}-byte region is larger than the {max:#x} bytes addressable from the relocator")]
    RegionTooLarge { memsize: u64, max: u64 },

    #[error("program layout needs {needed:#x} bytes but the region only has {memsize:#x}")]
    LayoutOverflow { needed: u64, memsize: u64 },
}
