#![forbid(unsafe_code)]
#![allow(clippy::match_bool)]
#![warn(clippy::must_use_candidate, clippy::clone_on_copy)]

#[cfg(feature = "disassemble")]
pub mod disassemble;
pub mod instruction;
pub mod mnemonic;
pub mod opcode;
pub mod register;

pub use mnemonic::{Mnemonic, UnknownMnemonic, alignment_bits, is_load};

/// Every instruction the generator emits is a full 32-bit word.
pub const INSTRUCTION_LEN: u64 = 4;
