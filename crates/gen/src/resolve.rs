//! Patching placeholder immediates with the values the golden model would produce.
//!
//! Producers materialize the physical base of the program region into their register.
//! A consumer jumps, relative to that base, to the block that follows its own.

use rvdiff_core::instruction::Instruction;

use crate::{FuzzerState, GenError};

/// Splits `value` into the `lui` upper part and the sign-extended `addi` lower part.
#[must_use]
pub const fn split_hi_lo(value: u32) -> (u32, u16) {
    let hi = value.wrapping_add(0x800) & 0xffff_f000;
    let lo = value.wrapping_sub(hi) as u16 & 0x0fff;

    // sign-extend the 12-bit pattern to 16 bits.
    let lo = match lo & 0x0800 {
        0 => lo,
        _ => lo | 0xf000,
    };

    (hi, lo)
}

/// Resolves every placeholder in every ordinary block against the physical base `phys_base`.
///
/// # Errors
/// [`GenError::ResolutionOutOfRange`] if the base does not fit in 32 bits or a consumer's
/// target is out of reach of a 12-bit offset.
pub fn resolve_placeholders(state: &mut FuzzerState, phys_base: u64) -> Result<(), GenError> {
    let n_blocks = state.instr_objs_seq.len();

    for bb in 0..n_blocks {
        let successor = match bb + 1 < n_blocks {
            true => state.bb_start_addr_seq[bb + 1],
            false => state.final_bb_base_addr,
        };

        for idx in 0..state.instr_objs_seq[bb].len() {
            let addr = state.instr_addr(bb, idx);
            let out_of_range = |value| GenError::ResolutionOutOfRange { addr, value };

            let base = || u32::try_from(phys_base).map_err(|_| out_of_range(phys_base));
            let target = state.offset_of(successor);

            match &mut state.instr_objs_seq[bb][idx] {
                Instruction::PlaceholderProducer0(it) => it.imm = Some(split_hi_lo(base()?).0),
                Instruction::PlaceholderProducer1(it) => it.imm = Some(split_hi_lo(base()?).1),
                Instruction::PlaceholderConsumer(it) => match target < 0x800 {
                    true => it.imm = Some(target as u16),
                    false => return Err(out_of_range(target)),
                },
                _ => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rvdiff_core::instruction::{Consumer, I, Instruction, Producer0, Producer1};
    use rvdiff_core::register::RiscV;

    use super::{resolve_placeholders, split_hi_lo};
    use crate::{FuzzerState, GenError};

    #[test]
    fn hi_lo() {
        assert_eq!(split_hi_lo(0x8000_0000), (0x8000_0000, 0));
        assert_eq!(split_hi_lo(0x1234_5678), (0x1234_5000, 0x678));
        assert_eq!(split_hi_lo(0x0000_0fff), (0x0000_1000, 0xffff));
        assert_eq!(split_hi_lo(0x0000_0800), (0x0000_1000, 0xf800));
        assert_eq!(split_hi_lo(0x0000_07ff), (0, 0x07ff));
        assert_eq!(split_hi_lo(0xffff_ffff), (0, 0xffff));

        for value in [0_u32, 1, 0x7ff, 0x800, 0xfff, 0x8000_0800, 0xdead_beef, u32::MAX] {
            let (hi, lo) = split_hi_lo(value);
            let lo = i32::from(lo as i16) as u32;
            assert_eq!(hi.wrapping_add(lo), value, "{value:#x}");
        }
    }

    fn state_with_placeholders() -> FuzzerState {
        let s1 = Some(RiscV::S1);
        let mut state = FuzzerState::new(0x4000, true, 0);

        state.push_block(
            0,
            vec![Producer0 { rd: s1, imm: None }.into(), Producer1 { rd: s1, imm: None }.into()],
        );
        state.push_block(0x40, vec![I::nop().into(), Consumer { rd: None, rs1: s1, imm: None }.into()]);
        state.push_block(0x80, vec![Consumer { rd: None, rs1: s1, imm: None }.into()]);
        state.final_bb_base_addr = 0x100;

        state
    }

    #[test]
    fn placeholders_resolve() {
        let mut state = state_with_placeholders();
        resolve_placeholders(&mut state, 0x8000_1234).unwrap();

        assert_eq!(
            state.instr_objs_seq[0],
            [
                Instruction::from(Producer0 { rd: Some(RiscV::S1), imm: Some(0x8000_1000) }),
                Instruction::from(Producer1 { rd: Some(RiscV::S1), imm: Some(0x234) }),
            ]
        );
        assert_eq!(
            state.instr_objs_seq[1][1],
            Instruction::from(Consumer { rd: None, rs1: Some(RiscV::S1), imm: Some(0x80) })
        );
        assert_eq!(
            state.instr_objs_seq[2][0],
            Instruction::from(Consumer { rd: None, rs1: Some(RiscV::S1), imm: Some(0x100) })
        );
    }

    #[test]
    fn base_out_of_range() {
        let mut state = state_with_placeholders();

        assert_eq!(
            resolve_placeholders(&mut state, 0x1_0000_0000),
            Err(GenError::ResolutionOutOfRange { addr: 0, value: 0x1_0000_0000 })
        );
    }

    #[test]
    fn far_consumer() {
        let mut state = state_with_placeholders();
        state.final_bb_base_addr = 0x800;

        assert_eq!(
            resolve_placeholders(&mut state, 0x8000_0000),
            Err(GenError::ResolutionOutOfRange { addr: 0x80, value: 0x800 })
        );
    }
}
