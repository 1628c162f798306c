//! Reserving the bytes that must never be the target of a memory operation.
//!
//! Resolution-dependent instructions encode differently in the golden model and in the
//! replay, so loading them would make the two runs diverge; the terminator and the
//! context setter must survive stores intact.

use rvdiff_core::INSTRUCTION_LEN;

use crate::FuzzerState;

/// The relocator prologue: two instructions at the start of the initial block.
pub const RELOCATOR_PROLOGUE_LEN: u64 = 2 * INSTRUCTION_LEN;

pub fn blacklist_changing_instructions(state: &mut FuzzerState) {
    let Some(&initial_base) = state.bb_start_addr_seq.first() else {
        return;
    };

    let mut reserved = vec![(state.offset_of(initial_base), RELOCATOR_PROLOGUE_LEN)];

    for (bb, block) in state.instr_objs_seq.iter().enumerate() {
        reserved.extend(
            block
                .iter()
                .enumerate()
                .filter(|(_, instruction)| instruction.is_resolution_dependent())
                .map(|(idx, _)| (state.offset_of(state.instr_addr(bb, idx)), INSTRUCTION_LEN)),
        );
    }

    if let Some(last) = state.instr_objs_seq.first().and_then(|block| block.len().checked_sub(1)) {
        reserved.push((state.offset_of(state.instr_addr(0, last)), INSTRUCTION_LEN));
    }

    for (addr, len) in reserved {
        state.memview_blacklist.reserve(addr, len);
    }
}

pub fn blacklist_final_block(state: &mut FuzzerState) {
    let base = state.offset_of(state.final_bb_base_addr);
    let len = INSTRUCTION_LEN * state.final_bb.len() as u64;

    state.memview_blacklist.reserve(base, len);
}

pub fn blacklist_context_setter(state: &mut FuzzerState) {
    let base = state.offset_of(state.ctxsv_bb_base_addr);

    state.memview_blacklist.reserve(base, state.ctxsv_size_upperbound);
}

/// Applies every blacklist. Reserving is idempotent, so running this more than once is harmless.
pub fn blacklist_all(state: &mut FuzzerState) {
    blacklist_changing_instructions(state);
    blacklist_final_block(state);
    blacklist_context_setter(state);

    tracing::debug!(
        reserved_bytes = state.memview_blacklist.reserved_len(),
        intervals = state.memview_blacklist.merged_intervals().count(),
        "blacklist applied"
    );
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use rvdiff_core::instruction::{Branch, Consumer, I, Instruction, Producer0, Producer1, R};
    use rvdiff_core::opcode;
    use rvdiff_core::register::RiscV;

    use super::{blacklist_all, blacklist_changing_instructions};
    use crate::FuzzerState;

    fn dump(state: &FuzzerState) -> String {
        state
            .memview_blacklist
            .merged_intervals()
            .map(|it| format!("[{:#x}, {:#x})\n", it.start, it.end))
            .collect()
    }

    fn alu() -> Instruction {
        R::new(None, None, Some(RiscV::T2), opcode::R::ADD).into()
    }

    #[test]
    fn branch_in_initial_block() {
        let mut state = FuzzerState::new(0x1000, false, 0);
        state.push_block(
            0x100,
            vec![alu(), Branch::new(4, None, None, opcode::B::BEQ).into(), alu(), alu()],
        );

        blacklist_changing_instructions(&mut state);

        // the prologue covers the branch; the block's last instruction stands apart.
        expect![[r#"
            [0x100, 0x108)
            [0x10c, 0x110)
        "#]]
        .assert_eq(&dump(&state));
    }

    #[test]
    fn every_block_and_region() {
        let s1 = Some(RiscV::S1);
        let mut state = FuzzerState::new(0x1000, true, 0);

        state.push_block(
            0,
            vec![
                Producer0 { rd: s1, imm: None }.into(),
                Producer1 { rd: s1, imm: None }.into(),
                I::nop().into(),
                alu(),
            ],
        );
        state.push_block(
            0x200,
            vec![
                alu(),
                Branch::new(4, None, None, opcode::B::BNE).into(),
                alu(),
                Consumer { rd: None, rs1: s1, imm: None }.into(),
            ],
        );

        state.ctxsv_bb_base_addr = 0x10;
        state.ctxsv_size_upperbound = 0x40;
        state.final_bb_base_addr = 0x400;
        state.final_bb = vec![I::nop().into(), alu()];

        blacklist_all(&mut state);

        expect![[r#"
            [0x0, 0x8)
            [0xc, 0x50)
            [0x204, 0x208)
            [0x20c, 0x210)
            [0x400, 0x408)
        "#]]
        .assert_eq(&dump(&state));

        let before = dump(&state);
        blacklist_all(&mut state);
        assert_eq!(dump(&state), before);
    }

    #[test]
    fn nothing_to_blacklist() {
        let mut state = FuzzerState::new(0x1000, false, 0);
        blacklist_changing_instructions(&mut state);
        assert_eq!(dump(&state), "");

        state.push_block(0x20, Vec::new());
        blacklist_changing_instructions(&mut state);
        assert_eq!(dump(&state), "[0x20, 0x28)\n");
    }

    #[test]
    fn reserved_bytes_follow_classifier() {
        let mut state = FuzzerState::new(0x10000, false, 0);
        let block: Vec<Instruction> = (0..64)
            .map(|i| match i % 3 {
                0 => Branch::new(4, None, None, opcode::B::BLT).into(),
                _ => alu(),
            })
            .collect();

        state.push_block(0, vec![alu(), alu(), alu()]);
        state.push_block(0x1000, block.clone());
        blacklist_changing_instructions(&mut state);

        for (idx, instruction) in block.iter().enumerate() {
            let addr = state.instr_addr(1, idx);
            assert_eq!(state.memview_blacklist.is_reserved(addr), instruction.is_resolution_dependent());
        }
    }
}
