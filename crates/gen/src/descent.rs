use rvdiff_core::instruction::{Instruction, Sys};
use rvdiff_core::opcode;

use crate::GenError;
use crate::privilege::{Privilege, PrivilegeState};

/// Emits the `mret`/`sret` that leaves the current privilege level, and moves `state` to
/// the level it returns to.
///
/// # Errors
/// [`GenError::InvalidDescent`] if the return address or previous-privilege field for the
/// current level was never written, or when already in user mode.
pub fn gen_priv_descent_instr(state: &mut PrivilegeState) -> Result<Instruction, GenError> {
    let from = state.privstate;
    let invalid = |reason| GenError::InvalidDescent { from, reason };

    let instruction = match from {
        Privilege::Machine => {
            if !state.is_mepc_populated {
                return Err(invalid("mepc is not populated"));
            }

            let target = state.curr_mstatus_mpp.ok_or_else(|| invalid("mstatus.MPP is unset"))?;

            state.is_mepc_populated = false;
            state.privstate = target;
            state.curr_mstatus_mpp = Some(Privilege::User);

            Sys::new(opcode::Sys::MRET)
        }

        Privilege::Supervisor => {
            if !state.is_sepc_populated {
                return Err(invalid("sepc is not populated"));
            }

            let target = state.curr_mstatus_spp.ok_or_else(|| invalid("sstatus.SPP is unset"))?;

            state.is_sepc_populated = false;
            state.privstate = target;
            state.curr_mstatus_spp = Some(Privilege::User);

            Sys::new(opcode::Sys::SRET)
        }

        Privilege::User => return Err(invalid("user mode has no lower level")),
    };

    tracing::trace!(%from, to = %state.privstate, "privilege descent");

    Ok(instruction.into())
}

#[cfg(test)]
mod tests {
    use rvdiff_core::instruction::{Instruction, Sys};
    use rvdiff_core::opcode;

    use super::gen_priv_descent_instr;
    use crate::GenError;
    use crate::privilege::{Privilege, PrivilegeState};

    #[test]
    fn machine_to_supervisor() {
        let mut state = PrivilegeState::new();
        state.set_mepc();
        state.set_mpp(Privilege::Supervisor);

        let instruction = gen_priv_descent_instr(&mut state).unwrap();

        assert_eq!(instruction, Instruction::Sys(Sys::new(opcode::Sys::MRET)));
        assert_eq!(rvdiff_encode::instruction(&instruction), Ok(0x3020_0073));
        assert_eq!(
            state,
            PrivilegeState {
                privstate: Privilege::Supervisor,
                is_mepc_populated: false,
                is_sepc_populated: false,
                curr_mstatus_mpp: Some(Privilege::User),
                curr_mstatus_spp: None,
            }
        );
    }

    #[test]
    fn machine_to_supervisor_to_user() {
        let mut state = PrivilegeState::new();
        state.set_mepc();
        state.set_mpp(Privilege::Supervisor);
        gen_priv_descent_instr(&mut state).unwrap();

        state.set_sepc();
        state.set_spp(Privilege::User);
        let before = state.clone();

        let instruction = gen_priv_descent_instr(&mut state).unwrap();
        assert_eq!(rvdiff_encode::instruction(&instruction), Ok(0x1020_0073));
        assert_eq!(state.privstate, Privilege::User);
        assert!(!state.is_sepc_populated);
        assert_eq!(state.curr_mstatus_spp, Some(Privilege::User));

        // the fields the descent touched are exactly the ones it reports.
        let mut restored = state.clone();
        restored.privstate = Privilege::Supervisor;
        restored.is_sepc_populated = true;
        assert_eq!(restored, before);

        assert!(matches!(
            gen_priv_descent_instr(&mut state),
            Err(GenError::InvalidDescent { from: Privilege::User, .. })
        ));
    }

    #[test]
    fn machine_to_machine() {
        let mut state = PrivilegeState::new();
        state.set_mepc();
        state.set_mpp(Privilege::Machine);

        gen_priv_descent_instr(&mut state).unwrap();
        assert_eq!(state.privstate, Privilege::Machine);
        assert_eq!(state.curr_mstatus_mpp, Some(Privilege::User));
    }

    #[test]
    fn preconditions() {
        let mut state = PrivilegeState::new();
        state.set_mpp(Privilege::User);
        let before = state.clone();

        assert!(matches!(
            gen_priv_descent_instr(&mut state),
            Err(GenError::InvalidDescent { from: Privilege::Machine, .. })
        ));
        assert_eq!(state, before);

        let mut state = PrivilegeState::new();
        state.set_mepc();
        assert!(gen_priv_descent_instr(&mut state).is_err());

        let mut state = PrivilegeState { privstate: Privilege::Supervisor, ..PrivilegeState::new() };
        state.set_spp(Privilege::User);
        assert!(gen_priv_descent_instr(&mut state).is_err());
    }
}
