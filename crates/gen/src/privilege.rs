/// RISC-V privilege levels, with their architectural encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Privilege {
    User = 0,
    Supervisor = 1,
    Machine = 3,
}

impl Privilege {
    /// The 2-bit encoding used by `mstatus.MPP`.
    #[must_use]
    pub const fn encoding(self) -> u8 {
        self as u8
    }
}

/// What the generated program has done to the privilege-related CSRs so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeState {
    pub privstate: Privilege,
    pub is_mepc_populated: bool,
    pub is_sepc_populated: bool,
    pub curr_mstatus_mpp: Option<Privilege>,
    pub curr_mstatus_spp: Option<Privilege>,
}

impl Default for PrivilegeState {
    fn default() -> Self {
        Self {
            privstate: Privilege::Machine,
            is_mepc_populated: false,
            is_sepc_populated: false,
            curr_mstatus_mpp: None,
            curr_mstatus_spp: None,
        }
    }
}

impl PrivilegeState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mepc(&mut self) {
        self.is_mepc_populated = true;
    }

    pub fn set_sepc(&mut self) {
        self.is_sepc_populated = true;
    }

    pub fn set_mpp(&mut self, target: Privilege) {
        self.curr_mstatus_mpp = Some(target);
    }

    /// `sstatus.SPP` is a single bit; it cannot name machine mode.
    pub fn set_spp(&mut self, target: Privilege) {
        invariant!(target != Privilege::Machine, "SPP cannot hold machine mode");

        self.curr_mstatus_spp = Some(target);
    }

    /// Whether an `mret`/`sret` issued now would be well formed.
    #[must_use]
    pub fn can_descend(&self) -> bool {
        match self.privstate {
            Privilege::Machine => self.is_mepc_populated && self.curr_mstatus_mpp.is_some(),
            Privilege::Supervisor => self.is_sepc_populated && self.curr_mstatus_spp.is_some(),
            Privilege::User => false,
        }
    }
}
