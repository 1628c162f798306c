use rand::Rng;
use rand::seq::IndexedRandom;

use crate::GenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLocation {
    pub addr: u64,
    pub align_bits: u8,
}

/// Every location a store has targeted so far.
#[derive(Debug, Clone, Default)]
pub struct MemStoreState {
    locations: Vec<StoreLocation>,
    pub last_store_addr: Option<u64>,
}

impl MemStoreState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_store(&mut self, addr: u64, align_bits: u8) {
        invariant!(addr % (1 << align_bits) == 0, "misaligned store location {addr:#x}");

        self.locations.push(StoreLocation { addr, align_bits });
        self.last_store_addr = Some(addr);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn locations(&self) -> &[StoreLocation] {
        &self.locations
    }

    /// Picks an address inside a previous store location at least `2^align_bits` wide,
    /// aligned to `2^align_bits`.
    ///
    /// # Errors
    /// [`GenError::NoStoreHistory`] when no recorded location is wide enough.
    pub fn pick_store_location<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        align_bits: u8,
    ) -> Result<u64, GenError> {
        let candidates: Vec<&StoreLocation> =
            self.locations.iter().filter(|loc| loc.align_bits >= align_bits).collect();

        let loc = candidates.choose(rng).ok_or(GenError::NoStoreHistory { align_bits })?;

        // a narrower access lands on any aligned sub-slot of the wider location.
        let sub_slots = 1_u64 << (loc.align_bits - align_bits);
        let sub = rng.random_range(0..sub_slots);

        Ok(loc.addr + (sub << align_bits))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::MemStoreState;
    use crate::GenError;

    #[test]
    fn empty_history() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let state = MemStoreState::new();

        assert_eq!(state.pick_store_location(&mut rng, 0), Err(GenError::NoStoreHistory { align_bits: 0 }));
    }

    #[test]
    fn narrow_history_rejects_wide_access() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut state = MemStoreState::new();
        state.record_store(0x1000, 2);

        assert_eq!(state.pick_store_location(&mut rng, 3), Err(GenError::NoStoreHistory { align_bits: 3 }));
        assert_eq!(state.pick_store_location(&mut rng, 2), Ok(0x1000));
        assert_eq!(state.last_store_addr, Some(0x1000));
    }

    #[test]
    fn sub_slots_stay_inside_location() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut state = MemStoreState::new();
        state.record_store(0x2000, 3);
        state.record_store(0x3004, 2);

        let mut seen = [false; 4];
        for _ in 0..512 {
            let addr = state.pick_store_location(&mut rng, 1).unwrap();
            assert_eq!(addr % 2, 0);

            match addr {
                0x2000..0x2008 => seen[((addr - 0x2000) / 2) as usize] = true,
                0x3004..0x3008 => {}
                _ => panic!("{addr:#x} is outside every store location"),
            }
        }

        assert_eq!(seen, [true; 4]);

        for _ in 0..64 {
            assert_eq!(state.pick_store_location(&mut rng, 3), Ok(0x2000));
        }
    }
}
