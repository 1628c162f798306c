use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use crate::{FuzzerState, GenError};

/// Where a memory operation may point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MemPolicy {
    /// Somewhere a previous store wrote.
    AnyStoreloc,
    /// Any free location. Loads only.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyWeights {
    pub any_storeloc: u32,
    pub any: u32,
}

impl PolicyWeights {
    fn get(self, policy: MemPolicy) -> u32 {
        match policy {
            MemPolicy::AnyStoreloc => self.any_storeloc,
            MemPolicy::Any => self.any,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerWeights {
    pub load: PolicyWeights,
    pub store: PolicyWeights,
}

impl Default for PickerWeights {
    fn default() -> Self {
        Self {
            load: PolicyWeights { any_storeloc: 3, any: 1 },
            store: PolicyWeights { any_storeloc: 1, any: 0 },
        }
    }
}

/// Picks the target address of a `2^align_bits`-byte load or store.
///
/// A policy is drawn by weight; if it has no candidate the remaining policies are tried
/// in weighted order.
///
/// # Errors
/// [`GenError::NoAddressAvailable`] once every policy with a positive weight came up empty.
pub fn pick_memop_addr(
    state: &mut FuzzerState,
    is_load: bool,
    align_bits: u8,
) -> Result<u64, GenError> {
    let weights = match is_load {
        true => state.picker_weights.load,
        false => state.picker_weights.store,
    };

    let mut policies: Vec<(MemPolicy, u32)> = [MemPolicy::AnyStoreloc, MemPolicy::Any]
        .into_iter()
        // stores never go to an arbitrary address, whatever the weights say.
        .filter(|&policy| is_load || policy != MemPolicy::Any)
        .map(|policy| (policy, weights.get(policy)))
        .filter(|&(_, weight)| weight > 0)
        .collect();

    while !policies.is_empty() {
        let Ok(dist) = WeightedIndex::new(policies.iter().map(|&(_, weight)| weight)) else {
            break;
        };

        let idx = dist.sample(&mut state.rng);
        let policy = policies[idx].0;

        let picked = match policy {
            MemPolicy::AnyStoreloc => {
                state.memstorestate.pick_store_location(&mut state.rng, align_bits)
            }
            MemPolicy::Any => state.memview_blacklist.random_free(
                &mut state.rng,
                align_bits,
                1 << align_bits,
                0,
                state.memsize.saturating_sub(1),
            ),
        };

        match picked {
            Ok(addr) => {
                invariant!(addr % (1 << align_bits) == 0, "{addr:#x} is misaligned");
                invariant!(addr + (1 << align_bits) < state.memsize, "{addr:#x} is out of range");

                if !is_load {
                    state.memstorestate.last_store_addr = Some(addr);
                }

                tracing::trace!(%policy, is_load, align_bits, addr = format_args!("{addr:#x}"));
                return Ok(addr);
            }

            Err(GenError::NoStoreHistory { .. } | GenError::NoFreeRegion { .. }) => {
                tracing::trace!(%policy, is_load, align_bits, "policy exhausted");
                policies.swap_remove(idx);
            }

            Err(e) => return Err(e),
        }
    }

    Err(GenError::NoAddressAvailable { is_load, align_bits })
}
