//! Reserved byte ranges over the program memory region.

use std::collections::BTreeMap;
use std::ops::Range;

use rand::Rng;

use crate::GenError;

/// Random attempts made by [`MemoryView::random_free`] before it falls back to
/// enumerating every candidate.
const RANDOM_TRIES: usize = 32;

#[derive(Debug, Clone)]
pub struct MemoryView {
    size: u64,
    // start -> end, kept merged: no two entries overlap or touch.
    reserved: BTreeMap<u64, u64>,
}

impl MemoryView {
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self { size, reserved: BTreeMap::new() }
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Marks `[addr, addr + len)` as reserved. The range is clipped to the region.
    pub fn reserve(&mut self, addr: u64, len: u64) {
        let mut start = addr.min(self.size);
        let mut end = addr.saturating_add(len).min(self.size);

        if start >= end {
            return;
        }

        // everything overlapping or adjacent gets folded into the new interval.
        let absorbed: Vec<(u64, u64)> = self
            .reserved
            .range(..=end)
            .rev()
            .take_while(|&(_, &e)| e >= start)
            .map(|(&s, &e)| (s, e))
            .collect();

        for (s, e) in absorbed {
            self.reserved.remove(&s);
            start = start.min(s);
            end = end.max(e);
        }

        self.reserved.insert(start, end);
    }

    #[must_use]
    pub fn is_reserved(&self, addr: u64) -> bool {
        !self.is_range_free(addr, 1)
    }

    /// Whether `[addr, addr + len)` lies inside the region and touches no reserved byte.
    #[must_use]
    pub fn is_range_free(&self, addr: u64, len: u64) -> bool {
        let Some(end) = addr.checked_add(len) else {
            return false;
        };

        if end > self.size {
            return false;
        }

        if len == 0 {
            return true;
        }

        // the closest interval starting before `end` is the only one that can overlap.
        match self.reserved.range(..end).next_back() {
            Some((_, &e)) => e <= addr,
            None => true,
        }
    }

    /// The reserved intervals, merged and in address order.
    pub fn merged_intervals(&self) -> impl Iterator<Item = Range<u64>> + '_ {
        self.reserved.iter().map(|(&s, &e)| s..e)
    }

    /// Total number of reserved bytes.
    #[must_use]
    pub fn reserved_len(&self) -> u64 {
        self.merged_intervals().map(|it| it.end - it.start).sum()
    }

    /// Picks a random `addr` in `[lo, hi - len]` aligned to `2^align_bits` such that
    /// `[addr, addr + len)` is free.
    ///
    /// # Errors
    /// [`GenError::NoFreeRegion`] when no such address exists.
    pub fn random_free<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        align_bits: u8,
        len: u64,
        lo: u64,
        hi: u64,
    ) -> Result<u64, GenError> {
        let err = GenError::NoFreeRegion { align_bits, len, lo, hi };

        let align = 1_u64.checked_shl(u32::from(align_bits)).ok_or_else(|| err.clone())?;
        let hi = hi.min(self.size);

        let Some((first, last)) = aligned_span(lo, hi, len, align) else {
            return Err(err);
        };

        let slots = (last - first) / align + 1;

        for _ in 0..RANDOM_TRIES {
            let addr = first + rng.random_range(0..slots) * align;
            if self.is_range_free(addr, len) {
                return Ok(addr);
            }
        }

        // the region is crowded: enumerate the gaps and pick uniformly among what fits.
        let spans: Vec<(u64, u64)> = self
            .gaps(lo, hi)
            .filter_map(|gap| aligned_span(gap.start, gap.end, len, align))
            .collect();

        let total: u64 = spans.iter().map(|&(first, last)| (last - first) / align + 1).sum();

        if total == 0 {
            return Err(err);
        }

        let mut pick = rng.random_range(0..total);
        for (first, last) in spans {
            let count = (last - first) / align + 1;
            if pick < count {
                return Ok(first + pick * align);
            }

            pick -= count;
        }

        unreachable!("pick was drawn below the candidate total")
    }

    /// Unreserved stretches of `[lo, hi)`.
    fn gaps(&self, lo: u64, hi: u64) -> impl Iterator<Item = Range<u64>> + '_ {
        let mut cursor = lo;
        let mut done = false;
        let mut intervals = self.reserved.iter().filter(move |&(_, &e)| e > lo);

        std::iter::from_fn(move || {
            while !done {
                match intervals.next() {
                    Some((&s, &e)) if s < hi => {
                        let gap = cursor..s.max(cursor);
                        cursor = cursor.max(e);
                        if !gap.is_empty() {
                            return Some(gap);
                        }
                    }
                    _ => {
                        done = true;
                        if cursor < hi {
                            return Some(cursor..hi);
                        }
                    }
                }
            }

            None
        })
    }
}

/// First and last `align`-aligned addresses `a` in `[lo, hi)` with `a + len <= hi`.
fn aligned_span(lo: u64, hi: u64, len: u64, align: u64) -> Option<(u64, u64)> {
    let top = hi.checked_sub(len)?;
    let first = lo.checked_next_multiple_of(align)?;
    let last = top / align * align;

    (first <= last).then_some((first, last))
}
