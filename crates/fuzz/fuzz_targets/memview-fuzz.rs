#![no_main]

use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rvdiff_gen::memview::MemoryView;

const SIZE: u64 = 0x400;

fuzz_target!(|data: &[u8]| {
    let Some((&seed, ops)) = data.split_first() else {
        return;
    };

    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
    let mut view = MemoryView::new(SIZE);

    for op in ops.chunks_exact(4) {
        let addr = u64::from(u16::from_le_bytes([op[0], op[1]])) % (SIZE + 0x40);
        let len = u64::from(op[2]);

        match op[3] & 0x80 {
            0 => view.reserve(addr, len),
            _ => {
                let align_bits = op[3] & 0b11;
                let len = len.max(1);
                let (lo, hi) = (addr.min(SIZE), SIZE);

                if let Ok(found) = view.random_free(&mut rng, align_bits, len, lo, hi) {
                    assert_eq!(found % (1 << align_bits), 0);
                    assert!(found >= lo && found + len <= hi);
                    assert!(view.is_range_free(found, len));
                }
            }
        }

        let mut end = 0;
        for interval in view.merged_intervals() {
            assert!(interval.start > end || (end == 0 && interval.start == 0));
            assert!(interval.start < interval.end && interval.end <= SIZE);
            end = interval.end;
        }
    }
});
