#![no_main]

use libfuzzer_sys::fuzz_target;
use rvdiff_gen::builder::{BuilderConfig, populate};
use rvdiff_gen::FuzzerState;

fuzz_target!(|data: (u64, u8, bool)| {
    let (seed, n_blocks, is_64bit) = data;

    let mut state = FuzzerState::new(0x8000, is_64bit, seed);
    let config = BuilderConfig { n_blocks: usize::from(n_blocks % 32), ..BuilderConfig::default() };

    if populate(&mut state, &config).is_err() {
        return;
    }

    let image = rvdiff::assemble(&mut state, 0x8000_0000).unwrap_or_else(|e| panic!("seed {seed}: {e}"));
    assert_eq!(image.len() as u64, state.memsize);
    assert!(state.used_len() <= state.memsize);
});
