#![forbid(unsafe_code)]
#![warn(clippy::must_use_candidate)]

use std::path::{Path, PathBuf};

use rvdiff_core::INSTRUCTION_LEN;
use rvdiff_elf::{ElfError, EmitOptions, PostProcess};
use rvdiff_encode::EncodeError;
use rvdiff_gen::builder::{self, BuilderConfig};
use rvdiff_gen::resolve::resolve_placeholders;
use rvdiff_gen::{FuzzerState, GenError, blacklist};

/// Environment variable naming the toolchain width for `objcopy`.
pub const XLEN_VAR: &str = "RVDIFF_XLEN";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Gen(#[from] GenError),

    #[error("failed to encode instruction at {addr:#x}")]
    Encode {
        addr: u64,
        #[source]
        source: EncodeError,
    },

    #[error(transparent)]
    Elf(#[from] ElfError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitConfig {
    pub post_process: PostProcess,
}

impl Default for EmitConfig {
    /// `objcopy` for the toolchain named by `RVDIFF_XLEN`, 64-bit if unset or unparsable.
    fn default() -> Self {
        let xlen = std::env::var(XLEN_VAR).ok().and_then(|it| it.parse().ok()).unwrap_or(64);
        Self { post_process: PostProcess::Objcopy { xlen } }
    }
}

/// Encodes every block of `state` into one image spanning the whole `memsize` region.
///
/// Placeholders are resolved against `phys_base` first. Bytes outside the blocks are random
/// from the instance RNG, so loads into the data area read defined, seed-determined values.
///
/// # Errors
/// Fails if the program does not fit the region, a placeholder can't be resolved, or an
/// instruction can't be encoded.
pub fn assemble(state: &mut FuzzerState, phys_base: u64) -> Result<Vec<u8>, Error> {
    let used_len = state.used_len();
    if used_len > state.memsize {
        return Err(GenError::LayoutOverflow { needed: used_len, memsize: state.memsize }.into());
    }

    resolve_placeholders(state, phys_base)?;

    let mut image = state.random_region();

    for (base, block) in state.all_blocks() {
        let start = state.offset_of(base) as usize;
        let end = start + block.len() * INSTRUCTION_LEN as usize;

        rvdiff_encode::block_into(block, &mut image[start..end]).map_err(|(idx, source)| {
            Error::Encode { addr: base + INSTRUCTION_LEN * idx as u64, source }
        })?;
    }

    Ok(image)
}

/// Blacklists, resolves and encodes the program in `state`, then writes it to `out_path`.
///
/// # Errors
/// See [`build_and_emit_with`].
pub fn build_and_emit(
    state: &mut FuzzerState,
    out_path: &Path,
    is_64bit: bool,
    entry_address: u64,
    section_address: Option<u64>,
) -> Result<(), Error> {
    build_and_emit_with(
        state,
        out_path,
        is_64bit,
        entry_address,
        section_address,
        &EmitConfig::default(),
    )
}

/// [`build_and_emit`] with an explicit post-processing backend.
///
/// The program runs from `section_address` if given, otherwise from `entry_address`; the
/// relocator prologue is resolved to that address.
///
/// # Errors
/// Returns [`Error::Gen`] if resolution fails, [`Error::Encode`] if an instruction does not
/// encode, and [`Error::Elf`] if emitting fails. No file is left behind on error.
pub fn build_and_emit_with(
    state: &mut FuzzerState,
    out_path: &Path,
    is_64bit: bool,
    entry_address: u64,
    section_address: Option<u64>,
    config: &EmitConfig,
) -> Result<(), Error> {
    blacklist::blacklist_all(state);

    let phys_base = section_address.unwrap_or(entry_address);
    let image = assemble(state, phys_base)?;

    let options = EmitOptions {
        entry_address,
        section_address,
        is_64bit,
        post_process: config.post_process.clone(),
    };

    rvdiff_elf::emit(out_path, &image, &options)?;
    Ok(())
}

/// Everything that describes one generated program apart from its seed.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub memsize: u64,
    pub is_64bit: bool,
    pub entry_address: u64,
    pub section_address: Option<u64>,
    pub builder: BuilderConfig,
    pub emit: EmitConfig,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            memsize: 0x10000,
            is_64bit: true,
            entry_address: 0x8000_0000,
            section_address: None,
            builder: BuilderConfig::default(),
            emit: EmitConfig::default(),
        }
    }
}

/// Builds and emits the program for `seed` into `out_dir`, returning its path.
///
/// # Errors
/// Fails if the program can't be laid out or emitted.
pub fn run_instance(seed: u64, out_dir: &Path, config: &InstanceConfig) -> Result<PathBuf, Error> {
    let _span = tracing::info_span!("instance", seed).entered();

    let mut state = FuzzerState::new(config.memsize, config.is_64bit, seed);
    builder::populate(&mut state, &config.builder)?;

    let path = rvdiff_elf::instance_path(out_dir, seed);
    build_and_emit_with(
        &mut state,
        &path,
        config.is_64bit,
        config.entry_address,
        config.section_address,
        &config.emit,
    )?;

    Ok(path)
}
