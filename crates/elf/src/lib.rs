#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

mod inspect;
pub mod objcopy;
pub mod writer;

pub use inspect::{Summary, inspect};
pub use writer::{EM_RISCV, TEXT_SECTION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Elf32,
    Elf64,
}

/// How the ELF32 image gets relocated and widened after serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    /// Shell out to `riscv<xlen>-unknown-elf-objcopy`.
    Objcopy { xlen: u32 },
    /// Re-serialize in-process.
    Native,
}

#[derive(Debug, thiserror::Error)]
pub enum ElfError {
    #[error("program header offset {program_offset:#x} differs from section offset {section_offset:#x}")]
    LayoutMismatch { program_offset: u64, section_offset: u64 },

    #[error("malformed ELF: {0}")]
    Parse(&'static str),

    #[error("address {addr:#x} does not fit in a 32-bit ELF")]
    AddressOutOfRange { addr: u64 },

    #[error("`{command}` failed: {reason}")]
    ObjcopyFailed { command: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where to put the program and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    pub entry_address: u64,
    pub section_address: Option<u64>,
    pub is_64bit: bool,
    pub post_process: PostProcess,
}

/// Removes the file at `path` on drop unless [`Self::keep`] was called.
struct PartialFile<'a> {
    path: &'a Path,
    keep: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, keep: false }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.keep {
            if let Err(e) = fs::remove_file(self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), "failed to remove partial output: {e}");
                }
            }
        }
    }
}

/// Writes `text` to `path` as a RISC-V executable.
///
/// The image is first laid out as ELF32 with `.text.init` at the entry address, then relocated
/// to `section_address` and widened to ELF64 as requested. On failure nothing is left at `path`.
///
/// # Errors
/// Returns [`ElfError`] if an address does not fit the chosen class, if the layout check fails
/// on either the initial or the post-processed image, if `objcopy` fails, or on I/O errors.
pub fn emit(path: &Path, text: &[u8], options: &EmitOptions) -> Result<(), ElfError> {
    let EmitOptions { entry_address, section_address, is_64bit, ref post_process } = *options;

    if !is_64bit {
        for addr in [Some(entry_address), section_address].into_iter().flatten() {
            if u32::try_from(addr).is_err() {
                return Err(ElfError::AddressOutOfRange { addr });
            }
        }
    } else if u32::try_from(entry_address).is_err() {
        // objcopy widens an ELF32 image.
        if matches!(post_process, PostProcess::Objcopy { .. }) {
            return Err(ElfError::AddressOutOfRange { addr: entry_address });
        }
    }

    let guard = PartialFile::new(path);

    let summary = match post_process {
        PostProcess::Native => {
            let class = match is_64bit {
                true => Class::Elf64,
                false => Class::Elf32,
            };

            let image = writer::serialize(
                text,
                entry_address,
                section_address.unwrap_or(entry_address),
                class,
            );

            let summary = inspect(&image)?;
            fs::write(path, &image)?;
            summary
        }

        PostProcess::Objcopy { xlen } => {
            let image = writer::serialize(text, entry_address, entry_address, Class::Elf32);
            inspect(&image)?;
            fs::write(path, &image)?;

            objcopy::post_process(*xlen, path, section_address, is_64bit)?;

            inspect(&fs::read(path)?)?
        }
    };

    guard.keep();

    tracing::info!(
        path = %path.display(),
        class = ?summary.class,
        entry = format_args!("{:#x}", summary.entry),
        section = format_args!("{:#x}", summary.section_addr),
        len = text.len(),
        "emitted ELF"
    );

    Ok(())
}

/// Output path for instance `seed` in `dir`.
#[must_use]
pub fn instance_path(dir: &Path, seed: u64) -> PathBuf {
    dir.join(format!("rvdiff_{seed:016x}.elf"))
}

#[cfg(test)]
mod tests;
