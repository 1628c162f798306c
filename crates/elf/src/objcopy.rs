//! The external `objcopy` backend.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::{ElfError, TEXT_SECTION};

#[must_use]
pub fn program(xlen: u32) -> String {
    format!("riscv{xlen}-unknown-elf-objcopy")
}

/// Arguments (excluding the file) for relocating `.text.init` and widening to ELF64.
#[must_use]
pub fn arguments(section_address: Option<u64>, is_64bit: bool) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(addr) = section_address {
        args.push("--change-section-address".to_owned());
        args.push(format!("{TEXT_SECTION}={addr:#x}"));
    }

    if is_64bit {
        args.extend(["-I", "elf32-littleriscv", "-O", "elf64-littleriscv"].map(str::to_owned));
    }

    args
}

/// Rewrites the file at `path` in place. Does nothing when there is nothing to change.
///
/// # Errors
/// [`ElfError::ObjcopyFailed`] if the tool can't be spawned or exits unsuccessfully.
pub fn post_process(
    xlen: u32,
    path: &Path,
    section_address: Option<u64>,
    is_64bit: bool,
) -> Result<(), ElfError> {
    let args = arguments(section_address, is_64bit);
    if args.is_empty() {
        return Ok(());
    }

    let program = program(xlen);
    let command_line = || {
        let mut line = OsString::from(&program);
        for arg in &args {
            line.push(" ");
            line.push(arg);
        }
        line.push(" ");
        line.push(path);
        line.to_string_lossy().into_owned()
    };

    tracing::debug!(command = %command_line(), "running objcopy");

    let output = Command::new(&program).args(&args).arg(path).output().map_err(|e| {
        ElfError::ObjcopyFailed { command: command_line(), reason: e.to_string() }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ElfError::ObjcopyFailed {
            command: command_line(),
            reason: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::{arguments, program};

    #[test]
    fn command_lines() {
        assert_eq!(program(64), "riscv64-unknown-elf-objcopy");

        expect![[r#"
            [
                "--change-section-address",
                ".text.init=0x80001000",
                "-I",
                "elf32-littleriscv",
                "-O",
                "elf64-littleriscv",
            ]
        "#]]
        .assert_debug_eq(&arguments(Some(0x8000_1000), true));

        assert!(arguments(None, false).is_empty());
    }
}
