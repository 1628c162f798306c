use std::fs;

use expect_test::expect;

use crate::writer::serialize;
use crate::{Class, ElfError, EmitOptions, PostProcess, emit, inspect, instance_path, objcopy};

const ENTRY: u64 = 0x8000_0000;

fn text() -> Vec<u8> {
    // addi x0, x0, 0 four times.
    [0x13, 0, 0, 0].repeat(4)
}

fn native(is_64bit: bool, section_address: Option<u64>) -> EmitOptions {
    EmitOptions {
        entry_address: ENTRY,
        section_address,
        is_64bit,
        post_process: PostProcess::Native,
    }
}

#[test]
fn native_64bit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.elf");

    emit(&path, &text(), &native(true, None)).unwrap();

    let image = fs::read(&path).unwrap();
    assert_eq!(&image[..4], b"\x7fELF");
    assert_eq!(image[4], 2);

    let summary = inspect(&image).unwrap();
    expect![[r#"
        Summary {
            class: Elf64,
            machine: 243,
            entry: 2147483648,
            segment_offset: 120,
            segment_vaddr: 2147483648,
            section_offset: 120,
            section_addr: 2147483648,
            section_size: 16,
        }
    "#]]
    .assert_debug_eq(&summary);

    let start = summary.section_offset as usize;
    assert_eq!(&image[start..start + 16], text());
}

#[test]
fn native_32bit_relocated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.elf");

    emit(&path, &text(), &native(false, Some(0x8000_1000))).unwrap();

    let summary = inspect(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(summary.class, Class::Elf32);
    assert_eq!(summary.machine, 0xf3);
    assert_eq!(summary.entry, ENTRY);
    assert_eq!(summary.section_addr, 0x8000_1000);
    assert_eq!(summary.segment_vaddr, 0x8000_1000);
    assert_eq!(summary.segment_offset, summary.section_offset);
}

#[test]
fn layout_mismatch_is_detected() {
    let mut image = serialize(&text(), ENTRY, ENTRY, Class::Elf32);

    // p_offset of the only program header.
    image[56..60].copy_from_slice(&88_u32.to_le_bytes());

    assert!(matches!(
        inspect(&image),
        Err(ElfError::LayoutMismatch { program_offset: 88, section_offset: 84 })
    ));
}

#[test]
fn garbage_is_rejected() {
    assert!(matches!(inspect(b"not an elf file at all"), Err(ElfError::Parse(_))));
}

#[test]
fn address_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.elf");

    let options = EmitOptions { entry_address: 0x1_0000_0000, ..native(false, None) };
    assert!(matches!(
        emit(&path, &text(), &options),
        Err(ElfError::AddressOutOfRange { addr: 0x1_0000_0000 })
    ));

    let options = native(false, Some(0x2_0000_0000));
    assert!(emit(&path, &text(), &options).is_err());

    assert!(!path.exists());

    // native 64-bit images take any address.
    let options = EmitOptions { entry_address: 0x1_0000_0000, ..native(true, None) };
    emit(&path, &text(), &options).unwrap();
}

#[test]
fn failed_objcopy_removes_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.elf");

    // there's no 7-bit toolchain.
    let options = EmitOptions { post_process: PostProcess::Objcopy { xlen: 7 }, ..native(true, None) };

    match emit(&path, &text(), &options) {
        Err(ElfError::ObjcopyFailed { command, .. }) => {
            assert!(command.starts_with("riscv7-unknown-elf-objcopy -I elf32-littleriscv"));
        }
        other => panic!("expected objcopy failure, got {other:?}"),
    }

    assert!(!path.exists());
}

#[test]
fn objcopy_without_changes_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.elf");

    let options =
        EmitOptions { post_process: PostProcess::Objcopy { xlen: 7 }, ..native(false, None) };
    emit(&path, &text(), &options).unwrap();

    assert_eq!(inspect(&fs::read(&path).unwrap()).unwrap().class, Class::Elf32);
}

#[test]
fn objcopy_widens() {
    if which::which(objcopy::program(64)).is_err() {
        eprintln!("skipping: {} not on PATH", objcopy::program(64));
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.elf");

    let options = EmitOptions {
        post_process: PostProcess::Objcopy { xlen: 64 },
        section_address: Some(0x8000_1000),
        ..native(true, None)
    };
    emit(&path, &text(), &options).unwrap();

    let image = fs::read(&path).unwrap();
    assert_eq!(&image[..4], b"\x7fELF");
    assert_eq!(image[4], 2);

    let summary = inspect(&image).unwrap();
    assert_eq!(summary.machine, 0xf3);
    assert_eq!(summary.section_addr, 0x8000_1000);
    assert_eq!(summary.section_size, 16);
}

#[test]
fn instance_paths() {
    let path = instance_path(std::path::Path::new("out"), 0xabc);
    assert_eq!(path, std::path::Path::new("out/rvdiff_0000000000000abc.elf"));
}
