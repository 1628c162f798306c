use std::fs;

use rvdiff::{EmitConfig, Error, InstanceConfig, assemble, build_and_emit, run_instance};
use rvdiff_core::instruction::Instruction;
use rvdiff_core::register::RiscV;
use rvdiff_elf::{Class, PostProcess, inspect, objcopy};
use rvdiff_gen::builder::populate;
use rvdiff_gen::{FuzzerState, GenError};

fn native(is_64bit: bool) -> InstanceConfig {
    InstanceConfig {
        is_64bit,
        emit: EmitConfig { post_process: PostProcess::Native },
        ..InstanceConfig::default()
    }
}

fn populated(config: &InstanceConfig, seed: u64) -> FuzzerState {
    let mut state = FuzzerState::new(config.memsize, config.is_64bit, seed);
    populate(&mut state, &config.builder).unwrap();
    state
}

fn word(image: &[u8], offset: u64) -> u32 {
    let offset = offset as usize;
    u32::from_le_bytes(image[offset..offset + 4].try_into().unwrap())
}

/// Region offsets of every load and store, from their `lui t1; addi t1; add t1, t1, s1` setup.
fn access_spans(state: &FuzzerState) -> Vec<(u64, u64)> {
    let t1 = Some(RiscV::T1);
    let mut spans = Vec::new();

    for block in &state.instr_objs_seq {
        for window in block.windows(4) {
            let [Instruction::U(lui), Instruction::I(addi), Instruction::R(add), access] = window
            else {
                continue;
            };

            if lui.rd != t1 || addi.rd != t1 || add.rd != t1 || add.rs2 != Some(RiscV::S1) {
                continue;
            }

            let align_bits = match access {
                Instruction::Load(it) => it.opcode.alignment_bits(),
                Instruction::FLoad(it) => it.opcode.alignment_bits(),
                Instruction::Store(it) => it.opcode.alignment_bits(),
                Instruction::FStore(it) => it.opcode.alignment_bits(),
                _ => continue,
            };

            let lo = i32::from(addi.imm.cast_signed()).cast_unsigned();
            spans.push((u64::from(lui.imm.wrapping_add(lo)), 1 << align_bits));
        }
    }

    spans
}

#[test]
fn memory_accesses_stay_inside_the_segment() {
    let dir = tempfile::tempdir().unwrap();

    for seed in 0..8 {
        let config = native(seed % 2 == 0);

        let path = run_instance(seed, dir.path(), &config).unwrap();
        let summary = inspect(&fs::read(&path).unwrap()).unwrap();

        let class = match config.is_64bit {
            true => Class::Elf64,
            false => Class::Elf32,
        };
        assert_eq!(summary.class, class);
        assert_eq!(summary.entry, 0x8000_0000);
        assert_eq!(summary.section_addr, 0x8000_0000);
        assert_eq!(summary.section_size, config.memsize);

        let spans = access_spans(&populated(&config, seed));
        assert!(!spans.is_empty(), "seed {seed}");

        for (target, len) in spans {
            assert!(target + len <= summary.section_size, "seed {seed}: {target:#x}+{len}");
        }
    }
}

#[test]
fn image_layout() {
    let config = native(true);
    let mut state = populated(&config, 3);
    let image = assemble(&mut state, 0x8000_0000).unwrap();

    // lui s1, 0x80000; addi s1, s1, 0
    assert_eq!(word(&image, 0), 0x8000_04b7);
    assert_eq!(word(&image, 4), 0x0004_8493);

    // nop; jal x0, 0
    assert_eq!(word(&image, state.final_bb_base_addr), 0x0000_0013);
    assert_eq!(word(&image, state.final_bb_base_addr + 4), 0x0000_006f);
    assert_eq!(image.len() as u64, config.memsize);

    // the context setter ends in mret.
    let mret = state.ctxsv_bb_base_addr + 4 * (state.ctxsv_bb.len() as u64 - 1);
    assert_eq!(word(&image, mret), 0x3020_0073);
}

#[test]
fn relocated_section_moves_the_base() {
    let config = native(false);
    let mut state = populated(&config, 11);
    let image = assemble(&mut state, 0x8000_4000).unwrap();

    // lui s1, 0x80004
    assert_eq!(word(&image, 0), 0x8000_44b7);

    let dir = tempfile::tempdir().unwrap();
    let config = InstanceConfig { section_address: Some(0x8000_4000), ..native(false) };
    let path = run_instance(11, dir.path(), &config).unwrap();
    let emitted = fs::read(&path).unwrap();

    let summary = inspect(&emitted).unwrap();
    assert_eq!(summary.class, Class::Elf32);
    assert_eq!(summary.entry, 0x8000_0000);
    assert_eq!(summary.section_addr, 0x8000_4000);

    let start = summary.section_offset as usize;
    assert_eq!(&emitted[start..start + image.len()], image);
}

#[test]
fn same_seed_same_file() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let config = native(true);

    let a = fs::read(run_instance(42, a.path(), &config).unwrap()).unwrap();
    let b = fs::read(run_instance(42, b.path(), &config).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn unresolvable_base_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = InstanceConfig { entry_address: 0x1_0000_0000, ..native(false) };

    assert!(matches!(
        run_instance(0, dir.path(), &config),
        Err(Error::Gen(GenError::ResolutionOutOfRange { addr: 0, value: 0x1_0000_0000 }))
    ));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn oversized_region() {
    let dir = tempfile::tempdir().unwrap();
    let config = InstanceConfig { memsize: 0x100, ..native(true) };

    assert!(matches!(
        run_instance(0, dir.path(), &config),
        Err(Error::Gen(GenError::LayoutOverflow { .. }))
    ));
}

#[test]
fn default_backend_is_objcopy() {
    let PostProcess::Objcopy { xlen } = EmitConfig::default().post_process else {
        panic!("default backend should be objcopy");
    };

    let program = objcopy::program(xlen);
    if which::which(&program).is_err() {
        eprintln!("skipping: {program} not on PATH");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.elf");
    let mut state = populated(&native(true), 5);

    build_and_emit(&mut state, &path, true, 0x8000_0000, None).unwrap();

    let image = fs::read(&path).unwrap();
    assert_eq!(image[4], 2);
    assert_eq!(inspect(&image).unwrap().entry, 0x8000_0000);
}
