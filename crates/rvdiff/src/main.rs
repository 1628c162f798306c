use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;
use rvdiff::{EmitConfig, InstanceConfig, XLEN_VAR};
use rvdiff_elf::PostProcess;
use rvdiff_gen::builder::BuilderConfig;
use tracing_subscriber::EnvFilter;

fn parse_hex(s: &str) -> Result<u64, String> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u64::from_str_radix(&digits.replace('_', ""), 16).map_err(|e| format!("`{s}`: {e}"))
}

/// Generate RISC-V test programs for differential CPU fuzzing.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Seed of the first instance; instance `i` uses `seed + i`
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of programs to generate
    #[arg(long, default_value_t = 1)]
    count: u64,

    /// Worker threads, 0 for one per core
    #[arg(long, default_value_t = 0)]
    jobs: usize,

    /// Directory the ELF files are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Size of the program region in bytes (hex)
    #[arg(long, value_parser = parse_hex, default_value = "0x10000")]
    memsize: u64,

    /// Random blocks per program
    #[arg(long, default_value_t = 8)]
    blocks: usize,

    /// Target a 64-bit design
    #[arg(long)]
    rv64: bool,

    /// Entry address (hex)
    #[arg(long, value_parser = parse_hex, default_value = "0x80000000")]
    entry: u64,

    /// Relocate `.text.init` to this address (hex)
    #[arg(long, value_parser = parse_hex)]
    section_addr: Option<u64>,

    /// Post-process with `riscv<xlen>-unknown-elf-objcopy` instead of in-process
    #[arg(long)]
    objcopy: bool,

    /// Width of the objcopy toolchain
    #[arg(long, env = XLEN_VAR, default_value_t = 64)]
    xlen: u32,
}

impl Cli {
    fn instance_config(&self) -> InstanceConfig {
        let post_process = match self.objcopy {
            true => PostProcess::Objcopy { xlen: self.xlen },
            false => PostProcess::Native,
        };

        InstanceConfig {
            memsize: self.memsize,
            is_64bit: self.rv64,
            entry_address: self.entry,
            section_address: self.section_addr,
            builder: BuilderConfig { n_blocks: self.blocks, ..BuilderConfig::default() },
            emit: EmitConfig { post_process },
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create `{}`", cli.out_dir.display()))?;

    let config = cli.instance_config();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.jobs)
        .build()
        .context("failed to start worker pool")?;

    let failures: Vec<(u64, rvdiff::Error)> = pool.install(|| {
        (0..cli.count)
            .into_par_iter()
            .filter_map(|i| {
                let seed = cli.seed.wrapping_add(i);
                rvdiff::run_instance(seed, &cli.out_dir, &config).err().map(|e| (seed, e))
            })
            .collect()
    });

    let n_failed = failures.len();
    for (seed, e) in failures {
        tracing::error!(seed, "{:#}", anyhow::Error::from(e));
    }

    if n_failed > 0 {
        anyhow::bail!("{n_failed} of {} instances failed", cli.count);
    }

    Ok(())
}
