use crate::cli::args::Cli;
use crate::core::engine::{self, RunConfig};
use crate::core::stats;
use anyhow::{Result, bail};
use clap::Parser;
use std::fs;
use std::path::Path;
use std::time::Instant;

pub fn entry() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(args: Cli) -> Result<()> {
    let stats = stats::enabled();
    let t0 = Instant::now();

    let cfg = RunConfig {
        input: args.input_fasta,
        output: args.output_txt_file,
    };

    stats::stage(stats, "preflight", || preflight(&cfg))?;

    let t_engine = Instant::now();
    let output = engine::run(&cfg)?;
    stats::stage_done(stats, "engine", t_engine);

    if stats {
        let input_size = fs::metadata(&cfg.input).map(|m| m.len()).unwrap_or(0);
        eprintln!(
            "{} input={} kind={} bytes={} records={} residues={}",
            stats::STATS_ENV,
            cfg.input.display(),
            output.kind.as_str(),
            input_size,
            output.summary.records,
            output.summary.residues
        );
        eprintln!("{} output={}", stats::STATS_ENV, cfg.output.display());
        eprintln!("{} total={}", stats::STATS_ENV, stats::fmt_dur(t0.elapsed()));
    }

    Ok(())
}

fn preflight(cfg: &RunConfig) -> Result<()> {
    if cfg.input.as_os_str() == "-" {
        bail!("stdin is not supported; provide a FASTA file path");
    }
    if !cfg.input.exists() {
        bail!("input file not found: {}", cfg.input.display());
    }
    if !cfg.input.is_file() {
        bail!("input is not a regular file: {}", cfg.input.display());
    }
    if cfg.output.as_os_str().is_empty() {
        bail!("output path is empty");
    }
    if cfg.output.is_dir() {
        bail!("output path is a directory: {}", cfg.output.display());
    }
    if same_file(&cfg.input, &cfg.output) {
        bail!(
            "output path must differ from the input path: {}",
            cfg.output.display()
        );
    }
    Ok(())
}

/// True when both paths name the same file after resolving `.`, `..` and links.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        // A path that does not exist yet cannot alias an existing input.
        _ => a == b,
    }
}
