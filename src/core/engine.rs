use crate::core::fasta::FastaReader;
use crate::core::io::{InputKind, InputSource};
use crate::core::stats;
use crate::report::lengths_tsv::{self, WriteSummary};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;

pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct RunOutput {
    pub kind: InputKind,
    pub summary: WriteSummary,
}

pub fn run(cfg: &RunConfig) -> Result<RunOutput> {
    let stats = stats::enabled();

    let t_open = Instant::now();
    let (mut source, kind) = InputSource::open(&cfg.input)
        .with_context(|| format!("cannot read input {}", cfg.input.display()))?;
    stats::stage_done(stats, "engine.input_open", t_open);

    let t_write = Instant::now();
    let input = &cfg.input;
    let records = FastaReader::new(source.reader()).map(|record| {
        record.with_context(|| format!("failed to parse FASTA input {}", input.display()))
    });
    let summary = lengths_tsv::write(&cfg.output, records)
        .with_context(|| format!("failed to produce {}", cfg.output.display()))?;
    stats::stage_done(stats, "engine.parse_write", t_write);

    Ok(RunOutput { kind, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(dir: &tempfile::TempDir, input: &[u8]) -> RunConfig {
        let cfg = RunConfig {
            input: dir.path().join("in.fa"),
            output: dir.path().join("out.txt"),
        };
        fs::write(&cfg.input, input).unwrap();
        cfg
    }

    #[test]
    fn reports_each_record() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir, b">seq1 description here\nACGT\nACGT\n>seq2\nACGTACGTAC\n");

        let out = run(&cfg).unwrap();

        assert_eq!(out.kind, InputKind::Plain);
        assert_eq!(out.summary, WriteSummary { records: 2, residues: 18 });
        assert_eq!(fs::read(&cfg.output).unwrap(), b"seq1\t8\nseq2\t10\n");
    }

    #[test]
    fn malformed_input_names_the_input_path() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir, b"ACGT\n>a\nA\n");

        let err = run(&cfg).unwrap_err();
        let msg = format!("{err:#}");

        assert!(msg.contains("in.fa"), "{msg}");
        assert!(msg.contains("line 1"), "{msg}");
        assert!(!cfg.output.exists());
    }

    #[test]
    fn missing_input_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            input: dir.path().join("absent.fa"),
            output: dir.path().join("out.txt"),
        };

        assert!(run(&cfg).is_err());
        assert!(!cfg.output.exists());
        assert!(!dir.path().join("out.txt.tmp").exists());
    }
}
