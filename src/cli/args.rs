use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "fasta-seqlen",
    version,
    about = "Write a tab-delimited table of FASTA record identifiers and sequence lengths"
)]
pub struct Cli {
    /// Input FASTA file (plain or gzip-compressed)
    #[arg(short = 'i', long = "input_fasta", value_name = "FASTA")]
    pub input_fasta: PathBuf,

    /// Output table, one `<id>\t<length>` line per record (created or replaced)
    #[arg(short = 'o', long = "output_txt_file", value_name = "TXT")]
    pub output_txt_file: PathBuf,
}
