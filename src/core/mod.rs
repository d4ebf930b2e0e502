pub mod engine;
pub mod fasta;
pub mod io;
pub mod stats;
