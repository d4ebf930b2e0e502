pub mod lengths_tsv;
