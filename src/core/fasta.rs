use memchr::memchr;
use std::io::{self, BufRead};
use thiserror::Error;

const HEADER_MARKER: u8 = b'>';

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("line {line}: expected a '>' header line, found sequence data before the first record")]
    MissingHeader { line: u64 },
    #[error("line {line}: read failed: {source}")]
    Io {
        line: u64,
        #[source]
        source: io::Error,
    },
}

/// One FASTA entry reduced to what the length table needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SeqRecord {
    pub id: Vec<u8>,
    pub len: u64,
}

/// Streaming FASTA reader.
///
/// Header lines are buffered; body lines are counted straight out of the
/// underlying reader's buffer and never copied.
pub struct FastaReader<R> {
    reader: R,
    header: Vec<u8>,
    line: u64,
    started: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            header: Vec::new(),
            line: 0,
            started: false,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<SeqRecord>, FastaError> {
        if !self.started {
            self.started = true;
            if !self.seek_first_header()? {
                return Ok(None);
            }
        } else if !self.at_header()? {
            return Ok(None);
        }

        self.read_header()?;
        let id = identifier(&self.header).to_vec();
        let mut len = 0u64;
        while !self.at_eof()? && !self.at_header()? {
            len += self.count_body_line()?;
        }
        Ok(Some(SeqRecord { id, len }))
    }

    fn seek_first_header(&mut self) -> Result<bool, FastaError> {
        loop {
            if self.at_eof()? {
                return Ok(false);
            }
            if self.at_header()? {
                return Ok(true);
            }
            if self.count_body_line()? > 0 {
                return Err(FastaError::MissingHeader { line: self.line });
            }
        }
    }

    fn peek(&mut self) -> Result<Option<u8>, FastaError> {
        let line = self.line + 1;
        let buf = self
            .reader
            .fill_buf()
            .map_err(|source| FastaError::Io { line, source })?;
        Ok(buf.first().copied())
    }

    fn at_eof(&mut self) -> Result<bool, FastaError> {
        Ok(self.peek()?.is_none())
    }

    fn at_header(&mut self) -> Result<bool, FastaError> {
        Ok(self.peek()? == Some(HEADER_MARKER))
    }

    fn read_header(&mut self) -> Result<(), FastaError> {
        self.line += 1;
        let line = self.line;
        self.header.clear();
        self.reader
            .read_until(b'\n', &mut self.header)
            .map_err(|source| FastaError::Io { line, source })?;
        Ok(())
    }

    /// Consumes one line and returns its residue count.
    fn count_body_line(&mut self) -> Result<u64, FastaError> {
        self.line += 1;
        let line = self.line;
        let mut residues = 0u64;
        loop {
            let buf = self
                .reader
                .fill_buf()
                .map_err(|source| FastaError::Io { line, source })?;
            if buf.is_empty() {
                return Ok(residues);
            }
            match memchr(b'\n', buf) {
                Some(end) => {
                    residues += count_residues(&buf[..end]);
                    self.reader.consume(end + 1);
                    return Ok(residues);
                }
                None => {
                    let n = buf.len();
                    residues += count_residues(buf);
                    self.reader.consume(n);
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<SeqRecord, FastaError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// First whitespace-delimited token after the marker; empty if there is none.
pub fn identifier(header: &[u8]) -> &[u8] {
    let title = header.strip_prefix(&[HEADER_MARKER]).unwrap_or(header);
    title
        .split(|b| b.is_ascii_whitespace())
        .find(|token| !token.is_empty())
        .unwrap_or(&[])
}

pub fn count_residues(line: &[u8]) -> u64 {
    line.iter().filter(|b| !b.is_ascii_whitespace()).count() as u64
}
