use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GZIP_READ_BUF: usize = 1024 * 1024;

pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        // SAFETY: read-only file mapping.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("mmap failed for {}", path.display()))?;
        Ok(Self { mmap })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputKind {
    Plain,
    Gzip,
}

impl InputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InputKind::Plain => "plain",
            InputKind::Gzip => "gzip",
        }
    }
}

pub enum InputSource {
    Empty,
    Mmap(MmapSource),
    Gzip(BufReader<MultiGzDecoder<File>>),
}

impl InputSource {
    pub fn open(path: &Path) -> Result<(Self, InputKind)> {
        let kind = detect_input_kind(path)?;
        let source = match kind {
            InputKind::Plain => {
                let len = std::fs::metadata(path)
                    .with_context(|| format!("failed to stat {}", path.display()))?
                    .len();
                // Zero-length files cannot be mapped on every platform.
                if len == 0 {
                    InputSource::Empty
                } else {
                    InputSource::Mmap(MmapSource::open(path)?)
                }
            }
            InputKind::Gzip => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                InputSource::Gzip(BufReader::with_capacity(
                    GZIP_READ_BUF,
                    MultiGzDecoder::new(file),
                ))
            }
        };
        Ok((source, kind))
    }

    pub fn reader(&mut self) -> Box<dyn BufRead + '_> {
        match self {
            InputSource::Empty => Box::new(io::empty()),
            InputSource::Mmap(source) => Box::new(source.bytes()),
            InputSource::Gzip(reader) => Box::new(reader),
        }
    }
}

pub fn detect_input_kind(path: &Path) -> Result<InputKind> {
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        if ext.eq_ignore_ascii_case("gz") {
            return Ok(InputKind::Gzip);
        }
    }
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut magic = [0u8; 2];
    let n = file
        .read(&mut magic)
        .with_context(|| format!("failed to read magic bytes of {}", path.display()))?;
    if n == 2 && magic == GZIP_MAGIC {
        Ok(InputKind::Gzip)
    } else {
        Ok(InputKind::Plain)
    }
}
