use crate::core::fasta::SeqRecord;
use anyhow::{Context, Result};
use std::fs::{self, File, Permissions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WriteSummary {
    pub records: u64,
    pub residues: u64,
}

#[derive(Debug)]
enum Destination {
    /// Regular file (existing or not), symlinks already resolved.
    Regular {
        path: PathBuf,
        permissions: Option<Permissions>,
    },
    /// Device, FIFO or dangling symlink: opened and truncated in place.
    Direct,
}

/// Writes `<id>\t<len>\n` for every record into `path`.
///
/// Regular files are replaced atomically: lines go to a temporary file next to
/// the real destination, which is persisted over it only once the last record
/// is flushed. Other outputs are written through directly.
pub fn write<I>(path: &Path, records: I) -> Result<WriteSummary>
where
    I: IntoIterator<Item = Result<SeqRecord>>,
{
    match resolve_destination(path)? {
        Destination::Regular { path: dest, permissions } => {
            write_replacing(&dest, permissions, records)
        }
        Destination::Direct => write_direct(path, records),
    }
}

fn resolve_destination(path: &Path) -> Result<Destination> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            let real = fs::canonicalize(path)
                .with_context(|| format!("failed to resolve {}", path.display()))?;
            Ok(Destination::Regular {
                path: real,
                permissions: Some(meta.permissions()),
            })
        }
        Ok(_) => Ok(Destination::Direct),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let dangling = fs::symlink_metadata(path)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if dangling {
                Ok(Destination::Direct)
            } else {
                Ok(Destination::Regular {
                    path: path.to_path_buf(),
                    permissions: new_file_permissions(),
                })
            }
        }
        Err(e) => Err(e).with_context(|| format!("failed to stat {}", path.display())),
    }
}

fn write_replacing<I>(
    dest: &Path,
    permissions: Option<Permissions>,
    records: I,
) -> Result<WriteSummary>
where
    I: IntoIterator<Item = Result<SeqRecord>>,
{
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    // Dropping the temp file on any early return removes it.
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file for {}", dest.display()))?;

    let mut w = BufWriter::new(&mut tmp);
    let summary = write_records(&mut w, records, dest)?;
    w.into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("failed to flush {}", dest.display()))?;

    if let Some(permissions) = permissions {
        tmp.as_file()
            .set_permissions(permissions)
            .with_context(|| format!("failed to set permissions for {}", dest.display()))?;
    }
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to sync {}", dest.display()))?;
    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to move output to {}", dest.display()))?;
    Ok(summary)
}

fn write_direct<I>(path: &Path, records: I) -> Result<WriteSummary>
where
    I: IntoIterator<Item = Result<SeqRecord>>,
{
    let file =
        File::create(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut w = BufWriter::new(file);
    let summary = write_records(&mut w, records, path)?;
    w.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(summary)
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}

fn write_records<W, I>(w: &mut W, records: I, dest: &Path) -> Result<WriteSummary>
where
    W: Write,
    I: IntoIterator<Item = Result<SeqRecord>>,
{
    let mut summary = WriteSummary::default();
    for record in records {
        let record = record?;
        write_line(w, &record).with_context(|| format!("failed to write {}", dest.display()))?;
        summary.records += 1;
        summary.residues += record.len;
    }
    Ok(summary)
}

pub fn write_line<W: Write + ?Sized>(w: &mut W, record: &SeqRecord) -> io::Result<()> {
    w.write_all(&record.id)?;
    writeln!(w, "\t{}", record.len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn rec(id: &[u8], len: u64) -> Result<SeqRecord> {
        Ok(SeqRecord {
            id: id.to_vec(),
            len,
        })
    }

    fn no_records() -> Vec<Result<SeqRecord>> {
        Vec::new()
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn line_layout() {
        let mut out = Vec::new();
        write_line(&mut out, &SeqRecord { id: b"seq1".to_vec(), len: 8 }).unwrap();
        write_line(&mut out, &SeqRecord { id: Vec::new(), len: 1_000_000 }).unwrap();
        assert_eq!(out, b"seq1\t8\n\t1000000\n");
    }

    #[test]
    fn writes_and_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "stale content that is longer than the report\n").unwrap();

        let summary = write(&path, vec![rec(b"a", 3), rec(b"b", 0)]).unwrap();

        assert_eq!(summary, WriteSummary { records: 2, residues: 3 });
        assert_eq!(fs::read(&path).unwrap(), b"a\t3\nb\t0\n");
        assert_eq!(dir_entries(dir.path()), vec!["out.txt"]);
    }

    #[test]
    fn zero_records_leave_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let summary = write(&path, no_records()).unwrap();
        assert_eq!(summary, WriteSummary::default());
        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn parse_error_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "previous\n").unwrap();

        let records = vec![rec(b"a", 1), Err(anyhow!("bad input at line 1"))];
        let err = write(&path, records).unwrap_err();

        assert!(format!("{err:#}").contains("line 1"));
        assert_eq!(fs::read(&path).unwrap(), b"previous\n");
        assert_eq!(dir_entries(dir.path()), vec!["out.txt"]);
    }

    #[test]
    fn sibling_tmp_named_file_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let user_file = dir.path().join("out.txt.tmp");
        fs::write(&user_file, "user data\n").unwrap();

        write(&path, vec![rec(b"a", 2)]).unwrap();
        let failing: Vec<Result<SeqRecord>> = vec![Err(anyhow!("bad input"))];
        assert!(write(&path, failing).is_err());

        assert_eq!(fs::read(&user_file).unwrap(), b"user data\n");
        assert_eq!(fs::read(&path).unwrap(), b"a\t2\n");
        assert_eq!(dir_entries(dir.path()), vec!["out.txt", "out.txt.tmp"]);
    }

    #[test]
    fn missing_output_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("out.txt");
        let err = write(&path, no_records()).unwrap_err();
        assert!(format!("{err:#}").contains("out.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_output_is_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.txt");
        let link = dir.path().join("link.txt");
        fs::write(&real, "old\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        write(&link, vec![rec(b"x", 5)]).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&real).unwrap(), b"x\t5\n");
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_creates_target() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.txt");
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        write(&link, vec![rec(b"x", 1)]).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&real).unwrap(), b"x\t1\n");
    }

    #[cfg(unix)]
    #[test]
    fn device_output_is_written_directly() {
        use std::os::unix::fs::FileTypeExt;
        let summary = write(Path::new("/dev/null"), vec![rec(b"a", 4)]).unwrap();
        assert_eq!(summary, WriteSummary { records: 1, residues: 4 });
        assert!(fs::metadata("/dev/null").unwrap().file_type().is_char_device());
    }

    #[cfg(unix)]
    #[test]
    fn existing_permissions_are_kept() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, Permissions::from_mode(0o640)).unwrap();

        write(&path, vec![rec(b"a", 1)]).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
