use meshkv_core::{Error, LogEntry, Result};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// How many log ids share one `LogEntry::id` batch (§4.5: `id = batch *
/// IDS_PER_BATCH + rand(0, IDS_PER_BATCH - 1)`).
pub const IDS_PER_BATCH: i64 = 10_000;

/// How many batches are grouped into a single segment file on disk.
pub const BATCHES_PER_SEGMENT: i64 = 100;

/// The segment file number a given log id belongs to.
pub fn segment_number(id: i64) -> i64 {
    id / IDS_PER_BATCH / BATCHES_PER_SEGMENT
}

pub fn segment_path(directory: &Path, number: i64) -> PathBuf {
    directory.join(format!("meshkv.entry.{number}.db"))
}

/// A single append-only segment file: newline-delimited JSON `LogEntry`
/// records. Segments are never rewritten in place; a torn trailing line
/// left by a crash mid-write is detected and dropped on open.
pub struct Segment {
    number: i64,
    path: PathBuf,
    file: RwLock<File>,
}

impl Segment {
    pub fn create(directory: &Path, number: i64) -> Result<Self> {
        std::fs::create_dir_all(directory)?;
        let path = segment_path(directory, number);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self { number, path, file: RwLock::new(file) })
    }

    /// Open an existing segment, truncating a torn trailing line if the
    /// process crashed mid-append (§4.6 recovery: a partial last line is
    /// discarded rather than treated as a fatal error).
    pub fn open(directory: &Path, number: i64) -> Result<(Self, Vec<LogEntry>)> {
        let path = segment_path(directory, number);
        let read_file = File::open(&path)?;
        let reader = BufReader::new(read_file);

        let mut entries = Vec::new();
        let mut valid_len: u64 = 0;
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => {
                    valid_len += line.len() as u64 + 1;
                    entries.push(entry);
                }
                Err(_) => break,
            }
        }

        let file = OpenOptions::new().read(true).append(true).open(&path)?;
        if let Ok(meta) = file.metadata() {
            if meta.len() > valid_len {
                tracing::warn!(
                    segment = number,
                    kept = entries.len(),
                    "truncating torn trailing record on segment recovery"
                );
                file.set_len(valid_len)?;
            }
        }

        Ok((Self { number, path, file: RwLock::new(file) }, entries))
    }

    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let line = serde_json::to_string(entry)
            .map_err(|e| Error::persistence(format!("encode log entry: {e}")))?;
        let mut file = self.file.write();
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.file.read().sync_data()?;
        Ok(())
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// List segment numbers already present in `directory`, ascending.
pub fn existing_segments(directory: &Path) -> Result<Vec<i64>> {
    if !directory.exists() {
        return Ok(Vec::new());
    }
    let mut numbers: Vec<i64> = std::fs::read_dir(directory)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            e.file_name()
                .to_str()
                .and_then(|name| name.strip_prefix("meshkv.entry."))
                .and_then(|name| name.strip_suffix(".db"))
                .and_then(|number| number.parse::<i64>().ok())
        })
        .collect();
    numbers.sort_unstable();
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshkv_core::Op;
    use tempfile::TempDir;

    #[test]
    fn append_then_reopen_recovers_entries() {
        let dir = TempDir::new().unwrap();
        let seg = Segment::create(dir.path(), 0).unwrap();
        for id in 0..5 {
            seg.append(&LogEntry::new(id, Op::Set { key: format!("k{id}"), value: "v".into() }))
                .unwrap();
        }
        drop(seg);

        let (_, entries) = Segment::open(dir.path(), 0).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[4].id, 4);
    }

    #[test]
    fn torn_trailing_line_is_dropped_on_open() {
        let dir = TempDir::new().unwrap();
        {
            let seg = Segment::create(dir.path(), 0).unwrap();
            seg.append(&LogEntry::new(0, Op::Set { key: "k".into(), value: "v".into() }))
                .unwrap();
        }
        // Simulate a crash mid-write: append a truncated JSON fragment with no newline.
        {
            let mut f = OpenOptions::new().append(true).open(segment_path(dir.path(), 0)).unwrap();
            f.write_all(b"{\"id\":1,\"op\":\"Set\"").unwrap();
        }

        let (_, entries) = Segment::open(dir.path(), 0).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn segment_number_follows_batch_width() {
        assert_eq!(segment_number(0), 0);
        assert_eq!(segment_number(IDS_PER_BATCH * BATCHES_PER_SEGMENT - 1), 0);
        assert_eq!(segment_number(IDS_PER_BATCH * BATCHES_PER_SEGMENT), 1);
    }
}
