use crate::storage::{StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only writer for line-delimited JSON
///
/// Every call serializes its items up front and writes them under one lock,
/// so concurrent callers never produce interleaved or partial lines.
#[derive(Debug)]
pub struct NdjsonWriter {
    path: PathBuf,
    file: Mutex<File>,
}

impl NdjsonWriter {
    /// Opens (creating if needed) the file at `path` for appending
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one item as one line
    pub fn append<T: Serialize>(&self, item: &T) -> StorageResult<()> {
        self.append_all(std::slice::from_ref(item))
    }

    /// Appends each item as its own line in a single write
    pub fn append_all<T: Serialize>(&self, items: &[T]) -> StorageResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for item in items {
            buffer.push_str(&serde_json::to_string(item)?);
            buffer.push('\n');
        }

        let mut file = self
            .file
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        file.write_all(buffer.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Reads every well-formed line of a line-delimited JSON file
///
/// A missing file reads as empty. Blank lines are skipped; a line that does
/// not parse (typically a torn final line after a crash) is logged and skipped.
pub fn read_ndjson<T: DeserializeOwned>(path: &Path) -> StorageResult<Vec<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::warn!(
                    "Skipping malformed line {} in {}: {}",
                    index + 1,
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(items)
}
