use crate::model::BusinessStub;
use crate::storage::{read_ndjson, NdjsonWriter, StorageResult};
use std::path::Path;

/// The discovery checkpoint: an append-only list of business stubs
///
/// Its presence on disk means discovery already ran; the detail phase reads
/// it back as its work queue.
#[derive(Debug)]
pub struct Checkpoint {
    writer: NdjsonWriter,
}

impl Checkpoint {
    /// Whether a checkpoint file exists at `path`
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Opens the checkpoint for appending, creating it if needed
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self {
            writer: NdjsonWriter::open(path)?,
        })
    }

    /// Appends one search page's stubs
    pub fn record(&self, stubs: &[BusinessStub]) -> StorageResult<()> {
        self.writer.append_all(stubs)
    }

    /// Reads every stub in the checkpoint, in file order
    pub fn load(path: &Path) -> StorageResult<Vec<BusinessStub>> {
        read_ndjson(path)
    }

    /// Deletes the checkpoint so the next run redoes discovery
    pub fn remove(path: &Path) -> StorageResult<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }
}
