use crate::model::ScrapedBusiness;
use crate::storage::{read_ndjson, NdjsonWriter, RecordSink, StorageResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Only the key is needed to know a line's business was already scraped
#[derive(Deserialize)]
struct SinkKey {
    #[serde(rename = "bizId")]
    biz_id: String,
}

/// Line-delimited output file with a dedup set loaded at open time
///
/// The identifier set is a snapshot of the file when it was opened; records
/// appended afterwards are not added to it.
#[derive(Debug)]
pub struct NdjsonSink {
    writer: NdjsonWriter,
    scraped: HashSet<String>,
}

impl NdjsonSink {
    /// Scans the existing output (if any) and opens it for appending
    pub fn open(path: &Path) -> StorageResult<Self> {
        let scraped = Self::scraped_ids(path)?;
        tracing::debug!(
            "Loaded {} already-scraped businesses from {}",
            scraped.len(),
            path.display()
        );

        Ok(Self {
            writer: NdjsonWriter::open(path)?,
            scraped,
        })
    }

    /// Reads the identifiers present in an output file without opening it for writing
    pub fn scraped_ids(path: &Path) -> StorageResult<HashSet<String>> {
        let keys: Vec<SinkKey> = read_ndjson(path)?;
        Ok(keys.into_iter().map(|k| k.biz_id).collect())
    }

    /// Number of distinct businesses present when the sink was opened
    pub fn scraped_count(&self) -> usize {
        self.scraped.len()
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }
}

impl RecordSink for NdjsonSink {
    fn has(&self, biz_id: &str) -> bool {
        self.scraped.contains(biz_id)
    }

    fn append(&self, record: &ScrapedBusiness) -> StorageResult<()> {
        self.writer.append(record)
    }
}
