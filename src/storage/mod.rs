//! Storage module for persisting crawl progress
//!
//! Both phases persist to line-delimited JSON files that are only ever
//! appended to:
//! - the discovery checkpoint, one business stub per line, which doubles as
//!   the detail phase's work queue
//! - the output sink, one extracted business per line, whose identifiers are
//!   loaded at startup to skip businesses already done

mod checkpoint;
mod ndjson;
mod sink;
mod traits;

pub use checkpoint::Checkpoint;
pub use ndjson::{read_ndjson, NdjsonWriter};
pub use sink::NdjsonSink;
pub use traits::{RecordSink, StorageError, StorageResult};
