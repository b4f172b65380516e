//! # Transaction Log
//!
//! - `header`: the versioned segment header codec
//! - `store_id`: the store identity embedded in current headers
//! - `files`: segment naming, creation and opening
//! - `bridge`: moving readers across segment boundaries

mod bridge;
mod files;
mod header;
mod store_id;

pub use bridge::{ChainedLogReader, ReaderLogVersionBridge, SegmentSource, VersionedChannel};
pub use files::{LogFiles, LogSegment};
pub use header::{LogFormat, LogHeader, encode_log_header, read_log_header, write_log_header};
pub use store_id::StoreId;
