//! # CLI Command Implementations
//!
//! Each command builds a serializable report and then prints it, either as
//! text or as JSON.

use kestrel_core::{
    ChainedLogReader, KestrelError, LogFiles, LogFormat, LogHeader, ReaderLogVersionBridge,
    StoreId, read_log_header,
};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Storage engine name stamped into generated store ids.
const STORE_ENGINE: &str = "kestrel";

/// Record format family stamped into generated store ids.
const STORE_FORMAT_FAMILY: &str = "standard";

// =============================================================================
// REPORTS
// =============================================================================

/// A decoded segment header.
#[derive(Debug, Serialize)]
pub struct HeaderReport {
    pub path: PathBuf,
    /// `None` when the segment holds no complete header.
    pub header: Option<LogHeader>,
}

/// One entry of a segment listing.
#[derive(Debug, Serialize)]
pub struct SegmentReport {
    pub version: u64,
    pub path: PathBuf,
    pub header: Option<LogHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of following the log across segments.
#[derive(Debug, Serialize)]
pub struct FollowReport {
    pub from: u64,
    pub visited: Vec<u64>,
    pub bytes_read: u64,
}

fn print_json(report: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(report).unwrap_or_default()
    );
}

fn print_header(header: &LogHeader) {
    println!("Format:        {:?} (tag {})", header.format, header.format_tag());
    println!("Log Version:   {}", header.log_version);
    println!("Last Tx:       {}", header.last_committed_tx_id);
    println!("Header Size:   {} bytes", header.header_size);
    match &header.store_id {
        Some(store_id) => println!("Store Id:      {}", store_id),
        None => println!("Store Id:      -"),
    }
}

// =============================================================================
// HEADER COMMAND
// =============================================================================

/// Decode the header of the segment file at `path`.
pub fn inspect_header(path: &Path, strict: bool) -> Result<HeaderReport, KestrelError> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => KestrelError::NoSuchLogFile(path.to_path_buf()),
        _ => KestrelError::Io(e),
    })?;
    let header = read_log_header(&mut file, strict, Some(path))?;
    Ok(HeaderReport {
        path: path.to_path_buf(),
        header,
    })
}

/// Print the header of one segment file.
pub fn cmd_header(path: &Path, strict: bool, json_mode: bool) -> Result<(), KestrelError> {
    let report = inspect_header(path, strict)?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Log Segment Header");
    println!("==================");
    println!("File: {}", report.path.display());
    println!();
    match &report.header {
        Some(header) => print_header(header),
        None => println!("No complete header"),
    }

    Ok(())
}

// =============================================================================
// SEGMENTS COMMAND
// =============================================================================

/// Every segment of the log with its header. A segment whose header cannot
/// be decoded is listed with the error instead.
pub fn list_segments(files: &LogFiles, strict: bool) -> Result<Vec<SegmentReport>, KestrelError> {
    let reports = files
        .versions()?
        .into_iter()
        .map(|version| {
            let path = files.path_for_version(version);
            match files.read_header(version, strict) {
                Ok(header) => SegmentReport {
                    version,
                    path,
                    header,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(version, error = %e, "unreadable log segment");
                    SegmentReport {
                        version,
                        path,
                        header: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();
    Ok(reports)
}

/// Print the segments of the log directory.
pub fn cmd_segments(files: &LogFiles, strict: bool, json_mode: bool) -> Result<(), KestrelError> {
    let reports = list_segments(files, strict)?;

    if json_mode {
        print_json(&reports);
        return Ok(());
    }

    println!("Log Segments");
    println!("============");
    println!("Directory: {}", files.directory().display());
    println!("Prefix:    {}", files.prefix());
    println!();
    if reports.is_empty() {
        println!("No segments");
    }
    for report in &reports {
        match (&report.header, &report.error) {
            (_, Some(error)) => println!("{:>8}  error: {}", report.version, error),
            (Some(header), None) => println!(
                "{:>8}  {:?}  last tx {}",
                report.version, header.format, header.last_committed_tx_id
            ),
            (None, None) => println!("{:>8}  no complete header", report.version),
        }
    }

    Ok(())
}

// =============================================================================
// FOLLOW COMMAND
// =============================================================================

/// Read the log from segment `from` to the end of the newest segment
/// reachable through the version bridge.
pub fn follow_segments(files: &LogFiles, from: u64) -> Result<FollowReport, KestrelError> {
    let start = files.open_for_version(from)?;
    let bridge = ReaderLogVersionBridge::new(files.clone());
    let mut reader = ChainedLogReader::new(bridge, start);

    let bytes_read = io::copy(&mut reader, &mut io::sink())?;
    let visited = reader.visited().to_vec();
    reader.close()?;

    tracing::debug!(from, bytes_read, segments = visited.len(), "followed log");
    Ok(FollowReport {
        from,
        visited,
        bytes_read,
    })
}

/// Print how far the log reaches from segment `from`.
pub fn cmd_follow(files: &LogFiles, from: u64, json_mode: bool) -> Result<(), KestrelError> {
    let report = follow_segments(files, from)?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    let visited: Vec<String> = report.visited.iter().map(u64::to_string).collect();
    println!("Followed log from version {}", report.from);
    println!("Segments:   {}", visited.join(" -> "));
    println!("Bytes read: {}", report.bytes_read);

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the segment for `log_version` holding a fresh header.
pub fn init_segment(
    files: &LogFiles,
    log_version: u64,
    prev_tx: u64,
    format: LogFormat,
) -> Result<HeaderReport, KestrelError> {
    let store_id = format
        .has_store_id()
        .then(|| StoreId::generate(STORE_ENGINE, STORE_FORMAT_FAMILY, 1, 0))
        .transpose()?;
    let header = LogHeader::new(format, log_version, prev_tx, store_id);
    let path = files.create_segment(&header)?;
    Ok(HeaderReport {
        path,
        header: Some(header),
    })
}

/// Create a segment and print its header.
pub fn cmd_init(
    files: &LogFiles,
    log_version: u64,
    prev_tx: u64,
    format: LogFormat,
    json_mode: bool,
) -> Result<(), KestrelError> {
    let report = init_segment(files, log_version, prev_tx, format)?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Created {}", report.path.display());
    if let Some(header) = &report.header {
        print_header(header);
    }

    Ok(())
}
