//! Tests for the log tool commands and argument parsing.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use kestrel::cli::{
    Cli, Commands, FormatArg, follow_segments, init_segment, inspect_header, list_segments,
};
use kestrel_core::{KestrelError, LogFiles, LogFormat};
use std::fs::{self, OpenOptions};
use std::io::Write;

fn append(path: &std::path::Path, payload: &[u8]) {
    OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(payload))
        .unwrap();
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn test_parse_init_defaults() {
    let cli = Cli::try_parse_from(["kestrel", "init"]).unwrap();
    match cli.command {
        Commands::Init {
            log_version,
            prev_tx,
            format,
        } => {
            assert_eq!(log_version, 0);
            assert_eq!(prev_tx, 1);
            assert_eq!(format, FormatArg::StoreBound);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "kestrel",
        "segments",
        "--log-dir",
        "/tmp/log",
        "--prefix",
        "journal",
        "--json-mode",
    ])
    .unwrap();
    assert!(cli.json_mode);

    let config = cli.kernel_config().unwrap();
    assert_eq!(config.log_directory, std::path::PathBuf::from("/tmp/log"));
    assert_eq!(config.log_file_prefix, "journal");
}

#[test]
fn test_config_file_overridden_by_flags() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("kestrel.toml");
    fs::write(
        &config_path,
        "log_directory = \"from-file\"\nlog_file_prefix = \"filelog\"\nstrict_log_headers = false\n",
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "kestrel",
        "--config",
        config_path.to_str().unwrap(),
        "--prefix",
        "flaglog",
        "segments",
    ])
    .unwrap();
    let config = cli.kernel_config().unwrap();
    assert_eq!(config.log_directory, std::path::PathBuf::from("from-file"));
    assert_eq!(config.log_file_prefix, "flaglog");
    assert!(!config.strict_log_headers);
}

#[test]
fn test_unknown_format_is_rejected() {
    assert!(Cli::try_parse_from(["kestrel", "init", "--format", "ancient"]).is_err());
}

// =============================================================================
// INIT + HEADER
// =============================================================================

#[test]
fn test_init_then_inspect_every_format() {
    let dir = tempfile::tempdir().unwrap();
    let files = LogFiles::new(dir.path(), "txlog");

    for (version, format) in [
        (0, LogFormat::Compact),
        (1, LogFormat::Extended),
        (2, LogFormat::StoreBound),
    ] {
        let created = init_segment(&files, version, 10 + version, format).unwrap();
        assert_eq!(created.path, files.path_for_version(version));

        let inspected = inspect_header(&created.path, true).unwrap();
        let header = inspected.header.unwrap();
        assert_eq!(header.format, format);
        assert_eq!(header.log_version, version);
        assert_eq!(header.last_committed_tx_id, 10 + version);
        assert_eq!(header.store_id.is_some(), format.has_store_id());
        assert_eq!(Some(header), created.header);
    }
}

#[test]
fn test_init_refuses_existing_segment() {
    let dir = tempfile::tempdir().unwrap();
    let files = LogFiles::new(dir.path(), "txlog");
    init_segment(&files, 4, 1, LogFormat::Compact).unwrap();
    assert!(init_segment(&files, 4, 1, LogFormat::Compact).is_err());
}

#[test]
fn test_header_of_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("txlog.0");
    fs::write(&path, [6u8, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3]).unwrap();

    assert!(matches!(
        inspect_header(&path, true),
        Err(KestrelError::IncompleteLogHeader { read: 3, expected: 8, .. })
    ));
    assert!(inspect_header(&path, false).unwrap().header.is_none());
}

#[test]
fn test_header_of_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        inspect_header(&dir.path().join("txlog.9"), true),
        Err(KestrelError::NoSuchLogFile(_))
    ));
}

#[test]
fn test_header_json_shape() {
    let dir = tempfile::tempdir().unwrap();
    let files = LogFiles::new(dir.path(), "txlog");
    let report = init_segment(&files, 3, 42, LogFormat::Compact).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["header"]["format"], "compact");
    assert_eq!(json["header"]["log_version"], 3);
    assert_eq!(json["header"]["last_committed_tx_id"], 42);
    assert_eq!(json["header"]["header_size"], 16);
    assert!(json["header"]["store_id"].is_null());
}

// =============================================================================
// SEGMENTS
// =============================================================================

#[test]
fn test_segments_lists_broken_entries() {
    let dir = tempfile::tempdir().unwrap();
    let files = LogFiles::new(dir.path(), "txlog");
    init_segment(&files, 0, 1, LogFormat::Compact).unwrap();
    init_segment(&files, 1, 5, LogFormat::StoreBound).unwrap();
    fs::write(files.path_for_version(2), [99u8, 0, 0, 0, 0, 0, 0, 0]).unwrap();
    fs::write(dir.path().join("README"), b"not a segment").unwrap();

    let reports = list_segments(&files, true).unwrap();
    let versions: Vec<u64> = reports.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![0, 1, 2]);

    assert_eq!(reports[0].header.as_ref().unwrap().format, LogFormat::Compact);
    assert_eq!(reports[1].header.as_ref().unwrap().last_committed_tx_id, 5);
    assert!(reports[2].header.is_none());
    assert!(reports[2].error.as_ref().unwrap().contains("99"));
}

#[test]
fn test_segments_of_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let files = LogFiles::new(dir.path().join("nothing-here"), "txlog");
    assert!(list_segments(&files, true).unwrap().is_empty());
}

// =============================================================================
// FOLLOW
// =============================================================================

#[test]
fn test_follow_crosses_segments() {
    let dir = tempfile::tempdir().unwrap();
    let files = LogFiles::new(dir.path(), "txlog");
    for (version, payload) in [(0u64, &b"abc"[..]), (1, b"defg"), (2, b"")] {
        let created = init_segment(&files, version, 1, LogFormat::Compact).unwrap();
        append(&created.path, payload);
    }

    let report = follow_segments(&files, 0).unwrap();
    assert_eq!(report.visited, vec![0, 1, 2]);
    assert_eq!(report.bytes_read, 7);
}

#[test]
fn test_follow_stops_at_partial_next_segment() {
    let dir = tempfile::tempdir().unwrap();
    let files = LogFiles::new(dir.path(), "txlog");
    let created = init_segment(&files, 5, 1, LogFormat::Compact).unwrap();
    append(&created.path, b"payload");
    fs::write(files.path_for_version(6), [6u8, 0, 0]).unwrap();

    let report = follow_segments(&files, 5).unwrap();
    assert_eq!(report.visited, vec![5]);
    assert_eq!(report.bytes_read, 7);
}

#[test]
fn test_follow_from_missing_version() {
    let dir = tempfile::tempdir().unwrap();
    let files = LogFiles::new(dir.path(), "txlog");
    assert!(matches!(
        follow_segments(&files, 0),
        Err(KestrelError::NoSuchLogFile(_))
    ));
}
