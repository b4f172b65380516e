//! # Log Files
//!
//! A transaction log is a directory of segments named `<prefix>.<version>`,
//! each starting with a log header.

use super::header::{LogHeader, read_log_header, write_log_header};
use crate::config::KernelConfig;
use crate::primitives::MAX_LOG_HEADER_SIZE;
use crate::KestrelError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// The segments of one transaction log.
#[derive(Debug, Clone)]
pub struct LogFiles {
    directory: PathBuf,
    prefix: String,
}

impl LogFiles {
    /// Segments named `<prefix>.<version>` under `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    /// The log configured by `config`.
    #[must_use]
    pub fn from_config(config: &KernelConfig) -> Self {
        Self::new(config.log_directory.clone(), config.log_file_prefix.clone())
    }

    /// The log directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The segment file name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Path of the segment holding `version`.
    #[must_use]
    pub fn path_for_version(&self, version: u64) -> PathBuf {
        self.directory.join(format!("{}.{version}", self.prefix))
    }

    /// The version encoded in a segment file name, if it is one of ours.
    #[must_use]
    pub fn version_of(&self, path: &Path) -> Option<u64> {
        let name = path.file_name()?.to_str()?;
        let suffix = name.strip_prefix(&self.prefix)?.strip_prefix('.')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    /// Versions of all segments present, ascending. A missing directory
    /// holds no segments.
    pub fn versions(&self) -> Result<Vec<u64>, KestrelError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && let Some(version) = self.version_of(&entry.path())
            {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Highest segment version present.
    pub fn highest_version(&self) -> Result<Option<u64>, KestrelError> {
        Ok(self.versions()?.last().copied())
    }

    /// Create the segment for `header.log_version` and write its header.
    ///
    /// Fails if the segment already exists.
    pub fn create_segment(&self, header: &LogHeader) -> Result<PathBuf, KestrelError> {
        fs::create_dir_all(&self.directory)?;
        let path = self.path_for_version(header.log_version);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        write_log_header(&mut file, header)?;
        file.sync_all()?;
        tracing::info!(
            path = %path.display(),
            version = header.log_version,
            format = ?header.format,
            "created log segment"
        );
        Ok(path)
    }

    /// Decode the header of the segment holding `version`.
    pub fn read_header(
        &self,
        version: u64,
        strict: bool,
    ) -> Result<Option<LogHeader>, KestrelError> {
        let path = self.path_for_version(version);
        let mut file = open_existing(&path)?;
        read_log_header(&mut file, strict, Some(&path))
    }

    /// Open the segment holding `version`, positioned after its header.
    ///
    /// A segment whose header was never written counts as incomplete; a
    /// header naming another version is corrupt.
    pub fn open_for_version(&self, version: u64) -> Result<LogSegment, KestrelError> {
        let path = self.path_for_version(version);
        let mut reader = BufReader::new(open_existing(&path)?);
        let header = read_log_header(&mut reader, true, Some(&path))?.ok_or_else(|| {
            KestrelError::IncompleteLogHeader {
                path: Some(path.clone()),
                read: 0,
                expected: MAX_LOG_HEADER_SIZE,
            }
        })?;
        if header.log_version != version {
            return Err(KestrelError::CorruptLogHeader(format!(
                "{} holds log version {}, expected {version}",
                path.display(),
                header.log_version
            )));
        }
        tracing::debug!(path = %path.display(), version, "opened log segment");
        Ok(LogSegment {
            version,
            path,
            header,
            reader,
        })
    }
}

fn open_existing(path: &Path) -> Result<File, KestrelError> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => KestrelError::NoSuchLogFile(path.to_path_buf()),
        _ => KestrelError::Io(e),
    })
}

/// An open segment, reading the entries after its header.
#[derive(Debug)]
pub struct LogSegment {
    version: u64,
    path: PathBuf,
    header: LogHeader,
    reader: BufReader<File>,
}

impl LogSegment {
    /// The segment's log version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The segment file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The decoded header.
    #[must_use]
    pub fn header(&self) -> &LogHeader {
        &self.header
    }
}

impl Read for LogSegment {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}
