//! # Log Version Bridge
//!
//! Moves a reader from the segment it has exhausted to the next one.
//!
//! While the writer rotates, segment `N+1` may not exist yet, or may exist
//! with its header only partly written. Both mean "nothing more to read
//! right now": the bridge hands back the current segment untouched and the
//! reader retries later.

use super::files::{LogFiles, LogSegment};
use crate::KestrelError;
use std::io::{self, Read};

/// A readable log segment that knows its version.
pub trait VersionedChannel: Read {
    /// The segment's log version.
    fn version(&self) -> u64;

    /// Release the segment.
    fn close(self) -> Result<(), KestrelError>;
}

/// Opens segments by version.
pub trait SegmentSource {
    type Channel: VersionedChannel;

    /// Open the segment holding `version`, positioned after its header.
    ///
    /// Fails with `NoSuchLogFile` when it does not exist and with
    /// `IncompleteLogHeader` when its header is not fully written yet.
    fn open_for_version(&self, version: u64) -> Result<Self::Channel, KestrelError>;
}

impl VersionedChannel for LogSegment {
    fn version(&self) -> u64 {
        LogSegment::version(self)
    }

    fn close(self) -> Result<(), KestrelError> {
        tracing::debug!(path = %self.path().display(), "closed log segment");
        Ok(())
    }
}

impl SegmentSource for LogFiles {
    type Channel = LogSegment;

    fn open_for_version(&self, version: u64) -> Result<LogSegment, KestrelError> {
        LogFiles::open_for_version(self, version)
    }
}

/// Bridges to the segment with the next higher version.
#[derive(Debug, Clone)]
pub struct ReaderLogVersionBridge<S> {
    source: S,
}

impl<S: SegmentSource> ReaderLogVersionBridge<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The segment source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Switch from `channel` to the segment after it.
    ///
    /// Returns `channel` itself, still open, when the next segment is missing
    /// or its header is incomplete. Otherwise closes `channel` and returns
    /// the next segment.
    pub fn next(&self, channel: S::Channel) -> Result<S::Channel, KestrelError> {
        let current = channel.version();
        let Some(next_version) = current.checked_add(1) else {
            return Ok(channel);
        };
        match self.source.open_for_version(next_version) {
            Ok(next) => {
                channel.close()?;
                tracing::info!(from = current, to = next_version, "switched log segment");
                Ok(next)
            }
            Err(KestrelError::NoSuchLogFile(_) | KestrelError::IncompleteLogHeader { .. }) => {
                tracing::trace!(version = next_version, "next log segment not available yet");
                Ok(channel)
            }
            Err(e) => Err(e),
        }
    }
}

/// Reads the entries of consecutive segments as one stream.
///
/// At the end of a segment the reader bridges to the next one; when none is
/// available it reports end of stream, and a later read retries the bridge.
pub struct ChainedLogReader<S: SegmentSource> {
    bridge: ReaderLogVersionBridge<S>,
    current: Option<S::Channel>,
    visited: Vec<u64>,
}

impl<S: SegmentSource> std::fmt::Debug for ChainedLogReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedLogReader")
            .field("current_version", &self.current_version())
            .field("visited", &self.visited)
            .finish_non_exhaustive()
    }
}

impl<S: SegmentSource> ChainedLogReader<S> {
    /// Start reading at `start`.
    #[must_use]
    pub fn new(bridge: ReaderLogVersionBridge<S>, start: S::Channel) -> Self {
        let visited = vec![start.version()];
        Self {
            bridge,
            current: Some(start),
            visited,
        }
    }

    /// Version of the segment being read, if the reader still holds one.
    #[must_use]
    pub fn current_version(&self) -> Option<u64> {
        self.current.as_ref().map(VersionedChannel::version)
    }

    /// Versions of every segment read so far, in order.
    #[must_use]
    pub fn visited(&self) -> &[u64] {
        &self.visited
    }

    /// Close the current segment.
    pub fn close(mut self) -> Result<(), KestrelError> {
        match self.current.take() {
            Some(channel) => channel.close(),
            None => Ok(()),
        }
    }
}

impl<S: SegmentSource> Read for ChainedLogReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let Some(channel) = self.current.as_mut() else {
                return Ok(0);
            };
            let read = channel.read(buf)?;
            if read > 0 {
                return Ok(read);
            }

            let Some(exhausted) = self.current.take() else {
                return Ok(0);
            };
            let version = exhausted.version();
            let next = self.bridge.next(exhausted).map_err(io::Error::other)?;
            let moved = next.version() != version;
            if moved {
                self.visited.push(next.version());
            }
            self.current = Some(next);
            if !moved {
                return Ok(0);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
