//! Streaming multi-entry archive assembly.
//!
//! Each entry's compressed source is piped through a raw streaming
//! decompressor straight into the archive writer in bounded chunks, so no
//! entry is ever held in memory whole. Entries are processed strictly in
//! caller order; a failed entry is dropped from the archive and recorded
//! in the report while the rest of the batch proceeds.

use std::io::{Read, Seek, Write};

use capstream_codec::StreamingDecompressor;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ArchiveError, Result};

/// One requested archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Stable identifier used to fetch the compressed source.
    pub identifier: String,
    /// Name the entry gets inside the archive.
    pub display_name: String,
}

impl ArchiveEntry {
    /// Convenience constructor.
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
        }
    }
}

/// Provider of compressed byte streams, keyed by entry identifier.
pub trait EntrySource {
    /// Open the compressed stream for one entry.
    fn open(&self, identifier: &str) -> std::io::Result<Box<dyn Read + Send>>;
}

/// Configuration for archive assembly.
#[derive(Debug, Clone)]
pub struct AssembleConfig {
    /// Bytes read from a source per step (default 64 KiB).
    pub chunk_bytes: usize,
    /// Deflate level for archive entries (default 1; the payload was
    /// already compressed once upstream, heavy recompression buys little).
    pub deflate_level: i32,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: 64 * 1024,
            deflate_level: 1,
        }
    }
}

/// A single failed entry.
#[derive(Debug, Clone)]
pub struct EntryFailure {
    /// Identifier of the failed entry.
    pub identifier: String,
    /// Its requested archive name.
    pub display_name: String,
    /// Why it failed.
    pub error: String,
}

/// Outcome of one assembly run: "N of M succeeded".
#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    /// Entries requested.
    pub attempted: usize,
    /// Entries fully written to the archive.
    pub succeeded: usize,
    /// Decompressed bytes written across all successful entries.
    pub bytes_written: u64,
    /// Per-entry failure details.
    pub failures: Vec<EntryFailure>,
}

impl ArchiveReport {
    /// True when at least one entry failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Builds a multi-entry archive by streaming decompressed entry content
/// into a zip writer.
pub struct ArchiveAssembler {
    config: AssembleConfig,
}

impl Default for ArchiveAssembler {
    fn default() -> Self {
        Self::new(AssembleConfig::default())
    }
}

impl ArchiveAssembler {
    /// Create an assembler with the given configuration.
    pub fn new(config: AssembleConfig) -> Self {
        Self { config }
    }

    /// Assemble `entries` in order into `writer`, fetching each compressed
    /// source from `source`.
    ///
    /// Individual entry failures are isolated: the entry is aborted and
    /// recorded, and assembly continues. The archive is finalized exactly
    /// once, after the last entry.
    pub fn assemble<W: Write + Seek>(
        &self,
        source: &dyn EntrySource,
        entries: &[ArchiveEntry],
        writer: W,
    ) -> Result<ArchiveReport> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(self.config.deflate_level)))
            .large_file(true);

        let mut report = ArchiveReport {
            attempted: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            match self.write_entry(source, entry, &mut zip, options) {
                Ok(bytes) => {
                    report.succeeded += 1;
                    report.bytes_written += bytes;
                    debug!(
                        identifier = %entry.identifier,
                        name = %entry.display_name,
                        bytes,
                        "archive entry written"
                    );
                }
                Err(e) => {
                    warn!(
                        identifier = %entry.identifier,
                        name = %entry.display_name,
                        error = %e,
                        "archive entry failed, continuing with remaining entries"
                    );
                    report.failures.push(EntryFailure {
                        identifier: entry.identifier.clone(),
                        display_name: entry.display_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        zip.finish()?;
        debug!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            "archive finalized"
        );
        Ok(report)
    }

    fn write_entry<W: Write + Seek>(
        &self,
        source: &dyn EntrySource,
        entry: &ArchiveEntry,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<u64> {
        let mut stream =
            source
                .open(&entry.identifier)
                .map_err(|e| ArchiveError::SourceUnavailable {
                    identifier: entry.identifier.clone(),
                    message: e.to_string(),
                })?;

        zip.start_file(entry.display_name.clone(), options)?;

        let result = self.pipe_decompressed(&mut stream, zip);
        if result.is_err() {
            // Drop the half-written entry so a failure never leaves a
            // truncated file in the archive.
            zip.abort_file()?;
        }
        result
    }

    fn pipe_decompressed<W: Write + Seek>(
        &self,
        stream: &mut Box<dyn Read + Send>,
        zip: &mut ZipWriter<W>,
    ) -> Result<u64> {
        let mut decoder = StreamingDecompressor::new()?;
        let mut chunk = vec![0u8; self.config.chunk_bytes.max(1)];
        let mut written = 0u64;

        loop {
            let n = match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let out = decoder.push(&chunk[..n])?;
            zip.write_all(&out)?;
            written += out.len() as u64;
        }

        let tail = decoder.finish()?;
        zip.write_all(&tail)?;
        written += tail.len() as u64;
        Ok(written)
    }
}
