//! Bounded, chunked line buffer with warn/stop backpressure.
//!
//! Raw bytes are reassembled into discrete lines and stored in fixed-size
//! chunks under a hard global memory ceiling. Crossing the warning
//! threshold notifies the consumer once; reaching the ceiling pauses
//! ingestion entirely until `clear` or `resume`. The ceiling is hard: a
//! line that would push usage past it is rejected, so a runaway producer
//! can never grow the buffer without bound.

use capstream_codec::LineSplitter;
use tracing::{debug, warn};

use crate::chunk::{DataChunk, DataLine};

/// Capacity status of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum BufferStatus {
    /// Usage below the warning threshold.
    #[default]
    Normal,
    /// Usage at or above the warning threshold, below the ceiling.
    Warning,
    /// Ceiling reached; ingestion paused.
    Full,
}

/// Aggregated buffer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferState {
    /// Total lines currently held.
    pub total_lines: u64,
    /// Total line bytes currently held.
    pub total_bytes: u64,
    /// Capacity status.
    pub status: BufferStatus,
    /// True when ingestion is paused at the ceiling.
    pub paused: bool,
}

/// Configuration for the bounded line buffer.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Hard memory ceiling in bytes (default 256 MiB).
    pub max_total_bytes: u64,
    /// Warning threshold as a fraction of the ceiling (default 0.8).
    pub warn_ratio: f64,
    /// Bytes per chunk before the current chunk is sealed (default 1 MiB).
    pub chunk_bytes: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: 256 * 1024 * 1024,
            warn_ratio: 0.8,
            chunk_bytes: 1024 * 1024,
        }
    }
}

type StatusHook = Box<dyn Fn(BufferStatus) + Send>;

/// Size-bounded accumulation buffer for ingested lines.
///
/// Single-writer: all mutation happens inside one `append` call resolved to
/// completion before another is accepted.
pub struct BoundedLineBuffer {
    config: BufferConfig,
    chunks: Vec<DataChunk>,
    splitter: LineSplitter,
    next_index: u64,
    next_chunk_id: u32,
    total_bytes: u64,
    total_lines: u64,
    status: BufferStatus,
    paused: bool,
    status_hook: Option<StatusHook>,
}

impl BoundedLineBuffer {
    /// Create an empty buffer.
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            chunks: Vec::new(),
            splitter: LineSplitter::new(),
            next_index: 0,
            next_chunk_id: 0,
            total_bytes: 0,
            total_lines: 0,
            status: BufferStatus::Normal,
            paused: false,
            status_hook: None,
        }
    }

    /// Install a hook fired exactly once per upward status transition.
    pub fn set_status_hook(&mut self, hook: StatusHook) {
        self.status_hook = Some(hook);
    }

    /// Append raw bytes, returning the complete lines they produced.
    ///
    /// No-op returning `[]` while paused. Lines are accepted until one would
    /// push `total_bytes` past the ceiling; that line and the remainder of
    /// the call are dropped and the buffer transitions to `Full`/paused.
    pub fn append(&mut self, bytes: &[u8]) -> Vec<DataLine> {
        if self.paused {
            return Vec::new();
        }

        let timestamp_ms = now_ms();
        let mut accepted = Vec::new();
        for content in self.splitter.push(bytes) {
            // Terminator accounted as one byte.
            let raw_bytes = (content.len() + 1) as u32;
            if self.total_bytes + u64::from(raw_bytes) > self.config.max_total_bytes {
                self.enter_full();
                break;
            }

            let index = self.next_index;
            let chunk = self.current_chunk();
            let line = DataLine {
                index,
                timestamp_ms,
                content,
                raw_bytes,
                chunk_id: chunk.id,
            };
            chunk.push(line.clone());
            self.next_index += 1;
            self.total_lines += 1;
            self.total_bytes += u64::from(raw_bytes);
            accepted.push(line);

            self.evaluate_thresholds();
            if self.paused {
                break;
            }
        }
        accepted
    }

    /// Return lines with indices in `[start, end]`, in index order.
    ///
    /// Chunks entirely below `start` are skipped; the scan stops once a
    /// chunk starts past `end`.
    pub fn lines_in_range(&self, start: u64, end: u64) -> Vec<DataLine> {
        let mut out = Vec::new();
        for chunk in &self.chunks {
            if !chunk.lines.is_empty() && chunk.start_index > end {
                break;
            }
            if !chunk.overlaps(start, end) {
                continue;
            }
            out.extend(
                chunk
                    .lines
                    .iter()
                    .filter(|line| line.index >= start && line.index <= end)
                    .cloned(),
            );
        }
        out
    }

    /// Drop all chunks and reset counters, status, and pause.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.splitter = LineSplitter::new();
        self.total_bytes = 0;
        self.total_lines = 0;
        self.status = BufferStatus::Normal;
        self.paused = false;
        debug!("buffer cleared");
    }

    /// Re-enable ingestion if usage is below the stop threshold.
    pub fn resume(&mut self) {
        if self.total_bytes >= self.config.max_total_bytes {
            return;
        }
        self.paused = false;
        self.status = if self.usage() >= self.config.warn_ratio {
            BufferStatus::Warning
        } else {
            BufferStatus::Normal
        };
        debug!(status = ?self.status, "buffer resumed");
    }

    /// Current aggregated state.
    pub fn state(&self) -> BufferState {
        BufferState {
            total_lines: self.total_lines,
            total_bytes: self.total_bytes,
            status: self.status,
            paused: self.paused,
        }
    }

    /// Usage as a fraction of the ceiling.
    pub fn usage(&self) -> f64 {
        if self.config.max_total_bytes == 0 {
            return 1.0;
        }
        self.total_bytes as f64 / self.config.max_total_bytes as f64
    }

    /// Number of chunks currently held.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn current_chunk(&mut self) -> &mut DataChunk {
        let needs_new = match self.chunks.last() {
            Some(chunk) => chunk.size_bytes >= self.config.chunk_bytes,
            None => true,
        };
        if needs_new {
            let chunk = DataChunk::new(self.next_chunk_id, self.next_index);
            self.next_chunk_id += 1;
            self.chunks.push(chunk);
        }
        self.chunks.last_mut().expect("chunk just ensured")
    }

    fn evaluate_thresholds(&mut self) {
        let usage = self.usage();
        if self.status == BufferStatus::Normal && usage >= self.config.warn_ratio {
            self.status = BufferStatus::Warning;
            debug!(
                total_bytes = self.total_bytes,
                ceiling = self.config.max_total_bytes,
                "buffer crossed warning threshold"
            );
            self.notify(BufferStatus::Warning);
        }
        if self.status == BufferStatus::Warning && usage >= 1.0 {
            self.enter_full();
        }
    }

    fn enter_full(&mut self) {
        if self.status == BufferStatus::Normal {
            // One append can cross both thresholds; warning still fires first.
            self.status = BufferStatus::Warning;
            self.notify(BufferStatus::Warning);
        }
        if self.status != BufferStatus::Full {
            self.status = BufferStatus::Full;
            warn!(
                total_bytes = self.total_bytes,
                ceiling = self.config.max_total_bytes,
                "buffer full, ingestion paused"
            );
            self.notify(BufferStatus::Full);
        }
        self.paused = true;
    }

    fn notify(&self, status: BufferStatus) {
        if let Some(hook) = &self.status_hook {
            hook(status);
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
