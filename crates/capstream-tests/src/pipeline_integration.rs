//! End-to-end pipeline: live stream ingestion through buffering,
//! compression, caching, and batch export.

use std::collections::VecDeque;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use capstream_archive::{ArchiveAssembler, ArchiveEntry, EntrySource};
use capstream_buffer::{BoundedLineBuffer, BufferConfig};
use capstream_cache::{CacheConfig, CacheRecord, ContentCache};
use capstream_codec::hash_bytes;
use capstream_ingest::{
    spawn, BoxFuture, IngestConfig, IngestEvent, LinkFault, StreamReader, StreamTransport,
};
use capstream_worker::{CodecWorker, WorkerConfig};

use crate::harness::{init_tracing, sensor_capture};

struct ReplayTransport {
    chunks: Arc<Mutex<VecDeque<Bytes>>>,
}

impl ReplayTransport {
    fn new(payload: &[u8], chunk: usize) -> Arc<Self> {
        let chunks = payload
            .chunks(chunk)
            .map(Bytes::copy_from_slice)
            .collect::<VecDeque<_>>();
        Arc::new(Self {
            chunks: Arc::new(Mutex::new(chunks)),
        })
    }
}

struct ReplayReader {
    chunks: Arc<Mutex<VecDeque<Bytes>>>,
}

impl StreamReader for ReplayReader {
    fn next_chunk(&mut self) -> BoxFuture<'_, std::result::Result<Option<Bytes>, LinkFault>> {
        Box::pin(async move { Ok(self.chunks.lock().unwrap().pop_front()) })
    }

    fn cancel(&mut self) {}
}

impl StreamTransport for ReplayTransport {
    fn acquire_reader(
        &self,
    ) -> BoxFuture<'_, std::result::Result<Box<dyn StreamReader>, LinkFault>> {
        let chunks = self.chunks.clone();
        Box::pin(async move { Ok(Box::new(ReplayReader { chunks }) as Box<dyn StreamReader>) })
    }
}

/// Cache fronted as an archive entry source.
struct CachedBlobs {
    cache: Mutex<ContentCache>,
}

impl EntrySource for CachedBlobs {
    fn open(&self, identifier: &str) -> std::io::Result<Box<dyn Read + Send>> {
        match self.cache.lock().unwrap().get(identifier) {
            Some(record) => Ok(Box::new(Cursor::new(record.data))),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{identifier} not cached"),
            )),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn capture_flows_from_stream_to_exported_archive() -> Result<()> {
    init_tracing();
    let capture = sensor_capture(77, 10_000);

    // 1. Ingest the live stream in transport-sized chunks.
    let transport = ReplayTransport::new(&capture, 900);
    let mut handle = spawn(
        transport,
        IngestConfig {
            flush_interval: Duration::from_millis(10),
            max_batch_lines: 256,
            ..IngestConfig::default()
        },
    );

    // 2. Accumulate batches into the bounded buffer.
    let mut buffer = BoundedLineBuffer::new(BufferConfig::default());
    while let Some(event) = handle.next_event().await {
        match event {
            IngestEvent::LineBatch(lines) => {
                for line in lines {
                    let accepted = buffer.append(format!("{line}\n").as_bytes());
                    assert_eq!(accepted.len(), 1);
                }
            }
            IngestEvent::Stopped => break,
            other => panic!("unexpected event: {other:?}"),
        }
    }
    handle.join().await;

    let state = buffer.state();
    assert_eq!(state.total_bytes, capture.len() as u64);
    assert!(!state.paused);

    // 3. Reassemble the session content and compress it on the worker.
    let session: Vec<u8> = buffer
        .lines_in_range(0, state.total_lines - 1)
        .into_iter()
        .flat_map(|line| {
            let mut bytes = line.content.into_bytes();
            bytes.push(b'\n');
            bytes
        })
        .collect();
    assert_eq!(session, capture);

    let worker = CodecWorker::spawn(WorkerConfig::default());
    let digest = worker.compute_hash(session.clone()).await?;
    assert_eq!(digest, hash_bytes(&capture));
    let blob = worker.compress(session.clone()).await?;
    blob.index.validate()?;
    worker.terminate();

    // 4. Persist the compressed session, then export it as an archive.
    let dir = tempfile::tempdir()?;
    let mut cache = ContentCache::open(CacheConfig::new(dir.path().join("cache")))?;
    cache.insert(CacheRecord {
        file_id: "session-77".into(),
        filename: "session-77.cap".into(),
        original_size: session.len() as u64,
        compressed_size: blob.data.len() as u64,
        data: blob.data,
        cached_at_ms: 0,
    })?;

    let source = CachedBlobs {
        cache: Mutex::new(cache),
    };
    let archive_path = dir.path().join("export.zip");
    let report = ArchiveAssembler::default().assemble(
        &source,
        &[ArchiveEntry::new("session-77", "session-77.txt")],
        std::fs::File::create(&archive_path)?,
    )?;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.bytes_written, capture.len() as u64);

    // 5. The exported entry is the original capture, byte for byte.
    let mut archive = zip::ZipArchive::new(std::fs::File::open(&archive_path)?)?;
    let mut entry = archive.by_name("session-77.txt")?;
    let mut exported = Vec::new();
    entry.read_to_end(&mut exported)?;
    assert_eq!(exported, capture);
    Ok(())
}
