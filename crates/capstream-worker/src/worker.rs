//! Codec worker with correlation-id request matching.
//!
//! The worker owns a command channel and a map from correlation id to the
//! caller's pending completion. Responses resolve their own caller even
//! when they finish out of order, so several requests can be in flight on
//! one worker without head-of-line blocking. Heavy codec work runs on the
//! blocking pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use capstream_codec::{
    compress_framed, hash_bytes, CompressConfig, ContentDigest, FramedBlob, StreamingDecompressor,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Result, WorkerError};
use crate::protocol::{WorkerActionKind, WorkerRequest, WorkerResponse};

/// Configuration for the codec worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Command channel depth (default 32).
    pub queue_depth: usize,
    /// Frame encoding defaults used when a request carries no overrides.
    pub compress: CompressConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_depth: 32,
            compress: CompressConfig::default(),
        }
    }
}

/// A codec job, decoded from the protocol once at the boundary.
#[derive(Debug)]
enum Job {
    ComputeHash { payload: Vec<u8> },
    Compress { payload: Vec<u8>, config: CompressConfig },
    Decompress { payload: Vec<u8> },
}

/// Typed job output.
#[derive(Debug)]
enum JobOutput {
    Digest(ContentDigest),
    Framed(FramedBlob),
    Bytes(Vec<u8>),
}

struct Command {
    id: u64,
    job: Job,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<JobOutput>>>>>;

/// Owns the worker task, the command channel, and the pending-request map.
///
/// `terminate` closes the channel and rejects every outstanding request
/// with [`WorkerError::Terminated`].
pub struct CodecWorker {
    tx: mpsc::Sender<Command>,
    pending: PendingMap,
    next_id: AtomicU64,
    config: WorkerConfig,
    terminated: AtomicBool,
    task: tokio::task::JoinHandle<()>,
}

impl CodecWorker {
    /// Spawn a worker task.
    pub fn spawn(config: WorkerConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(config.queue_depth.max(1));
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let task_pending = pending.clone();
        let task = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                let pending = task_pending.clone();
                // One task per command: completions resolve out of order.
                tokio::spawn(async move {
                    let id = command.id;
                    let outcome = tokio::task::spawn_blocking(move || run_job(command.job)).await;
                    let result = match outcome {
                        Ok(result) => result,
                        Err(join_error) => {
                            warn!(id, error = %join_error, "codec job panicked");
                            Err(WorkerError::JobFailed(join_error.to_string()))
                        }
                    };
                    let sender = pending.lock().unwrap().remove(&id);
                    if let Some(sender) = sender {
                        let _ = sender.send(result);
                    }
                });
            }
            debug!("codec worker command channel closed");
        });

        Self {
            tx,
            pending,
            next_id: AtomicU64::new(1),
            config,
            terminated: AtomicBool::new(false),
            task,
        }
    }

    /// Compute the content digest of `payload`.
    pub async fn compute_hash(&self, payload: Vec<u8>) -> Result<ContentDigest> {
        match self.call(Job::ComputeHash { payload }).await? {
            JobOutput::Digest(digest) => Ok(digest),
            other => Err(unexpected(other)),
        }
    }

    /// Encode `payload` into the framed format.
    pub async fn compress(&self, payload: Vec<u8>) -> Result<FramedBlob> {
        let config = self.config.compress.clone();
        match self.call(Job::Compress { payload, config }).await? {
            JobOutput::Framed(blob) => Ok(blob),
            other => Err(unexpected(other)),
        }
    }

    /// Streaming-decompress `payload` back to the original bytes.
    pub async fn decompress(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        match self.call(Job::Decompress { payload }).await? {
            JobOutput::Bytes(bytes) => Ok(bytes),
            other => Err(unexpected(other)),
        }
    }

    /// Execute a protocol-level request, producing the matching response.
    pub async fn dispatch(&self, request: WorkerRequest) -> WorkerResponse {
        let id = request.id.clone();
        match request.action {
            WorkerActionKind::ComputeHash => match self.compute_hash(request.payload).await {
                Ok(digest) => {
                    let mut response = WorkerResponse::ok(id);
                    response.digest = Some(digest.to_hex());
                    response
                }
                Err(e) => WorkerResponse::error(id, e.to_string()),
            },
            WorkerActionKind::Compress => {
                let config = CompressConfig {
                    frame_size: request
                        .frame_size
                        .map(|s| s as usize)
                        .unwrap_or(self.config.compress.frame_size),
                    level: request.level.unwrap_or(self.config.compress.level),
                };
                match self.call(Job::Compress { payload: request.payload, config }).await {
                    Ok(JobOutput::Framed(blob)) => {
                        let mut response = WorkerResponse::ok(id);
                        response.data = Some(blob.data);
                        response.index = Some(blob.index);
                        response
                    }
                    Ok(other) => WorkerResponse::error(id, unexpected(other).to_string()),
                    Err(e) => WorkerResponse::error(id, e.to_string()),
                }
            }
            WorkerActionKind::Decompress => match self.decompress(request.payload).await {
                Ok(bytes) => {
                    let mut response = WorkerResponse::ok(id);
                    response.data = Some(bytes);
                    response
                }
                Err(e) => WorkerResponse::error(id, e.to_string()),
            },
        }
    }

    /// Number of requests currently awaiting completion.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Shut the worker down, rejecting all outstanding requests. Later
    /// calls fail immediately with [`WorkerError::Terminated`].
    pub fn terminate(&self) {
        // Flag and drain happen under the pending lock so no call can slip
        // its completion in after the drain; such a call would never resolve.
        let drained: Vec<_> = {
            let mut map = self.pending.lock().unwrap();
            self.terminated.store(true, Ordering::SeqCst);
            map.drain().collect()
        };
        let outstanding = drained.len();
        for (_, sender) in drained {
            let _ = sender.send(Err(WorkerError::Terminated));
        }
        self.task.abort();
        debug!(outstanding, "codec worker terminated");
    }

    async fn call(&self, job: Job) -> Result<JobOutput> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (completion_tx, completion_rx) = oneshot::channel();
        {
            // Checked under the same lock terminate drains with, so the
            // entry is either registered before the drain or rejected here.
            let mut pending = self.pending.lock().unwrap();
            if self.terminated.load(Ordering::SeqCst) {
                return Err(WorkerError::Terminated);
            }
            pending.insert(id, completion_tx);
        }

        if self.tx.send(Command { id, job }).await.is_err() {
            self.pending.lock().unwrap().remove(&id);
            return Err(WorkerError::Terminated);
        }

        match completion_rx.await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Terminated),
        }
    }
}

fn run_job(job: Job) -> Result<JobOutput> {
    match job {
        Job::ComputeHash { payload } => Ok(JobOutput::Digest(hash_bytes(&payload))),
        Job::Compress { payload, config } => {
            let blob = compress_framed(&payload[..], &config)?;
            Ok(JobOutput::Framed(blob))
        }
        Job::Decompress { payload } => {
            let mut decoder = StreamingDecompressor::new()?;
            let mut out = decoder.push(&payload)?;
            out.extend(decoder.finish()?);
            Ok(JobOutput::Bytes(out))
        }
    }
}

fn unexpected(output: JobOutput) -> WorkerError {
    WorkerError::JobFailed(format!("unexpected job output: {output:?}"))
}
