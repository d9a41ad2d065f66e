//! Off-thread ingestion loop.
//!
//! The worker owns the live stream's reader exclusively and runs isolated
//! from the consumer, so a slow consumer can never cause transport-level
//! buffer overruns. Decoded lines are delivered in batches: per-line
//! delivery would drown the consumer in message overhead proportional to
//! line count, so the pending queue is flushed when a fixed interval
//! elapses or it reaches the batch ceiling, whichever comes first, and at
//! most once per tick.

use std::sync::Arc;
use std::time::Duration;

use capstream_codec::LineSplitter;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::transport::{LinkFault, StreamReader, StreamTransport};

/// Configuration for the ingest worker.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Flush the pending queue after this long (default 100 ms).
    pub flush_interval: Duration,
    /// Flush the pending queue at this many lines (default 200).
    pub max_batch_lines: usize,
    /// Delay before reacquiring a reader after a transient fault (default 200 ms).
    pub reacquire_delay: Duration,
    /// Pause after an unclassified fault before retrying (default 500 ms).
    pub error_pause: Duration,
    /// After the first transient fault, log only every Nth (default 10).
    pub transient_log_every: u32,
    /// Event channel depth (default 64).
    pub event_queue_depth: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(100),
            max_batch_lines: 200,
            reacquire_delay: Duration::from_millis(200),
            error_pause: Duration::from_millis(500),
            transient_log_every: 10,
            event_queue_depth: 64,
        }
    }
}

/// Events delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// A batch of complete decoded lines, in arrival order.
    LineBatch(Vec<String>),
    /// The physical link is gone; the worker will not retry.
    DeviceLost,
    /// An unclassified fault; the worker pauses briefly and retries.
    Fault(String),
    /// The loop has exited; no further events follow.
    Stopped,
}

/// Handle to a running ingest worker.
pub struct IngestHandle {
    events: mpsc::Receiver<IngestEvent>,
    stop: Arc<Notify>,
    task: tokio::task::JoinHandle<()>,
}

impl IngestHandle {
    /// Receive the next event; `None` once the worker has shut down and the
    /// channel is drained.
    pub async fn next_event(&mut self) -> Option<IngestEvent> {
        self.events.recv().await
    }

    /// Request a clean stop. The current read is cancelled and the loop
    /// exits without reacquiring a reader.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    /// Wait for the worker task to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Spawn the ingest worker over the given transport.
pub fn spawn(transport: Arc<dyn StreamTransport>, config: IngestConfig) -> IngestHandle {
    let (event_tx, events) = mpsc::channel(config.event_queue_depth.max(1));
    let stop = Arc::new(Notify::new());
    let task = tokio::spawn(run_loop(transport, config, event_tx, stop.clone()));
    IngestHandle { events, stop, task }
}

async fn run_loop(
    transport: Arc<dyn StreamTransport>,
    config: IngestConfig,
    events: mpsc::Sender<IngestEvent>,
    stop: Arc<Notify>,
) {
    let mut splitter = LineSplitter::new();
    let mut pending: Vec<String> = Vec::new();
    let mut transient_streak: u32 = 0;

    'acquire: loop {
        let mut reader = tokio::select! {
            _ = stop.notified() => break 'acquire,
            acquired = transport.acquire_reader() => match acquired {
                Ok(reader) => reader,
                Err(fault) => {
                    if !handle_fault(
                        &fault, &mut transient_streak, &config, &events, None,
                    )
                    .await
                    {
                        break 'acquire;
                    }
                    continue 'acquire;
                }
            },
        };
        debug!("reader acquired");

        let mut flush_tick = tokio::time::interval(config.flush_interval);
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        flush_tick.reset();

        // The reader is dropped on every exit path of this loop before a
        // new one is acquired.
        loop {
            tokio::select! {
                _ = stop.notified() => {
                    reader.cancel();
                    break 'acquire;
                }
                _ = flush_tick.tick() => {
                    if !flush(&mut pending, &events).await {
                        break 'acquire;
                    }
                }
                chunk = reader.next_chunk() => match chunk {
                    Ok(Some(bytes)) => {
                        transient_streak = 0;
                        pending.extend(splitter.push(&bytes));
                        if pending.len() >= config.max_batch_lines {
                            if !flush(&mut pending, &events).await {
                                break 'acquire;
                            }
                            // At most one flush per tick: a count-triggered
                            // flush rearms the timer.
                            flush_tick.reset();
                        }
                    }
                    Ok(None) => {
                        info!("stream ended");
                        break 'acquire;
                    }
                    Err(fault) => {
                        if !handle_fault(
                            &fault,
                            &mut transient_streak,
                            &config,
                            &events,
                            Some(&mut reader),
                        )
                        .await
                        {
                            break 'acquire;
                        }
                        continue 'acquire;
                    }
                },
            }
        }
    }

    pending.extend(splitter.finish());
    let _ = flush(&mut pending, &events).await;
    let _ = events.send(IngestEvent::Stopped).await;
    debug!("ingest loop stopped");
}

/// React to a fault. Returns `false` when the loop must exit.
async fn handle_fault(
    fault: &LinkFault,
    transient_streak: &mut u32,
    config: &IngestConfig,
    events: &mpsc::Sender<IngestEvent>,
    reader: Option<&mut Box<dyn StreamReader>>,
) -> bool {
    if let Some(reader) = reader {
        reader.cancel();
    }
    match fault {
        fault if fault.is_transient() => {
            *transient_streak += 1;
            // First occurrence, then every Nth: recurring line noise must
            // stay visible without flooding the log.
            let every = config.transient_log_every.max(1);
            if *transient_streak == 1 || *transient_streak % every == 0 {
                warn!(%fault, streak = *transient_streak, "transient link fault, reacquiring");
            }
            tokio::time::sleep(config.reacquire_delay).await;
            true
        }
        LinkFault::Cancelled => {
            debug!("read cancelled, exiting");
            false
        }
        LinkFault::DeviceLost => {
            warn!("device disconnected, giving up");
            let _ = events.send(IngestEvent::DeviceLost).await;
            false
        }
        other => {
            warn!(fault = %other, "unclassified link fault, pausing before retry");
            if events
                .send(IngestEvent::Fault(other.to_string()))
                .await
                .is_err()
            {
                return false;
            }
            tokio::time::sleep(config.error_pause).await;
            true
        }
    }
}

/// Deliver the pending queue as one batch. Returns `false` if the consumer
/// is gone.
async fn flush(pending: &mut Vec<String>, events: &mpsc::Sender<IngestEvent>) -> bool {
    if pending.is_empty() {
        return true;
    }
    let batch = std::mem::take(pending);
    events.send(IngestEvent::LineBatch(batch)).await.is_ok()
}
