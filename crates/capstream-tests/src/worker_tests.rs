//! Worker correlation under concurrency and the protocol surface as a
//! coordinator front-end would drive it.

use std::sync::Arc;

use capstream_codec::hash_bytes;
use capstream_worker::{
    CodecWorker, WorkerActionKind, WorkerConfig, WorkerRequest, WorkerStatus,
};

use crate::harness::{random_bytes, sensor_capture};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_mixed_requests_resolve_to_their_own_callers() {
    let worker = Arc::new(CodecWorker::spawn(WorkerConfig::default()));

    let mut handles = Vec::new();
    for i in 0..24u64 {
        let worker = worker.clone();
        handles.push(tokio::spawn(async move {
            let payload = random_bytes(i, 2_000 + (i as usize) * 500);
            if i % 2 == 0 {
                // Hash path: compare against a locally computed digest.
                let digest = worker.compute_hash(payload.clone()).await.unwrap();
                assert_eq!(digest, hash_bytes(&payload), "request {i}");
            } else {
                // Compress path: the round-trip must land back on this
                // caller's payload, not anyone else's.
                let blob = worker.compress(payload.clone()).await.unwrap();
                let restored = worker.decompress(blob.data).await.unwrap();
                assert_eq!(restored, payload, "request {i}");
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(worker.pending_count(), 0);
    worker.terminate();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn protocol_round_trip_over_json() {
    let worker = CodecWorker::spawn(WorkerConfig::default());
    let capture = sensor_capture(99, 4_000);

    // Drive the worker exactly as a front-end would: serialize the request,
    // parse it back, dispatch, and inspect the serialized response.
    let raw = serde_json::to_string(&WorkerRequest {
        id: "export-1".into(),
        action: WorkerActionKind::Compress,
        payload: capture.clone(),
        frame_size: Some(16 * 1024),
        level: Some(3),
    })
    .unwrap();
    let request: WorkerRequest = serde_json::from_str(&raw).unwrap();

    let response = worker.dispatch(request).await;
    assert_eq!(response.id, "export-1");
    assert_eq!(response.status, WorkerStatus::Ok);
    let index = response.index.as_ref().unwrap();
    index.validate().unwrap();
    assert_eq!(index.original_size, capture.len() as u64);

    // The compressed payload goes back through the decompress action.
    let response = worker
        .dispatch(WorkerRequest {
            id: "export-2".into(),
            action: WorkerActionKind::Decompress,
            payload: response.data.unwrap(),
            frame_size: None,
            level: None,
        })
        .await;
    assert_eq!(response.id, "export-2");
    assert_eq!(response.data.unwrap(), capture);
    worker.terminate();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_stay_scoped_to_their_request() {
    let worker = Arc::new(CodecWorker::spawn(WorkerConfig::default()));

    let good = worker.clone();
    let good_payload = sensor_capture(1, 500);
    let good_task = tokio::spawn(async move {
        let blob = good.compress(good_payload.clone()).await.unwrap();
        (blob, good_payload)
    });

    // A corrupt decompress fails without disturbing the concurrent call.
    let response = worker
        .dispatch(WorkerRequest {
            id: "bad".into(),
            action: WorkerActionKind::Decompress,
            payload: b"not a zstd stream".to_vec(),
            frame_size: None,
            level: None,
        })
        .await;
    assert!(response.is_error());
    assert_eq!(response.id, "bad");

    let (blob, payload) = good_task.await.unwrap();
    assert_eq!(worker.decompress(blob.data).await.unwrap(), payload);
    worker.terminate();
}
