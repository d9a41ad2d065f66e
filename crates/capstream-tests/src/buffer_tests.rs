//! Buffer backpressure and chunking behavior under realistic load.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use capstream_buffer::{BoundedLineBuffer, BufferConfig, BufferStatus};
use proptest::prelude::*;

use crate::harness::sensor_capture;

fn buffer_with(ceiling: u64) -> BoundedLineBuffer {
    BoundedLineBuffer::new(BufferConfig {
        max_total_bytes: ceiling,
        warn_ratio: 0.8,
        chunk_bytes: 4 * 1024,
    })
}

#[test]
fn capture_lines_arrive_intact_and_indexed() {
    let capture = sensor_capture(19, 3_000);
    let expected: Vec<&str> = std::str::from_utf8(&capture).unwrap().lines().collect();

    let mut buffer = buffer_with(64 * 1024 * 1024);
    let mut got = Vec::new();
    for piece in capture.chunks(777) {
        got.extend(buffer.append(piece));
    }

    assert_eq!(got.len(), expected.len());
    for (i, (line, want)) in got.iter().zip(&expected).collect::<Vec<_>>().into_iter().enumerate() {
        assert_eq!(line.index, i as u64);
        assert_eq!(line.content, *want);
    }
    assert!(buffer.chunk_count() > 1);
}

#[test]
fn range_reads_span_chunk_boundaries() {
    let capture = sensor_capture(23, 2_000);
    let mut buffer = buffer_with(64 * 1024 * 1024);
    for piece in capture.chunks(1024) {
        buffer.append(piece);
    }

    let slice = buffer.lines_in_range(500, 1499);
    assert_eq!(slice.len(), 1000);
    assert_eq!(slice[0].index, 500);
    assert_eq!(slice[999].index, 1499);
    assert!(slice.windows(2).all(|w| w[0].index + 1 == w[1].index));
}

#[test]
fn sustained_overload_warns_once_then_pauses() {
    // 25 MiB ceiling, three 10 MiB pushes of sensor-shaped lines.
    let notices = Arc::new(AtomicU32::new(0));
    let mut buffer = BoundedLineBuffer::new(BufferConfig {
        max_total_bytes: 25 * 1024 * 1024,
        warn_ratio: 0.8,
        chunk_bytes: 1024 * 1024,
    });
    {
        let notices = notices.clone();
        buffer.set_status_hook(Box::new(move |_| {
            notices.fetch_add(1, Ordering::SeqCst);
        }));
    }

    let mut line = vec![b'z'; 31];
    line.push(b'\n');
    let push = line.repeat(10 * 1024 * 1024 / 32);

    buffer.append(&push);
    assert_eq!(buffer.state().status, BufferStatus::Normal);

    buffer.append(&push);
    assert_eq!(buffer.state().status, BufferStatus::Warning);

    buffer.append(&push);
    let state = buffer.state();
    assert_eq!(state.status, BufferStatus::Full);
    assert!(state.paused);
    assert!(state.total_bytes <= 25 * 1024 * 1024);
    // One Warning notice, one Full notice.
    assert_eq!(notices.load(Ordering::SeqCst), 2);

    // Paused buffer drops input without growing.
    let before = buffer.state().total_bytes;
    assert!(buffer.append(&push).is_empty());
    assert_eq!(buffer.state().total_bytes, before);
}

#[test]
fn clear_recovers_a_full_buffer() {
    let mut buffer = buffer_with(10_000);
    for _ in 0..200 {
        buffer.append(&[b'x'; 100]);
        buffer.append(b"\n");
    }
    assert!(buffer.state().paused);

    buffer.clear();
    let lines = buffer.append(b"fresh start\n");
    assert_eq!(lines.len(), 1);
    assert_eq!(buffer.state().status, BufferStatus::Normal);
}

proptest! {
    // Line reassembly must not depend on how the byte stream is cut up.
    #[test]
    fn prop_chunking_does_not_change_lines(
        text in "([a-z0-9,\\.]{0,40}\n){0,50}",
        cut in 1usize..64,
    ) {
        let bytes = text.as_bytes();

        let mut whole = buffer_with(1 << 20);
        let all_at_once: Vec<String> =
            whole.append(bytes).into_iter().map(|l| l.content).collect();

        let mut pieces = buffer_with(1 << 20);
        let mut piecewise = Vec::new();
        for piece in bytes.chunks(cut) {
            piecewise.extend(pieces.append(piece).into_iter().map(|l| l.content));
        }

        prop_assert_eq!(all_at_once, piecewise);
        prop_assert_eq!(whole.state().total_bytes, pieces.state().total_bytes);
    }
}
