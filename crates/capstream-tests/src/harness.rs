//! Shared helpers for the integration suites.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Install a fmt subscriber once for the whole test binary. Safe to call
/// from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Deterministic pseudo-random bytes.
pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// A capture excerpt in the shape sensors actually emit: one CSV-ish
/// sample per line, newline terminated.
pub fn sensor_capture(seed: u64, lines: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::new();
    for i in 0..lines {
        let sample = format!(
            "{},{:.3},{:.3},{:.3},{}\n",
            i,
            rng.gen_range(-16.0..16.0f64),
            rng.gen_range(-16.0..16.0f64),
            rng.gen_range(-16.0..16.0f64),
            rng.gen_range(0..4096u32),
        );
        out.extend_from_slice(sample.as_bytes());
    }
    out
}
