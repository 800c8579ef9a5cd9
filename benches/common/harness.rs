//! Benchmark harness utilities.
//!
//! Provides helpers for setting up Tokio runtimes for async benchmarks.

/// Create a multi-threaded Tokio runtime for async benchmarks.
pub fn bench_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime for benchmarks")
}

/// Standard directory sizes.
pub struct BenchSizes;

impl BenchSizes {
    /// Directory sizes used across ranking benchmarks.
    pub const DIRECTORIES: [usize; 4] = [2, 16, 128, 1_024];
}
