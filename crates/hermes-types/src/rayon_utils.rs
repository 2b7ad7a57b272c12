use tracing::debug;

/// Sizes the global rayon pool used for per-module scans. Calling this more
/// than once is harmless; the first initialization wins.
pub fn init_threadpools(num_threads: usize) {
    if let Err(err) = rayon::ThreadPoolBuilder::new().num_threads(num_threads).build_global() {
        debug!(%err, "global rayon pool was already initialized");
    }
}
