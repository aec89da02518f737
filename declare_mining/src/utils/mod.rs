//! Util module with smaller helper functions and structs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::ThreadPoolBuilder;
use tracing::warn;

/// Run `f` on a dedicated rayon pool with `num_threads` workers
///
/// With `None`, `f` runs on the global rayon pool. If the pool cannot be built, a warning is
/// logged and the global pool is used as well.
pub fn with_worker_pool<R, F>(num_threads: Option<usize>, f: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let Some(num_threads) = num_threads else {
        return f();
    };
    match ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("declare-worker-{i}"))
        .build()
    {
        Ok(pool) => pool.install(f),
        Err(e) => {
            warn!(num_threads, "Failed to build worker pool, using global pool: {e}");
            f()
        }
    }
}

/// Cooperative cancellation flag for long-running mining tasks
///
/// Clones share the same flag. Workers poll it between units of work, so cancellation
/// takes effect after the currently running checks finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new token (not cancelled)
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use rayon::prelude::*;

    use super::*;

    #[test]
    fn worker_pool_bounds_threads() {
        let n = with_worker_pool(Some(2), rayon::current_num_threads);
        assert_eq!(n, 2);
        let sum: u32 = with_worker_pool(Some(3), || (1..=10u32).into_par_iter().sum());
        assert_eq!(sum, 55);
        assert_eq!(with_worker_pool(None, || 7), 7);
    }

    #[test]
    fn cancellation_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
