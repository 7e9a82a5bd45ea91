use std::thread;

use crate::runtime::core::{Flavor, Runtime};

/// Default cap on blocking-pool threads.
const DEFAULT_BLOCKING_LIMIT: usize = 500;

/// Builder for configuring and creating a [`Runtime`].
///
/// Two flavors are available. The multi-thread flavor (the default) runs
/// tasks on a work-stealing worker pool; the inline flavor runs
/// everything cooperatively on the thread that calls `block_on`.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(4)
///     .build();
///
/// let single = RuntimeBuilder::inline().build();
/// ```
pub struct RuntimeBuilder {
    flavor: Flavor,
    worker_threads: usize,
    max_blocking_threads: usize,
}

impl RuntimeBuilder {
    /// Creates a builder for the multi-thread flavor.
    ///
    /// Worker threads default to the number of available logical CPUs,
    /// falling back to `1` if that cannot be determined.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            flavor: Flavor::MultiThread,
            worker_threads,
            max_blocking_threads: DEFAULT_BLOCKING_LIMIT,
        }
    }

    /// Creates a builder for the inline (single-threaded) flavor.
    pub fn inline() -> Self {
        Self {
            flavor: Flavor::Inline,
            ..Self::new()
        }
    }

    /// Sets the number of worker threads. Ignored by the inline flavor.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Caps the blocking pool. The pool starts empty and grows on
    /// demand; this bounds how far.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn max_blocking_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "max_blocking_threads must be > 0");

        self.max_blocking_threads = n;
        self
    }

    /// Builds the runtime: creates the reactor and, for the multi-thread
    /// flavor, starts the worker pool.
    ///
    /// # Panics
    ///
    /// Panics if the OS poller cannot be created.
    pub fn build(self) -> Runtime {
        Runtime::new(self.flavor, self.worker_threads, self.max_blocking_threads)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
