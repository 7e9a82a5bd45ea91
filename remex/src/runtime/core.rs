use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::reactor::Reactor;
use crate::runtime::executor::{Executor, InlineExecutor, MultiThreadExecutor};
use crate::runtime::task::{spawn_with, JoinHandle};

/// Which executor flavor a runtime drives.
pub(crate) enum Flavor {
    Inline,
    MultiThread,
}

enum Flavored {
    Inline(Arc<InlineExecutor>),
    MultiThread(Arc<MultiThreadExecutor>),
}

/// A binding of one executor instance to one reactor instance.
///
/// The runtime is the entry point of the crate: build one with
/// [`RuntimeBuilder`](crate::RuntimeBuilder), submit a top-level future
/// through [`block_on`](Self::block_on), and spawn concurrent work from
/// inside it. Tasks reach their runtime through a context installed
/// while they run, so several runtimes can coexist in one process
/// without interfering.
///
/// Dropping the runtime stops its worker threads.
pub struct Runtime {
    executor: Flavored,
}

impl Runtime {
    pub(crate) fn new(flavor: Flavor, worker_threads: usize, blocking_limit: usize) -> Self {
        let reactor = Arc::new(Reactor::new().expect("failed to create reactor"));

        let executor = match flavor {
            Flavor::Inline => {
                let executor = Arc::new(InlineExecutor::new(reactor.clone(), blocking_limit));
                Flavored::Inline(executor)
            }
            Flavor::MultiThread => {
                let executor = Arc::new(MultiThreadExecutor::new(
                    reactor.clone(),
                    worker_threads,
                    blocking_limit,
                ));
                executor.start();
                Flavored::MultiThread(executor)
            }
        };

        tracing::debug!(workers = worker_threads, "runtime created");

        Self { executor }
    }

    /// Spawns a future onto this runtime without waiting for it.
    ///
    /// Tasks spawned before `block_on` start running immediately on the
    /// multi-thread flavor and are queued until the drive loop runs on
    /// the inline flavor. `block_on` does not return while any spawned
    /// task is live.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let executor: Arc<dyn Executor> = match &self.executor {
            Flavored::Inline(executor) => executor.clone(),
            Flavored::MultiThread(executor) => executor.clone(),
        };

        spawn_with(executor, future)
    }

    /// Runs a future to completion, blocking the current thread.
    ///
    /// The calling thread drives the reactor for the duration: readiness
    /// and timer events are turned into scheduled task handles here.
    /// Returns the future's value, or the first fatal reactor error the
    /// drive loop encountered.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match &self.executor {
            Flavored::Inline(executor) => executor.block(future),
            Flavored::MultiThread(executor) => executor.block(future),
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Flavored::MultiThread(executor) = &self.executor {
            executor.shutdown();
        }

        tracing::debug!("runtime dropped");
    }
}
