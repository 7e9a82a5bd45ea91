use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::Result;
use crate::reactor::Reactor;
use crate::runtime::context::RuntimeContext;
use crate::runtime::executor::pool::ThreadPool;
use crate::runtime::executor::{BlockingPool, Executor};
use crate::runtime::task::{CompletionHook, Runnable, Task};

/// Executor backed by the work-stealing worker pool.
///
/// Workers resume tasks; the thread inside [`block`](Self::block) is not
/// a worker and spends its time holding the reactor lock in `react`,
/// turning readiness and timer expiry into scheduled handles. Workers
/// never touch the reactor lock.
pub(crate) struct MultiThreadExecutor {
    reactor: Arc<Reactor>,
    pool: ThreadPool,
    spawn_count: AtomicUsize,
    blocking: OnceLock<Arc<BlockingPool>>,
    blocking_limit: usize,
}

impl MultiThreadExecutor {
    pub(crate) fn new(reactor: Arc<Reactor>, threads: usize, blocking_limit: usize) -> Self {
        Self {
            reactor,
            pool: ThreadPool::new(threads),
            spawn_count: AtomicUsize::new(0),
            blocking: OnceLock::new(),
            blocking_limit,
        }
    }

    /// Starts the worker threads. Called once, after the executor is
    /// wrapped in its final `Arc`, so workers can carry the runtime
    /// context.
    pub(crate) fn start(self: &Arc<Self>) {
        let cx = RuntimeContext {
            executor: self.clone(),
            reactor: self.reactor.clone(),
        };
        self.pool.start(cx);
    }

    /// Runs `future` to completion on the worker pool while the calling
    /// thread drives the reactor.
    ///
    /// The result crosses threads through a shared slot filled by the
    /// wrapped task; its completion hook notifies the reactor, waking
    /// this thread out of `react` to re-check the exit condition. The
    /// loop ends when the slot is filled and no detached tasks remain,
    /// then waits for the pool to go quiet so nothing is still running
    /// when `block` returns.
    pub(crate) fn block<F>(self: &Arc<Self>, future: F) -> Result<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));

        let wrapped = {
            let slot = slot.clone();
            async move {
                let value = future.await;
                *slot.lock().unwrap() = Some(value);
            }
        };

        let hook: CompletionHook = {
            let reactor = self.reactor.clone();
            Box::new(move || reactor.notify())
        };

        let executor: Arc<dyn Executor> = self.clone();
        self.schedule(Arc::new(Task::new(wrapped, executor, Some(hook))));

        loop {
            // Non-blocking readiness check; the reactor wait below parks
            // this thread until something changes.
            let done = slot.lock().unwrap().is_some()
                && self.spawn_count.load(Ordering::Acquire) == 0;
            if done {
                break;
            }

            self.reactor.lock().react(None)?;
        }

        self.pool.wait_empty();

        let value = slot.lock().unwrap().take();
        Ok(value.expect("drive loop exited without a result"))
    }

    /// Stops the worker pool and joins its threads.
    pub(crate) fn shutdown(&self) {
        self.pool.shutdown();
    }
}

impl Executor for MultiThreadExecutor {
    fn schedule(&self, task: Arc<dyn Runnable>) {
        self.pool.execute(task);
    }

    fn spawn_started(&self) {
        self.spawn_count.fetch_add(1, Ordering::AcqRel);
    }

    fn spawn_finished(&self) {
        self.spawn_count.fetch_sub(1, Ordering::AcqRel);
        self.reactor.notify();
    }

    fn blocking_pool(&self) -> Arc<BlockingPool> {
        self.blocking
            .get_or_init(|| Arc::new(BlockingPool::new(self.blocking_limit)))
            .clone()
    }
}
