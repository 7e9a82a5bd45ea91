use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::Result;
use crate::reactor::Reactor;
use crate::runtime::context::{self, RuntimeContext};
use crate::runtime::executor::{BlockingPool, Executor};
use crate::runtime::task::{CompletionHook, Runnable, Task};

/// Single-threaded cooperative executor.
///
/// All tasks run on the thread that called [`block`](Self::block), which
/// alternates between draining the local run queue and reacting on the
/// reactor. Handles scheduled from elsewhere (timer expiry collected by
/// the drive loop itself, or a blocking-pool completion) are pushed onto
/// the queue and the reactor is notified; resumption always happens in
/// the drive loop, never inline, so the poller is never re-entered.
pub(crate) struct InlineExecutor {
    reactor: Arc<Reactor>,
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,
    spawn_count: AtomicUsize,
    blocking: OnceLock<Arc<BlockingPool>>,
    blocking_limit: usize,
}

impl InlineExecutor {
    pub(crate) fn new(reactor: Arc<Reactor>, blocking_limit: usize) -> Self {
        Self {
            reactor,
            queue: Mutex::new(VecDeque::new()),
            spawn_count: AtomicUsize::new(0),
            blocking: OnceLock::new(),
            blocking_limit,
        }
    }

    /// Runs `future` to completion, driving the reactor from the calling
    /// thread.
    ///
    /// The loop exits once the result slot is filled, the spawn count is
    /// zero, and the run queue is empty, so detached tasks always finish
    /// before `block` returns. A fatal reactor failure ends the loop
    /// early with that error.
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
        self.schedule(Arc::new(Task::new(wrapped, executor.clone(), Some(hook))));

        let cx = RuntimeContext {
            executor,
            reactor: self.reactor.clone(),
        };

        context::enter(cx, || {
            loop {
                loop {
                    let next = self.queue.lock().unwrap().pop_front();
                    match next {
                        Some(task) => task.run(),
                        None => break,
                    }
                }

                let done = slot.lock().unwrap().is_some()
                    && self.spawn_count.load(Ordering::Acquire) == 0
                    && self.queue.lock().unwrap().is_empty();
                if done {
                    break;
                }

                self.reactor.lock().react(None)?;
            }

            let value = slot.lock().unwrap().take();
            Ok(value.expect("drive loop exited without a result"))
        })
    }
}

impl Executor for InlineExecutor {
    fn schedule(&self, task: Arc<dyn Runnable>) {
        self.queue.lock().unwrap().push_back(task);

        // The drive loop may be parked in the poller.
        self.reactor.notify();
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
