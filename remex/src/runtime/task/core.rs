use std::cell::UnsafeCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::runtime::context;
use crate::runtime::executor::Executor;
use crate::runtime::task::state::{COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::runtime::task::waker::task_waker;
use crate::runtime::task::JoinHandle;

/// A unit of work an executor can run.
///
/// Erasing the output type behind `Arc<dyn Runnable>` lets run queues
/// hold heterogeneous tasks, and lets the blocking pool run bridge jobs
/// through the same queues as ordinary tasks.
pub(crate) trait Runnable: Send + Sync {
    /// Advances the work to its next suspension point or to completion.
    fn run(self: Arc<Self>);
}

/// Completion hook installed on detached and top-level tasks.
///
/// Runs strictly after the result slot is filled and continuations are
/// woken. Executors use it for spawn accounting (decrement the live
/// count, notify the reactor so a parked drive loop re-checks its exit
/// condition).
pub(crate) type CompletionHook = Box<dyn FnOnce() + Send>;

/// A suspendable computation producing a value of type `T`.
///
/// The task owns its future, a single-fill result slot, and the list of
/// continuations waiting on completion. Its atomic state machine
/// guarantees that the future is polled by one thread at a time and that
/// the task is enqueued at most once at any instant.
///
/// Construction is lazy: nothing runs until the task is scheduled onto
/// its executor and a worker polls it.
pub(crate) struct Task<T> {
    /// The future, pinned on the heap. Only the thread that moved the
    /// state to `RUNNING` may touch this cell.
    future: UnsafeCell<Pin<Box<dyn Future<Output = T> + Send>>>,

    /// Filled exactly once, when the future completes.
    pub(crate) result: UnsafeCell<Option<T>>,

    /// Lifecycle state, one of the constants in [`super::state`].
    pub(crate) state: AtomicUsize,

    /// The executor whose run queue this task returns to when woken.
    executor: Arc<dyn Executor>,

    /// Continuations resumed on completion.
    pub(crate) waiters: Mutex<Vec<Waker>>,

    /// Hook invoked after completion, if any.
    on_complete: Mutex<Option<CompletionHook>>,
}

// The future cell is only touched under the RUNNING state and the result
// slot only after COMPLETED is observed, so the usual auto-trait
// reasoning about UnsafeCell does not apply.
unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn new<F>(
        future: F,
        executor: Arc<dyn Executor>,
        on_complete: Option<CompletionHook>,
    ) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: UnsafeCell::new(Box::pin(future)),
            result: UnsafeCell::new(None),
            state: AtomicUsize::new(QUEUED),
            executor,
            waiters: Mutex::new(Vec::new()),
            on_complete: Mutex::new(on_complete),
        }
    }

    /// Polls the task once.
    ///
    /// Transitions `QUEUED -> RUNNING`, polls the future, and then either
    /// settles back to `IDLE` (re-queueing if a wake arrived mid-poll) or
    /// finishes: store the result, wake the waiters, run the completion
    /// hook.
    pub(crate) fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED {
            return;
        }

        if self
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = task_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: the RUNNING transition above gives this thread exclusive
        // access to the future cell.
        let poll = unsafe { (*self.future.get()).as_mut().poll(&mut cx) };

        match poll {
            Poll::Pending => {
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    // A wake arrived while polling. Re-queue immediately.
                    self.state.store(QUEUED, Ordering::Release);
                    self.executor.schedule(self.clone());
                }
            }

            Poll::Ready(value) => {
                // Safety: no other thread can reach the result slot until
                // COMPLETED is published below.
                unsafe {
                    *self.result.get() = Some(value);
                }
                self.state.store(COMPLETED, Ordering::Release);

                for waiter in self.waiters.lock().unwrap().drain(..) {
                    waiter.wake();
                }

                if let Some(hook) = self.on_complete.lock().unwrap().take() {
                    hook();
                }
            }
        }
    }

    /// Schedules the task to be polled again.
    ///
    /// `IDLE` tasks move to `QUEUED` and are pushed onto their executor;
    /// `RUNNING` tasks are marked `NOTIFIED` so the polling thread
    /// re-queues them itself. All other states ignore the wake, which
    /// keeps the enqueued-at-most-once invariant.
    pub(crate) fn wake(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.executor.schedule(self.clone());
                        return;
                    }
                }

                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }

                _ => return,
            }
        }
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        Task::run(self);
    }
}

/// Spawns a future onto the given executor as a counted, detached task.
///
/// The executor's spawn count is incremented before the task is queued
/// and decremented by the completion hook, so a drive loop observing a
/// zero count knows no spawned work remains.
pub(crate) fn spawn_with<F>(executor: Arc<dyn Executor>, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    executor.spawn_started();

    let hook: CompletionHook = {
        let executor = executor.clone();
        Box::new(move || executor.spawn_finished())
    };

    let task = Arc::new(Task::new(future, executor.clone(), Some(hook)));
    let handle = JoinHandle::new(task.clone());

    executor.schedule(task);
    handle
}

/// Spawns a future onto the current runtime.
///
/// The task starts independently of the returned [`JoinHandle`]; the
/// handle may be awaited for the task's value or simply dropped, in which
/// case the task keeps running to completion. `block_on` does not return
/// while spawned tasks are live.
///
/// # Panics
///
/// Panics if called outside of a running runtime.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    spawn_with(context::current().executor, future)
}
