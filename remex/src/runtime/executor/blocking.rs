use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::Duration;

use crate::runtime::context;
use crate::runtime::task::Runnable;

/// How long an idle blocking worker lingers before retiring.
const KEEP_ALIVE: Duration = Duration::from_millis(500);

/// Queue growth threshold: more than this many queued jobs per idle
/// worker spawns an extra thread.
const BACKLOG_PER_IDLE: usize = 5;

/// Elastic pool for thread-blocking work.
///
/// A single FIFO of handles guarded by a mutex and condition variable.
/// The pool grows while the backlog outpaces its idle workers (up to the
/// thread limit) and shrinks as workers that sit idle past the
/// keep-alive retire on their own. Workers are detached threads; nothing
/// joins them.
pub(crate) struct BlockingPool {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    queue_changed: Condvar,
    thread_limit: usize,
}

struct State {
    queue: VecDeque<Arc<dyn Runnable>>,
    idle_count: usize,
    thread_count: usize,
}

impl BlockingPool {
    pub(crate) fn new(thread_limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    idle_count: 0,
                    thread_count: 0,
                }),
                queue_changed: Condvar::new(),
                thread_limit,
            }),
        }
    }

    /// Queues a handle, wakes a sleeping worker, and grows the pool if
    /// the backlog warrants it.
    pub(crate) fn execute(&self, task: Arc<dyn Runnable>) {
        let mut state = self.inner.state.lock().unwrap();
        state.queue.push_back(task);
        self.inner.queue_changed.notify_one();
        Inner::grow(&self.inner, &mut state);
    }
}

impl Drop for BlockingPool {
    /// Waits for queued work to be picked up before the pool handle goes
    /// away. Workers already running keep their own reference to the
    /// shared state and finish independently.
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        while !state.queue.is_empty() {
            let (next, _) = self
                .inner
                .queue_changed
                .wait_timeout(state, KEEP_ALIVE)
                .unwrap();
            state = next;
        }
    }
}

impl Inner {
    /// Spawns workers while the backlog exceeds the idle headroom. The
    /// state lock must be held.
    fn grow(inner: &Arc<Inner>, state: &mut State) {
        while state.queue.len() > state.idle_count * BACKLOG_PER_IDLE
            && state.thread_count < inner.thread_limit
        {
            state.thread_count += 1;
            state.idle_count += 1;
            inner.queue_changed.notify_all();

            tracing::trace!(threads = state.thread_count, "blocking pool grows");

            let inner = inner.clone();
            thread::Builder::new()
                .name("remex-blocking".into())
                .spawn(move || Inner::worker(&inner))
                .expect("failed to spawn blocking thread");
        }
    }

    fn worker(inner: &Arc<Inner>) {
        let mut state = inner.state.lock().unwrap();

        loop {
            state.idle_count -= 1;

            while let Some(task) = state.queue.pop_front() {
                Inner::grow(inner, &mut state);
                drop(state);
                task.run();
                state = inner.state.lock().unwrap();
            }

            state.idle_count += 1;

            let (next, timeout) = inner
                .queue_changed
                .wait_timeout(state, KEEP_ALIVE)
                .unwrap();
            state = next;

            if timeout.timed_out() && state.queue.is_empty() {
                state.idle_count -= 1;
                state.thread_count -= 1;

                tracing::trace!(threads = state.thread_count, "blocking worker retires");
                break;
            }
        }
    }
}

/// The pool-side half of a [`spawn_blocking`] call.
///
/// Runs the closure on a blocking thread, stores the value, and resumes
/// the continuation installed by the awaiting task.
struct Bridge<F, R> {
    func: Mutex<Option<F>>,
    result: Mutex<Option<R>>,
    continuation: Mutex<Option<Waker>>,
}

impl<F, R> Runnable for Bridge<F, R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    fn run(self: Arc<Self>) {
        let func = self
            .func
            .lock()
            .unwrap()
            .take()
            .expect("blocking closure already taken");

        let value = func();

        *self.result.lock().unwrap() = Some(value);

        if let Some(waker) = self.continuation.lock().unwrap().take() {
            waker.wake();
        }
    }
}

/// Future returned by [`spawn_blocking`].
///
/// The first poll suspends the calling task: the closure is wrapped into
/// a bridge job whose completion wakes the stored continuation, and the
/// job is handed to the blocking pool. The value comes back through the
/// bridge's result slot.
pub struct BlockingTask<F, R> {
    func: Option<F>,
    bridge: Option<Arc<Bridge<F, R>>>,
}

// The closure is moved out by value before the bridge ever runs; no
// field is structurally pinned.
impl<F, R> Unpin for BlockingTask<F, R> {}

impl<F, R> Future for BlockingTask<F, R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    type Output = R;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let Some(bridge) = this.bridge.as_ref() else {
            let bridge = Arc::new(Bridge {
                func: Mutex::new(this.func.take()),
                result: Mutex::new(None),
                continuation: Mutex::new(Some(cx.waker().clone())),
            });
            this.bridge = Some(bridge.clone());

            context::current().executor.blocking_pool().execute(bridge);
            return Poll::Pending;
        };

        if let Some(value) = bridge.result.lock().unwrap().take() {
            return Poll::Ready(value);
        }

        // Re-register, then check the slot again in case the closure
        // finished in between and woke the previous waker.
        *bridge.continuation.lock().unwrap() = Some(cx.waker().clone());

        if let Some(value) = bridge.result.lock().unwrap().take() {
            return Poll::Ready(value);
        }

        Poll::Pending
    }
}

/// Runs a thread-blocking closure on the blocking pool and resolves to
/// its return value.
///
/// This is the bridge from the cooperative world to code that genuinely
/// blocks its thread (file I/O, CPU-heavy work). The calling task
/// suspends without occupying a worker, so concurrent tasks and timers
/// keep making progress while the closure runs.
///
/// # Panics
///
/// Panics if polled outside of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let sum = spawn_blocking(|| (0..1_000_000u64).sum::<u64>()).await;
/// ```
pub fn spawn_blocking<F, R>(func: F) -> BlockingTask<F, R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    BlockingTask {
        func: Some(func),
        bridge: None,
    }
}
