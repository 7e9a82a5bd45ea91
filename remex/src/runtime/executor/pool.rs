use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_deque::{Injector, Steal, Stealer, Worker as WorkerQueue};

use crate::runtime::context::{self, RuntimeContext};
use crate::runtime::task::Runnable;

/// How long an idle worker sleeps before re-checking the queues. The
/// parked-count handshake below makes wakeups reliable; the timeout only
/// guards against a steal that reported `Retry` with no follow-up push.
const PARK_TIMEOUT: Duration = Duration::from_millis(100);

/// Fixed-size work-stealing worker pool.
///
/// Handles pushed from outside land on the global injection queue. Each
/// worker owns a LIFO deque and looks for work in order: its own deque,
/// a batch stolen from the injector, then the FIFO end of a random
/// peer's deque. Workers with nothing to do park on a condition variable
/// and are woken one at a time as handles arrive.
pub(crate) struct ThreadPool {
    shared: Arc<Shared>,
    threads: usize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

struct Shared {
    injector: Injector<Arc<dyn Runnable>>,

    /// Cleared to stop the workers; they drain their queues first.
    running: AtomicBool,

    /// Handles queued or currently running, for [`ThreadPool::wait_empty`].
    pending: AtomicUsize,

    /// Count of parked workers, also the lock both condvars wait on.
    parked: Mutex<usize>,
    task_available: Condvar,
    pool_empty: Condvar,
}

impl ThreadPool {
    pub(crate) fn new(threads: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                injector: Injector::new(),
                running: AtomicBool::new(true),
                pending: AtomicUsize::new(0),
                parked: Mutex::new(0),
                task_available: Condvar::new(),
                pool_empty: Condvar::new(),
            }),
            threads,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the worker threads, each running inside the given runtime
    /// context.
    pub(crate) fn start(&self, cx: RuntimeContext) {
        let mut stealers = Vec::with_capacity(self.threads);
        let mut queues = Vec::with_capacity(self.threads);

        for _ in 0..self.threads {
            let queue = WorkerQueue::new_lifo();
            stealers.push(queue.stealer());
            queues.push(queue);
        }

        let stealers = Arc::new(stealers);
        let mut handles = self.handles.lock().unwrap();

        for (id, queue) in queues.into_iter().enumerate() {
            let worker = Worker {
                id,
                local: queue,
                stealers: stealers.clone(),
                shared: self.shared.clone(),
                rng: Cell::new(id as u64 + 1),
            };
            let cx = cx.clone();

            let handle = std::thread::Builder::new()
                .name(format!("remex-worker-{id}"))
                .spawn(move || context::enter(cx, || worker.run()))
                .expect("failed to spawn worker thread");

            handles.push(handle);
        }
    }

    /// Queues a handle and wakes one parked worker.
    pub(crate) fn execute(&self, task: Arc<dyn Runnable>) {
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        self.shared.injector.push(task);

        // Taking the park lock orders this push against a worker's
        // empty-queue check, so the notification cannot be lost.
        let _parked = self.shared.parked.lock().unwrap();
        self.shared.task_available.notify_one();
    }

    /// Blocks until every queued handle has finished running.
    pub(crate) fn wait_empty(&self) {
        let mut parked = self.shared.parked.lock().unwrap();
        while self.shared.pending.load(Ordering::Acquire) > 0 {
            parked = self.shared.pool_empty.wait(parked).unwrap();
        }
    }

    /// Stops the workers and joins their threads. Queued handles are
    /// drained before the workers exit.
    pub(crate) fn shutdown(&self) {
        self.shared.running.store(false, Ordering::Release);

        {
            let _parked = self.shared.parked.lock().unwrap();
            self.shared.task_available.notify_all();
        }

        for handle in self.handles.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
    }
}

/// One worker thread of the pool.
struct Worker {
    id: usize,
    local: WorkerQueue<Arc<dyn Runnable>>,
    stealers: Arc<Vec<Stealer<Arc<dyn Runnable>>>>,
    shared: Arc<Shared>,
    rng: Cell<u64>,
}

impl Worker {
    fn run(&self) {
        tracing::trace!(worker = self.id, "worker started");

        loop {
            match self.find_task() {
                Some(task) => {
                    task.run();

                    if self.shared.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                        let _parked = self.shared.parked.lock().unwrap();
                        self.shared.pool_empty.notify_all();
                    }
                }

                None => {
                    if !self.shared.running.load(Ordering::Acquire) {
                        break;
                    }

                    self.park();
                }
            }
        }

        tracing::trace!(worker = self.id, "worker stopped");
    }

    /// Local pop, then an injector batch, then a random peer.
    fn find_task(&self) -> Option<Arc<dyn Runnable>> {
        if let Some(task) = self.local.pop() {
            return Some(task);
        }

        loop {
            let steal = self
                .shared
                .injector
                .steal_batch_and_pop(&self.local)
                .or_else(|| self.steal_from_peer());

            match steal {
                Steal::Success(task) => return Some(task),
                Steal::Empty => return None,
                Steal::Retry => {}
            }
        }
    }

    fn steal_from_peer(&self) -> Steal<Arc<dyn Runnable>> {
        let len = self.stealers.len();
        if len <= 1 {
            return Steal::Empty;
        }

        let start = self.next_rand() as usize % len;
        let mut retry = false;

        for i in 0..len {
            let victim = (start + i) % len;
            if victim == self.id {
                continue;
            }

            match self.stealers[victim].steal() {
                Steal::Success(task) => return Steal::Success(task),
                Steal::Retry => retry = true,
                Steal::Empty => {}
            }
        }

        if retry {
            Steal::Retry
        } else {
            Steal::Empty
        }
    }

    fn park(&self) {
        let mut parked = self.shared.parked.lock().unwrap();

        if !self.shared.running.load(Ordering::Acquire) {
            return;
        }

        // A push that raced the failed steal above has either already
        // landed (visible here) or will take this lock to notify.
        if !self.shared.injector.is_empty() {
            return;
        }

        *parked += 1;
        let (mut parked, _) = self
            .shared
            .task_available
            .wait_timeout(parked, PARK_TIMEOUT)
            .unwrap();
        *parked -= 1;
    }

    /// Xorshift step used to pick a steal victim.
    fn next_rand(&self) -> u64 {
        let mut x = self.rng.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng.set(x);
        x
    }
}
