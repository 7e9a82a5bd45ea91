//! Executors: the dispatchers that resume task handles.
//!
//! Two flavors exist. [`InlineExecutor`] runs everything cooperatively on
//! the thread that called `block_on`; [`MultiThreadExecutor`] distributes
//! tasks over a work-stealing worker pool while the calling thread drives
//! the reactor. Both can delegate thread-blocking closures to a shared
//! elastic [`BlockingPool`].

mod blocking;
mod inline;
mod multi_thread;
mod pool;

pub use blocking::{spawn_blocking, BlockingTask};
pub(crate) use blocking::BlockingPool;
pub(crate) use inline::InlineExecutor;
pub(crate) use multi_thread::MultiThreadExecutor;

use std::sync::Arc;

use crate::runtime::task::Runnable;

/// The executor contract consumed by tasks.
///
/// A task keeps an `Arc<dyn Executor>` to the executor that owns it;
/// waking the task calls [`schedule`](Executor::schedule) on exactly that
/// executor. Scheduling is always deferred (a queue push), never an
/// inline resumption, so it is safe from any context including the
/// reactor's event loop.
pub(crate) trait Executor: Send + Sync + 'static {
    /// Pushes a handle onto the run queue.
    fn schedule(&self, task: Arc<dyn Runnable>);

    /// Records a new live detached task.
    fn spawn_started(&self);

    /// Records completion of a detached task and notifies the reactor so
    /// a parked drive loop re-checks its exit condition.
    fn spawn_finished(&self);

    /// The blocking pool, created on first use.
    fn blocking_pool(&self) -> Arc<BlockingPool>;
}
