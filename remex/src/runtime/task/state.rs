/// Task exists but is neither queued nor running.
pub(crate) const IDLE: usize = 0;

/// Task sits in a run queue waiting for a worker.
///
/// A task is queued at most once at any instant; the transitions into
/// this state are guarded by compare-exchange so concurrent wakes cannot
/// enqueue a second handle.
pub(crate) const QUEUED: usize = 1;

/// Task is being polled. At most one thread observes this state for a
/// given task at a time, which is what makes the future cell safe to
/// access.
pub(crate) const RUNNING: usize = 2;

/// Task was woken while running and must be re-queued when the current
/// poll finishes.
pub(crate) const NOTIFIED: usize = 3;

/// The future returned `Ready`. The result slot is filled and the task
/// will never be polled again.
pub(crate) const COMPLETED: usize = 4;
