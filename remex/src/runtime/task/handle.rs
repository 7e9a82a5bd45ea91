use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::runtime::task::state::COMPLETED;
use crate::runtime::task::Task;

/// Awaits the result of a spawned task.
///
/// Returned by [`spawn`](crate::spawn). Awaiting the handle installs the
/// caller as the task's continuation and yields the task's value once it
/// completes. Dropping the handle detaches the task without cancelling
/// it.
///
/// # Panics
///
/// The task's result is consumed by the first `Poll::Ready`; polling the
/// handle again afterwards panics.
pub struct JoinHandle<T> {
    task: Arc<Task<T>>,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(task: Arc<Task<T>>) -> Self {
        Self { task }
    }
}

impl<T: Send + 'static> Future for JoinHandle<T> {
    type Output = T;

    /// Completion is checked, the waker registered, and completion
    /// checked again. The second check closes the window in which the
    /// task finishes after the first check but before the waker lands in
    /// the waiter list, which would otherwise lose the wake.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.task.state.load(Ordering::Acquire) == COMPLETED {
            return Poll::Ready(self.take_result());
        }

        self.task.waiters.lock().unwrap().push(cx.waker().clone());

        if self.task.state.load(Ordering::Acquire) == COMPLETED {
            return Poll::Ready(self.take_result());
        }

        Poll::Pending
    }
}

impl<T> JoinHandle<T> {
    fn take_result(&self) -> T {
        // Safety: COMPLETED was observed with acquire ordering, so the
        // result store is visible and the future will never run again.
        unsafe {
            (*self.task.result.get())
                .take()
                .expect("task result already consumed; a JoinHandle cannot be polled after Ready")
        }
    }
}
