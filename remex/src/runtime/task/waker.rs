use std::mem;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

use crate::runtime::task::Task;

/// Builds the waker handed to a task's future.
///
/// The waker is backed by the `Arc<Task<T>>` itself: waking moves the
/// task back onto the run queue of the executor that owns it. Because
/// the pointer inside the raw waker is an `Arc` obtained from
/// [`Arc::into_raw`], every vtable function must keep the reference
/// count balanced.
pub(crate) fn task_waker<T: Send + 'static>(task: Arc<Task<T>>) -> Waker {
    unsafe { Waker::from_raw(RawWaker::new(Arc::into_raw(task) as *const (), vtable::<T>())) }
}

fn vtable<T: Send + 'static>() -> &'static RawWakerVTable {
    &RawWakerVTable::new(clone::<T>, wake::<T>, wake_by_ref::<T>, drop_waker::<T>)
}

unsafe fn clone<T: Send + 'static>(ptr: *const ()) -> RawWaker {
    let task = unsafe { Arc::from_raw(ptr as *const Task<T>) };
    let cloned = task.clone();
    mem::forget(task);

    RawWaker::new(Arc::into_raw(cloned) as *const (), vtable::<T>())
}

unsafe fn wake<T: Send + 'static>(ptr: *const ()) {
    // Consumes the waker's reference.
    let task = unsafe { Arc::from_raw(ptr as *const Task<T>) };
    task.wake();
}

unsafe fn wake_by_ref<T: Send + 'static>(ptr: *const ()) {
    let task = unsafe { Arc::from_raw(ptr as *const Task<T>) };
    task.clone().wake();
    mem::forget(task);
}

unsafe fn drop_waker<T: Send + 'static>(ptr: *const ()) {
    drop(unsafe { Arc::from_raw(ptr as *const Task<T>) });
}
