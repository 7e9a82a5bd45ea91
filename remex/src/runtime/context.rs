use std::cell::RefCell;
use std::sync::Arc;

use crate::reactor::Reactor;
use crate::runtime::executor::Executor;

/// The runtime a task can reach without parameter plumbing.
///
/// A clone of this context is installed into a thread-local slot for the
/// duration of every task resumption, so `spawn`, timers and I/O
/// registration find their executor and reactor wherever they are
/// called. Each runtime instance carries its own context; constructing
/// and dropping several runtimes in one process keeps them fully
/// independent.
#[derive(Clone)]
pub(crate) struct RuntimeContext {
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) reactor: Arc<Reactor>,
}

thread_local! {
    static CURRENT: RefCell<Option<RuntimeContext>> = const { RefCell::new(None) };
}

/// Runs `f` with `cx` installed as the current runtime context,
/// restoring whatever was installed before once `f` returns.
pub(crate) fn enter<R>(cx: RuntimeContext, f: impl FnOnce() -> R) -> R {
    CURRENT.with(|current| {
        let previous = current.replace(Some(cx));
        let out = f();
        current.replace(previous);
        out
    })
}

/// Returns the current runtime context.
///
/// # Panics
///
/// Panics when called from a thread that is not running inside a
/// runtime.
pub(crate) fn current() -> RuntimeContext {
    CURRENT.with(|current| {
        current
            .borrow()
            .clone()
            .expect("must be called from within a running runtime")
    })
}
