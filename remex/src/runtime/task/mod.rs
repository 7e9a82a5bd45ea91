//! The task primitive.
//!
//! A task wraps a future together with its lifecycle state, result slot,
//! and continuations. Wakers produced for a task point back at the task
//! itself, so waking is exactly "push this handle onto the run queue of
//! the executor that owns it".

mod core;
mod handle;
mod state;
mod waker;

pub(crate) use self::core::{spawn_with, CompletionHook, Runnable, Task};
pub use self::core::spawn;
pub use handle::JoinHandle;
