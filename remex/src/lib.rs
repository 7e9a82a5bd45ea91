//! # Remex
//!
//! **Remex** is a small asynchronous task runtime built around a
//! caller-driven reactor: there is no dedicated event-loop thread, the
//! thread that calls [`Runtime::block_on`] multiplexes file descriptor
//! readiness and timers itself, while tasks run either inline on that
//! same thread or across a work-stealing worker pool.
//!
//! The pieces:
//!
//! - a **reactor** owning the OS poller, the registered sources, and a
//!   timer map, entered through a lock so exactly one thread waits on
//!   the poller at a time;
//! - **executors** in two flavors, single-threaded inline and
//!   multi-threaded work-stealing, plus an elastic **blocking pool** for
//!   code that blocks its thread;
//! - a **task** primitive pairing a future with a result slot,
//!   continuations, and the run queue it returns to when woken.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! #[remex::main]
//! async fn main() {
//!     let handle = remex::spawn(async {
//!         remex::time::sleep(Duration::from_millis(100)).await;
//!         42
//!     });
//!
//!     assert_eq!(handle.await, 42);
//! }
//! ```
//!
//! Or explicitly, without the macro:
//!
//! ```rust,ignore
//! let runtime = remex::RuntimeBuilder::new().worker_threads(4).build();
//! let out = runtime.block_on(async { 1 + 2 }).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`net`] — async TCP listener and stream
//! - [`time`] — sleep and timeout
//! - [`fs`] — file helpers over the blocking pool

mod error;
mod reactor;
mod runtime;

pub mod fs;
pub mod net;
pub mod time;

pub use error::{Error, Result};
pub use runtime::builder::RuntimeBuilder;
pub use runtime::core::Runtime;
pub use runtime::executor::{spawn_blocking, BlockingTask};
pub use runtime::task::{spawn, JoinHandle};
pub use runtime::yield_now::yield_now;

pub use remex_macros::{main, test};
