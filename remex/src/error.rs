use std::io;

use thiserror::Error;

/// Errors surfaced by runtime operations.
///
/// Failures of the underlying OS facilities (the poller, sockets) are
/// carried as [`Error::Io`]. [`Error::Busy`] reports an attempt to install
/// a second waiter for the same readiness direction of one registered file
/// descriptor, which is a usage error rather than an OS condition.
///
/// Values produced by tasks themselves are not part of this taxonomy: a
/// task returning `Result` propagates its error as an ordinary value
/// through `await` and [`JoinHandle`](crate::JoinHandle).
#[derive(Debug, Error)]
pub enum Error {
    /// An operating system I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Another task is already waiting for the same readiness direction.
    #[error("another task is already waiting on this resource")]
    Busy,
}

/// Convenience alias used across the crate's public surface.
pub type Result<T> = std::result::Result<T, Error>;
