use std::io;
use std::os::fd::{BorrowedFd, RawFd};
use std::time::Duration;

pub(crate) use polling::{Event, Events};

/// The OS readiness backend.
///
/// `Poller` adapts the [`polling`] crate (epoll on Linux, kqueue on the
/// BSDs and macOS, IOCP on Windows) to the small surface the reactor
/// consumes: register, re-arm, deregister, wait, and self-wake. File
/// descriptors are registered in the default one-shot mode, so a delivered
/// event disarms the descriptor until the next [`modify`](Self::modify).
///
/// The rest of the crate never touches `polling` types directly except for
/// the re-exported [`Event`] and [`Events`].
pub(crate) struct Poller {
    inner: polling::Poller,
}

impl Poller {
    pub(crate) fn new() -> io::Result<Self> {
        Ok(Self {
            inner: polling::Poller::new()?,
        })
    }

    /// Registers `fd` under `interest.key`.
    ///
    /// # Safety contract
    ///
    /// The caller keeps `fd` open until [`delete`](Self::delete) is called
    /// for it. The reactor upholds this by tying registration to the
    /// lifetime of its `Source`.
    pub(crate) fn add(&self, fd: RawFd, interest: Event) -> io::Result<()> {
        unsafe { self.inner.add(fd, interest) }
    }

    /// Replaces the interest set of an already registered descriptor.
    pub(crate) fn modify(&self, fd: RawFd, interest: Event) -> io::Result<()> {
        let fd = unsafe { BorrowedFd::borrow_raw(fd) };
        self.inner.modify(&fd, interest)
    }

    /// Removes a descriptor from the poller.
    pub(crate) fn delete(&self, fd: RawFd) -> io::Result<()> {
        let fd = unsafe { BorrowedFd::borrow_raw(fd) };
        self.inner.delete(&fd)
    }

    /// Blocks until at least one event is ready, the timeout elapses, or
    /// [`notify`](Self::notify) is called. Returns the number of events
    /// written into `events`.
    ///
    /// A wait interrupted by a signal is reported as a successful wait
    /// that produced zero events, so callers handle `EINTR` and an elapsed
    /// timeout through the same path.
    pub(crate) fn wait(&self, events: &mut Events, timeout: Option<Duration>) -> io::Result<usize> {
        match self.inner.wait(events, timeout) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => Ok(0),
            res => res,
        }
    }

    /// Wakes up a concurrent [`wait`](Self::wait), if one is in progress.
    ///
    /// Safe to call from any thread at any time. Multiple notifications
    /// coalesce into at most one extra wakeup.
    pub(crate) fn notify(&self) -> io::Result<()> {
        self.inner.notify()
    }
}
