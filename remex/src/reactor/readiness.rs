use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::{Error, Result};
use crate::reactor::{Reactor, Source};

/// Waits until a source becomes readable.
///
/// On first poll the task's waker is installed in the source's read slot
/// and the poller interest is updated; the future then suspends until the
/// reactor takes the waker out of the slot and wakes it. The order
/// matters: the slot is filled under the source lock before the poller is
/// armed, and the reactor takes the slot under the same lock, so a wake
/// cannot be lost between arming and suspension.
///
/// Resolves to [`Error::Busy`] if another task is already parked in the
/// same direction. Dropping the future before completion clears the slot
/// and disarms the corresponding interest.
pub(crate) struct Readable<'a> {
    reactor: &'a Reactor,
    source: &'a Arc<Source>,
    registered: bool,
}

impl<'a> Readable<'a> {
    pub(crate) fn new(reactor: &'a Reactor, source: &'a Arc<Source>) -> Self {
        Self {
            reactor,
            source,
            registered: false,
        }
    }
}

impl Future for Readable<'_> {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if !this.registered {
            if !this.source.set_readable(cx.waker()) {
                return Poll::Ready(Err(Error::Busy));
            }

            if let Err(err) = this.reactor.update_io(this.source) {
                // Arming failed. Take the waker back so the slot does not
                // hold a parker that can never be woken.
                this.source.unpark_reader();
                return Poll::Ready(Err(err.into()));
            }

            this.registered = true;
            return Poll::Pending;
        }

        if this.source.reader_parked() {
            // Woken by something other than the reactor. Keep waiting,
            // but make sure the slot holds the current waker.
            this.source.update_reader(cx.waker());
            return Poll::Pending;
        }

        // The reactor took the waker out of the slot: readiness arrived.
        this.registered = false;
        Poll::Ready(Ok(()))
    }
}

impl Drop for Readable<'_> {
    fn drop(&mut self) {
        if self.registered && self.source.unpark_reader().is_some() {
            let _ = self.reactor.update_io(self.source);
        }
    }
}

/// Waits until a source becomes writable.
///
/// The write-direction counterpart of [`Readable`], with identical
/// parking, busy, and cancellation semantics.
pub(crate) struct Writable<'a> {
    reactor: &'a Reactor,
    source: &'a Arc<Source>,
    registered: bool,
}

impl<'a> Writable<'a> {
    pub(crate) fn new(reactor: &'a Reactor, source: &'a Arc<Source>) -> Self {
        Self {
            reactor,
            source,
            registered: false,
        }
    }
}

impl Future for Writable<'_> {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if !this.registered {
            if !this.source.set_writable(cx.waker()) {
                return Poll::Ready(Err(Error::Busy));
            }

            if let Err(err) = this.reactor.update_io(this.source) {
                this.source.unpark_writer();
                return Poll::Ready(Err(err.into()));
            }

            this.registered = true;
            return Poll::Pending;
        }

        if this.source.writer_parked() {
            this.source.update_writer(cx.waker());
            return Poll::Pending;
        }

        this.registered = false;
        Poll::Ready(Ok(()))
    }
}

impl Drop for Writable<'_> {
    fn drop(&mut self) {
        if self.registered && self.source.unpark_writer().is_some() {
            let _ = self.reactor.update_io(self.source);
        }
    }
}
