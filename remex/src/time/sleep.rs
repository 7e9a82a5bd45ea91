use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::reactor::Reactor;
use crate::runtime::context;

/// Suspends the current task for at least `duration`.
///
/// # Panics
///
/// Panics if polled outside of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep {
        deadline: Instant::now() + duration,
        timer: None,
    }
}

/// Future returned by [`sleep`].
///
/// The timer is registered with the reactor on first poll under the key
/// `(deadline, id)`; the reactor releases the handle once, when the
/// deadline passes. Dropping the future before then removes the timer
/// under the same key, so an abandoned sleep never wakes anything.
pub struct Sleep {
    deadline: Instant,

    /// Reactor and timer id once registered.
    timer: Option<(Arc<Reactor>, u64)>,
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if Instant::now() >= self.deadline {
            // A fired timer entry was already dropped by the reactor;
            // clearing our record keeps `drop` from cancelling a key
            // that no longer exists.
            self.timer = None;
            return Poll::Ready(());
        }

        if self.timer.is_none() {
            let reactor = context::current().reactor;
            let id = reactor.insert_timer(self.deadline, cx.waker());
            self.timer = Some((reactor, id));
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some((reactor, id)) = self.timer.take() {
            reactor.remove_timer(self.deadline, id);
        }
    }
}
