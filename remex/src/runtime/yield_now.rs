use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future that suspends its task exactly once.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;

        // Re-queue immediately so the task resumes after everything
        // already in the queue.
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yields execution back to the executor once.
///
/// Gives other ready tasks a chance to run before the current task
/// continues. This is an explicit suspension point; the task goes to the
/// back of its run queue.
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}
