//! The I/O and timer multiplexer at the center of the runtime.
//!
//! The reactor owns the OS poller, a registry of file descriptor
//! [`Source`]s, and a timer map. It has no thread of its own: whichever
//! thread is blocked in an executor's drive loop acquires the reactor
//! lock and runs [`ReactorLock::react`], which waits for readiness or
//! timer expiry and releases the suspended tasks it finds.
//!
//! Timer insertion and removal go through a concurrent operation queue
//! rather than the timer map directly, so tasks on any thread can
//! schedule timers without contending with a reactor blocked in the
//! poller.

mod poller;
mod source;

pub(crate) mod readiness;

use std::collections::BTreeMap;
use std::io;
use std::mem;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::task::Waker;
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;
use slab::Slab;

use self::poller::{Event, Events, Poller};
pub(crate) use self::source::Source;

/// A pending mutation of the timer map.
///
/// Operations are queued from any thread and applied in submission order
/// under the timer lock the next time timers are processed.
enum TimerOp {
    Insert {
        when: Instant,
        id: u64,
        waker: Waker,
    },
    Remove {
        when: Instant,
        id: u64,
    },
}

/// The reactor state shared by all executors of one runtime.
pub(crate) struct Reactor {
    poller: Poller,

    /// Epoch counter, incremented once per [`ReactorLock::react`] call.
    ticker: AtomicUsize,

    /// Registered sources, keyed by their poller key.
    sources: Mutex<Slab<Arc<Source>>>,

    /// Event buffer, doubling as the event-wait critical section: the
    /// thread holding this lock is the only one allowed to wait on the
    /// poller.
    events: Mutex<Events>,

    /// Timers ordered by `(deadline, id)`. Ties between equal deadlines
    /// resolve in insertion order because ids are issued monotonically.
    timers: Mutex<BTreeMap<(Instant, u64), Waker>>,

    /// Queued timer map mutations, drained under the timer lock.
    timer_ops: SegQueue<TimerOp>,

    /// Generator for timer ids, unique within this reactor's lifetime.
    timer_id: AtomicU64,
}

impl Reactor {
    pub(crate) fn new() -> io::Result<Self> {
        Ok(Self {
            poller: Poller::new()?,
            ticker: AtomicUsize::new(0),
            sources: Mutex::new(Slab::new()),
            events: Mutex::new(Events::new()),
            timers: Mutex::new(BTreeMap::new()),
            timer_ops: SegQueue::new(),
            timer_id: AtomicU64::new(0),
        })
    }

    /// Current reactor epoch.
    #[allow(dead_code)]
    pub(crate) fn ticker(&self) -> usize {
        self.ticker.load(Ordering::Acquire)
    }

    /// Registers a file descriptor and returns its source.
    ///
    /// The source is inserted into the slab first so its key is known,
    /// then the descriptor is registered with the poller under that key
    /// with an empty interest set. If the poller rejects the descriptor
    /// the slab entry is rolled back.
    pub(crate) fn insert_io(&self, fd: RawFd) -> io::Result<Arc<Source>> {
        let source = {
            let mut sources = self.sources.lock().unwrap();
            let entry = sources.vacant_entry();
            let source = Arc::new(Source::new(fd, entry.key()));
            entry.insert(source.clone());
            source
        };

        if let Err(err) = self.poller.add(fd, Event::none(source.key)) {
            self.sources.lock().unwrap().try_remove(source.key);
            return Err(err);
        }

        Ok(source)
    }

    /// Deregisters a source. Must be called exactly once per inserted
    /// descriptor, before the descriptor is closed.
    pub(crate) fn remove_io(&self, source: &Source) -> io::Result<()> {
        self.sources.lock().unwrap().try_remove(source.key);
        self.poller.delete(source.fd)
    }

    /// Re-arms the poller for a source from its current slot occupancy.
    pub(crate) fn update_io(&self, source: &Source) -> io::Result<()> {
        let (readable, writable) = source.interest();
        self.poller
            .modify(source.fd, Event::new(source.key, readable, writable))
    }

    /// Schedules `waker` to be woken at `when`. Returns the id needed to
    /// cancel the timer with [`remove_timer`](Self::remove_timer).
    ///
    /// The insertion is queued and the reactor notified, so a thread
    /// parked in the poller re-evaluates its wait deadline promptly.
    pub(crate) fn insert_timer(&self, when: Instant, waker: &Waker) -> u64 {
        let id = self.timer_id.fetch_add(1, Ordering::Relaxed);

        self.timer_ops.push(TimerOp::Insert {
            when,
            id,
            waker: waker.clone(),
        });
        self.notify();

        id
    }

    /// Cancels the timer identified by `(when, id)`.
    ///
    /// Removing a timer that already fired is a no-op.
    pub(crate) fn remove_timer(&self, when: Instant, id: u64) {
        self.timer_ops.push(TimerOp::Remove { when, id });
    }

    /// Wakes the thread blocked in [`ReactorLock::react`], if any.
    pub(crate) fn notify(&self) {
        if let Err(err) = self.poller.notify() {
            tracing::warn!("reactor notification failed: {err}");
        }
    }

    /// Acquires the event-wait lock, blocking until it is free.
    pub(crate) fn lock(&self) -> ReactorLock<'_> {
        ReactorLock {
            reactor: self,
            events: self.events.lock().unwrap(),
        }
    }

    /// Acquires the event-wait lock if it is free.
    #[allow(dead_code)]
    pub(crate) fn try_lock(&self) -> Option<ReactorLock<'_>> {
        match self.events.try_lock() {
            Ok(events) => Some(ReactorLock {
                reactor: self,
                events,
            }),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(err)) => panic!("reactor lock poisoned: {err}"),
        }
    }

    /// Applies queued timer ops, collects due timers into `wakers`, and
    /// returns how long the caller may wait for the next deadline.
    ///
    /// Returns `None` when no timers are pending, `Some(ZERO)` when due
    /// timers were collected, and the clamped time until the earliest
    /// pending deadline otherwise. Collected entries leave the map, so a
    /// timer handle is released at most once.
    fn process_timers(&self, wakers: &mut Vec<Waker>) -> Option<Duration> {
        let mut timers = self.timers.lock().unwrap();
        self.process_timer_ops(&mut timers);

        let now = Instant::now();

        // Timers within a nanosecond of now are counted as due.
        let deadline = now + Duration::from_nanos(1);
        let pending = timers.split_off(&(deadline, u64::MAX));
        let ready = mem::replace(&mut *timers, pending);

        let next = if !ready.is_empty() {
            Some(Duration::ZERO)
        } else {
            timers
                .keys()
                .next()
                .map(|(when, _)| when.saturating_duration_since(now))
        };

        drop(timers);

        wakers.extend(ready.into_values());
        next
    }

    /// Drains the op queue into the timer map. The timer lock must be
    /// held by the caller.
    fn process_timer_ops(&self, timers: &mut BTreeMap<(Instant, u64), Waker>) {
        while let Some(op) = self.timer_ops.pop() {
            match op {
                TimerOp::Insert { when, id, waker } => {
                    timers.insert((when, id), waker);
                }
                TimerOp::Remove { when, id } => {
                    timers.remove(&(when, id));
                }
            }
        }
    }
}

/// Exclusive permission to wait on the poller.
///
/// Holding the lock serializes the event-wait critical section: at most
/// one thread is inside [`react`](Self::react) at a time, while `notify`
/// remains callable from anywhere.
pub(crate) struct ReactorLock<'a> {
    reactor: &'a Reactor,
    events: MutexGuard<'a, Events>,
}

impl ReactorLock<'_> {
    /// Processes one batch of timer and I/O events.
    ///
    /// The effective poller wait is the shorter of `timeout` and the next
    /// timer deadline; with due timers it is zero and with neither bound
    /// it is indefinite. Suspended tasks found ready are handed off for
    /// scheduling by waking their parked wakers. Waking is deferred
    /// scheduling by construction, so nothing resumes inline under this
    /// lock, and each task resumes on the executor that owns it.
    ///
    /// A wait interrupted by a signal counts as an empty wait. Any other
    /// poller failure is returned to the drive loop after the handles
    /// collected so far have been delivered.
    pub(crate) fn react(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let mut wakers = Vec::new();

        let next_timer = self.reactor.process_timers(&mut wakers);

        let wait = match (timeout, next_timer) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let tick = self.reactor.ticker.fetch_add(1, Ordering::AcqRel) + 1;
        self.events.clear();

        let res = match self.reactor.poller.wait(&mut self.events, wait) {
            Ok(0) => {
                // The wait elapsed, or a notification arrived. Timers may
                // have come due while we were parked.
                if wait != Some(Duration::ZERO) {
                    self.reactor.process_timers(&mut wakers);
                }

                Ok(())
            }

            Ok(count) => {
                tracing::trace!(tick, count, "reactor events");

                let sources = self.reactor.sources.lock().unwrap();

                for ev in self.events.iter() {
                    // A key missing from the slab means the descriptor was
                    // deregistered after the poller queued the event.
                    if let Some(source) = sources.get(ev.key) {
                        source.take_ready(ev.readable, ev.writable, &mut wakers);
                    }
                }

                Ok(())
            }

            Err(err) => Err(err),
        };

        // Handles collected before a failure are still delivered.
        for waker in wakers {
            waker.wake();
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Waker {
        Waker::noop().clone()
    }

    #[test]
    fn timer_ids_are_unique_and_monotonic() {
        let reactor = Reactor::new().unwrap();
        let when = Instant::now();

        let a = reactor.insert_timer(when, &noop());
        let b = reactor.insert_timer(when, &noop());
        let c = reactor.insert_timer(when, &noop());

        assert!(a < b && b < c);
    }

    #[test]
    fn due_timers_are_collected_once() {
        let reactor = Reactor::new().unwrap();
        let when = Instant::now();

        reactor.insert_timer(when, &noop());
        reactor.insert_timer(when, &noop());

        let mut wakers = Vec::new();
        let next = reactor.process_timers(&mut wakers);
        assert_eq!(wakers.len(), 2);
        assert_eq!(next, Some(Duration::ZERO));

        // The collected entries left the map.
        let mut wakers = Vec::new();
        let next = reactor.process_timers(&mut wakers);
        assert!(wakers.is_empty());
        assert_eq!(next, None);
    }

    #[test]
    fn removed_timer_never_fires() {
        let reactor = Reactor::new().unwrap();
        let when = Instant::now();

        let id = reactor.insert_timer(when, &noop());
        reactor.remove_timer(when, id);

        let mut wakers = Vec::new();
        reactor.process_timers(&mut wakers);
        assert!(wakers.is_empty());
    }

    #[test]
    fn react_advances_the_ticker_and_excludes_other_threads() {
        let reactor = Reactor::new().unwrap();
        assert_eq!(reactor.ticker(), 0);

        let mut lock = reactor.lock();
        assert!(
            reactor.try_lock().is_none(),
            "the event-wait section must be singly owned"
        );

        lock.react(Some(Duration::ZERO)).unwrap();
        lock.react(Some(Duration::ZERO)).unwrap();
        drop(lock);

        assert_eq!(reactor.ticker(), 2);
        assert!(reactor.try_lock().is_some());
    }

    #[test]
    fn notify_interrupts_an_indefinite_wait() {
        let reactor = Reactor::new().unwrap();

        // Repeated notifications coalesce; the wait below must still
        // return instead of hanging.
        reactor.notify();
        reactor.notify();

        let mut lock = reactor.lock();
        lock.react(None).unwrap();
    }

    #[test]
    fn pending_timer_bounds_the_wait() {
        let reactor = Reactor::new().unwrap();
        let when = Instant::now() + Duration::from_secs(60);

        reactor.insert_timer(when, &noop());

        let mut wakers = Vec::new();
        let next = reactor.process_timers(&mut wakers);

        assert!(wakers.is_empty());
        let next = next.expect("a pending timer must bound the wait");
        assert!(next <= Duration::from_secs(60));
        assert!(next > Duration::from_secs(59));
    }
}
