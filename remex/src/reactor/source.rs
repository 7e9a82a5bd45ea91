use std::os::fd::RawFd;
use std::sync::Mutex;
use std::task::Waker;

/// One parking slot of a [`Source`].
///
/// A direction holds at most one waker, the suspended task currently
/// waiting for readiness in that direction.
#[derive(Default)]
struct Direction {
    waker: Option<Waker>,
}

impl Direction {
    fn is_empty(&self) -> bool {
        self.waker.is_none()
    }

    fn take(&mut self) -> Option<Waker> {
        self.waker.take()
    }
}

/// Per-source parking state, guarded by the source's own lock.
#[derive(Default)]
struct State {
    read: Direction,
    write: Direction,
}

/// A file descriptor registered with the reactor.
///
/// Each source carries the raw descriptor, the key under which the poller
/// knows it, and two parking slots, one per readiness direction. At any
/// moment a slot holds zero or one waker; installing a second waker in an
/// occupied slot fails and the caller reports the resource as busy.
///
/// A source is logically co-owned by the reactor (one reference in its
/// slab) and by whichever I/O object registered the descriptor.
pub(crate) struct Source {
    /// The registered file descriptor.
    pub(crate) fd: RawFd,

    /// Key issued by the reactor's slab, equal to the poller key.
    pub(crate) key: usize,

    state: Mutex<State>,
}

impl Source {
    pub(crate) fn new(fd: RawFd, key: usize) -> Self {
        Self {
            fd,
            key,
            state: Mutex::new(State::default()),
        }
    }

    /// Installs `waker` as the read parker.
    ///
    /// Returns `false` if the slot is already occupied, leaving the
    /// existing parker untouched. After a successful install the caller
    /// must update the poller interest via the reactor.
    pub(crate) fn set_readable(&self, waker: &Waker) -> bool {
        let mut state = self.state.lock().unwrap();

        if state.read.is_empty() {
            state.read.waker = Some(waker.clone());
            return true;
        }

        false
    }

    /// Installs `waker` as the write parker. See [`set_readable`](Self::set_readable).
    pub(crate) fn set_writable(&self, waker: &Waker) -> bool {
        let mut state = self.state.lock().unwrap();

        if state.write.is_empty() {
            state.write.waker = Some(waker.clone());
            return true;
        }

        false
    }

    /// Refreshes the waker of an occupied read slot.
    ///
    /// Used when the parked task is polled again before readiness arrives
    /// and its waker may have changed.
    pub(crate) fn update_reader(&self, waker: &Waker) {
        if let Some(parked) = self.state.lock().unwrap().read.waker.as_mut() {
            parked.clone_from(waker);
        }
    }

    /// Refreshes the waker of an occupied write slot.
    pub(crate) fn update_writer(&self, waker: &Waker) {
        if let Some(parked) = self.state.lock().unwrap().write.waker.as_mut() {
            parked.clone_from(waker);
        }
    }

    pub(crate) fn reader_parked(&self) -> bool {
        !self.state.lock().unwrap().read.is_empty()
    }

    pub(crate) fn writer_parked(&self) -> bool {
        !self.state.lock().unwrap().write.is_empty()
    }

    /// Clears the read slot without waking, returning the parker if one
    /// was installed. Used for cancellation and for rollback when arming
    /// the poller fails.
    pub(crate) fn unpark_reader(&self) -> Option<Waker> {
        self.state.lock().unwrap().read.take()
    }

    /// Clears the write slot without waking. See [`unpark_reader`](Self::unpark_reader).
    pub(crate) fn unpark_writer(&self) -> Option<Waker> {
        self.state.lock().unwrap().write.take()
    }

    /// Returns the interest pair `(readable, writable)` derived from slot
    /// occupancy. The poller interest mask for this source is exactly this
    /// disjunction.
    pub(crate) fn interest(&self) -> (bool, bool) {
        let state = self.state.lock().unwrap();
        (!state.read.is_empty(), !state.write.is_empty())
    }

    /// Takes the parkers matching a delivered event and appends them to
    /// `wakers`.
    ///
    /// An event reporting both directions releases both parkers in the
    /// same pass. Each parker is taken atomically, so a handle is
    /// collected at most once per suspension.
    pub(crate) fn take_ready(&self, readable: bool, writable: bool, wakers: &mut Vec<Waker>) {
        let mut state = self.state.lock().unwrap();

        if readable {
            wakers.extend(state.read.take());
        }

        if writable {
            wakers.extend(state.write.take());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_parker_is_rejected() {
        let source = Source::new(0, 0);
        let waker = Waker::noop();

        assert!(source.set_readable(waker));
        assert!(!source.set_readable(waker));
        assert!(source.reader_parked());

        // The write direction is independent of the read direction.
        assert!(source.set_writable(waker));
        assert!(!source.set_writable(waker));
    }

    #[test]
    fn interest_follows_slot_occupancy() {
        let source = Source::new(0, 0);
        let waker = Waker::noop();

        assert_eq!(source.interest(), (false, false));

        source.set_readable(waker);
        assert_eq!(source.interest(), (true, false));

        source.set_writable(waker);
        assert_eq!(source.interest(), (true, true));

        source.unpark_reader();
        assert_eq!(source.interest(), (false, true));
    }

    #[test]
    fn take_ready_releases_both_directions() {
        let source = Source::new(0, 0);
        let waker = Waker::noop();

        source.set_readable(waker);
        source.set_writable(waker);

        let mut wakers = Vec::new();
        source.take_ready(true, true, &mut wakers);

        assert_eq!(wakers.len(), 2);
        assert!(!source.reader_parked());
        assert!(!source.writer_parked());

        // A second delivery finds the slots empty.
        let mut wakers = Vec::new();
        source.take_ready(true, true, &mut wakers);
        assert!(wakers.is_empty());
    }
}
