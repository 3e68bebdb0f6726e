//! Cancellable timer queue on a virtual clock.
//!
//! Nothing in the core sleeps. Components schedule tasks here and the host
//! event loop moves the clock forward, firing due tasks one at a time in
//! deadline order (ties fire in scheduling order).

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Revocable handle to a scheduled task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Single-threaded timer queue
#[derive(Debug)]
pub struct Timers<T> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<u64, Duration>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Current position of the clock
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `task` to fire `delay` from now
    pub fn schedule(&mut self, delay: Duration, task: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;

        let deadline = self.now.saturating_add(delay);
        self.queue.insert((deadline, id), task);
        self.deadlines.insert(id, deadline);
        TimerId(id)
    }

    /// Revoke a pending timer, returning its task
    ///
    /// Cancelling a timer that already fired (or never existed) is a no-op.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&id.0)?;
        self.queue.remove(&(deadline, id.0))
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id.0)
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.first_key_value().map(|((deadline, _), _)| *deadline)
    }

    /// Pop the earliest timer due at or before `until`
    ///
    /// The clock moves to the popped timer's deadline, so a task that
    /// schedules follow-ups measures their delay from its own firing time.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        let (deadline, id) = *self.queue.first_key_value()?.0;
        if deadline > until {
            return None;
        }

        let task = self.queue.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        if deadline > self.now {
            self.now = deadline;
        }
        Some((TimerId(id), task))
    }

    /// Move the clock to `until` once nothing else is due
    pub fn finish(&mut self, until: Duration) {
        if until > self.now {
            self.now = until;
        }
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
