//! Debounced query scheduler.
//!
//! Coalesces bursts of calls per key into a single execution once the
//! key has been quiet for its delay. The scheduler never runs anything
//! itself: the owning event loop calls [`Debouncer::poll`] with the
//! current time and executes whatever comes back due.
//!
//! Every scheduled call gets a [`Ticket`] from a monotonically increasing
//! sequence. A response that arrives after a newer call was scheduled, or
//! after the key was cancelled, fails [`Debouncer::is_current`] and must
//! be dropped by the caller.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Sequence number identifying one scheduled execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

/// An execution that has come due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<K, A> {
    pub key: K,
    pub args: A,
    pub ticket: Ticket,
}

struct Pending<A> {
    args: A,
    due: Instant,
    ticket: Ticket,
}

pub struct Debouncer<K, A> {
    pending: HashMap<K, Pending<A>>,
    latest: HashMap<K, Ticket>,
    next_seq: u64,
}

impl<K, A> Default for Debouncer<K, A>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, A> Debouncer<K, A>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            latest: HashMap::new(),
            next_seq: 0,
        }
    }

    fn issue(&mut self, key: &K) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket(self.next_seq);
        self.latest.insert(key.clone(), ticket);
        ticket
    }

    /// Schedule `args` for `key`, replacing any pending call for that key
    /// and restarting its quiet period.
    pub fn schedule(&mut self, key: K, args: A, delay: Duration, now: Instant) -> Ticket {
        let ticket = self.issue(&key);
        self.pending.insert(key, Pending { args, due: now + delay, ticket });
        ticket
    }

    /// Drop the pending call for `key` and invalidate any execution of it
    /// that is already in flight.
    pub fn cancel(&mut self, key: &K) {
        self.pending.remove(key);
        if self.latest.contains_key(key) {
            self.issue(key);
        }
    }

    /// Cancel everything, e.g. when the owning form is torn down.
    pub fn cancel_all(&mut self) {
        let keys: Vec<K> = self.latest.keys().cloned().collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    /// Remove and return every call whose quiet period has elapsed, in due order.
    pub fn poll(&mut self, now: Instant) -> Vec<Fired<K, A>> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut fired: Vec<(Instant, Fired<K, A>)> = due
            .into_iter()
            .filter_map(|key| {
                self.pending.remove(&key).map(|p| {
                    (p.due, Fired { key, args: p.args, ticket: p.ticket })
                })
            })
            .collect();
        fired.sort_by_key(|(due, f)| (*due, f.ticket));
        fired.into_iter().map(|(_, f)| f).collect()
    }

    /// Whether a response for `ticket` may still be applied.
    pub fn is_current(&self, key: &K, ticket: Ticket) -> bool {
        self.latest.get(key) == Some(&ticket)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest instant at which [`poll`](Self::poll) will return something.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }
}
