//! Time-ordered event queue driving the simulated clock.
//!
//! Events fire earliest first; events at the same instant fire in the order
//! they were scheduled. Cancelled events stay in the heap and are skipped
//! when they reach the top.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use tracing::trace;

use crate::error::SimError;

/// Handle to a scheduled event, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

struct Scheduled<E> {
    at: Duration,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse so the earliest (at, seq) is on top.
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Event scheduler: owns the clock and the pending event queue.
pub struct Scheduler<E> {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<Scheduled<E>>,
    live: HashSet<u64>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BinaryHeap::new(),
            live: HashSet::new(),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of live (not cancelled, not fired) events.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Schedule `event` at absolute time `at`.
    pub fn schedule(&mut self, at: Duration, event: E) -> Result<EventHandle, SimError> {
        if at < self.now {
            return Err(SimError::ScheduledInPast { at, now: self.now });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { at, seq, event });
        self.live.insert(seq);
        trace!(?at, seq, pending = self.live.len(), "event scheduled");
        Ok(EventHandle(seq))
    }

    /// Schedule `event` after `delay` from now. Times past `Duration::MAX` saturate.
    pub fn schedule_in(&mut self, delay: Duration, event: E) -> Result<EventHandle, SimError> {
        self.schedule(self.now.saturating_add(delay), event)
    }

    /// Cancel a pending event. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        let removed = self.live.remove(&handle.0);
        if removed {
            trace!(seq = handle.0, "event cancelled");
        }
        removed
    }

    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.live.contains(&handle.0)
    }

    /// Pop the earliest live event strictly before `until`, advancing the clock to it.
    pub fn pop_due(&mut self, until: Duration) -> Option<(Duration, E)> {
        while let Some(top) = self.queue.peek() {
            if !self.live.contains(&top.seq) {
                self.queue.pop();
                continue;
            }
            if top.at >= until {
                return None;
            }
            let item = self.queue.pop()?;
            self.live.remove(&item.seq);
            self.now = item.at;
            return Some((item.at, item.event));
        }
        None
    }

    /// Move the clock forward without firing anything. Never moves backwards.
    pub fn advance_to(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut s = Scheduler::new();
        s.schedule(ms(300), "c").unwrap();
        s.schedule(ms(100), "a").unwrap();
        s.schedule(ms(200), "b").unwrap();

        let order: Vec<_> = std::iter::from_fn(|| s.pop_due(ms(1000)).map(|(_, e)| e)).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(s.now(), ms(300));
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut s = Scheduler::new();
        for i in 0..5 {
            s.schedule(ms(50), i).unwrap();
        }
        let order: Vec<_> = std::iter::from_fn(|| s.pop_due(ms(100)).map(|(_, e)| e)).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cancel_skips_event() {
        let mut s = Scheduler::new();
        let a = s.schedule(ms(10), "a").unwrap();
        s.schedule(ms(20), "b").unwrap();
        assert!(s.cancel(a));
        assert!(!s.cancel(a), "second cancel is a no-op");
        assert_eq!(s.len(), 1);
        assert_eq!(s.pop_due(ms(100)).map(|(_, e)| e), Some("b"));
        assert!(s.pop_due(ms(100)).is_none());
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut s = Scheduler::new();
        let a = s.schedule(ms(10), "a").unwrap();
        assert!(s.pop_due(ms(100)).is_some());
        assert!(!s.is_pending(a));
        assert!(!s.cancel(a));
    }

    #[test]
    fn test_until_is_exclusive() {
        let mut s = Scheduler::new();
        s.schedule(ms(100), "edge").unwrap();
        assert!(s.pop_due(ms(100)).is_none());
        assert_eq!(s.now(), Duration::ZERO);
        assert!(s.pop_due(ms(101)).is_some());
    }

    #[test]
    fn test_schedule_in_past_is_rejected() {
        let mut s = Scheduler::new();
        s.schedule(ms(100), ()).unwrap();
        s.pop_due(ms(200));
        let err = s.schedule(ms(50), ()).unwrap_err();
        assert!(matches!(err, SimError::ScheduledInPast { .. }));
    }

    #[test]
    fn test_events_scheduled_during_dispatch_fire() {
        let mut s = Scheduler::new();
        s.schedule(ms(10), 1u32).unwrap();
        let mut fired = Vec::new();
        while let Some((_, e)) = s.pop_due(ms(100)) {
            fired.push(e);
            if e < 4 {
                // Same-instant follow-up goes after anything already queued for now.
                s.schedule_in(Duration::ZERO, e + 1).unwrap();
            }
        }
        assert_eq!(fired, vec![1, 2, 3, 4]);
        assert_eq!(s.now(), ms(10));
    }

    #[test]
    fn test_clock_never_decreases() {
        let mut s: Scheduler<()> = Scheduler::new();
        s.advance_to(ms(500));
        s.advance_to(ms(100));
        assert_eq!(s.now(), ms(500));
    }
}
