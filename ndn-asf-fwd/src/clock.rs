//! Virtual time and the one-shot timer queue.
//!
//! Time is a [`Duration`] since forwarder start. The scheduler is a plain
//! ordered queue: callers post an event for a future instant and later drain
//! everything that has become due. Ties fire in posting order, which keeps
//! every run of the simulator reproducible.

use ndn_asf_common::name::Name;
use ndn_asf_common::types::FaceId;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

/// Instant on the virtual clock, measured from forwarder start.
pub type Timestamp = Duration;

/// One-shot events the strategy can ask the forwarder to deliver later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// The retransmission timeout armed when an Interest was forwarded on
    /// `face` expired without Data coming back.
    RtoTimeout {
        /// Name of the Interest whose forwarding armed the timer.
        name: Name,
        /// Upstream face the Interest was sent on.
        face: FaceId,
        /// Arming generation, used to ignore stale firings.
        generation: u64,
    },
}

#[derive(Debug)]
struct ScheduledTimer {
    at: Timestamp,
    seq: u64,
    event: TimerEvent,
}

impl PartialEq for ScheduledTimer {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledTimer {}

impl PartialOrd for ScheduledTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

/// Ordered one-shot timer queue on the virtual clock.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<ScheduledTimer>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts `event` to fire once `after` has elapsed from `now`.
    pub fn schedule(&mut self, now: Timestamp, after: Duration, event: TimerEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(ScheduledTimer {
            at: now + after,
            seq,
            event,
        }));
    }

    /// Removes and returns the next event due at or before `now`.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<TimerEvent> {
        if self.queue.peek().is_some_and(|Reverse(t)| t.at <= now) {
            self.queue.pop().map(|Reverse(t)| t.event)
        } else {
            None
        }
    }

    /// Instant of the earliest pending event, if any.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.queue.peek().map(|Reverse(t)| t.at)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
