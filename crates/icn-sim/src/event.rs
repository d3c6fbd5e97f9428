//! The concrete event loop: a `BinaryHeap`-backed min-heap over
//! `(time, sequence) -> event`, popped in non-decreasing time order with
//! the monotonically increasing `sequence` breaking ties. This is the
//! one piece of mutable global state in the whole workspace — everything
//! else is reached through it, per the "explicit `Simulation` handle, no
//! module-level singletons" design note.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use icn_core::clock::{Scheduler, Time, TimerEvent};
use icn_core::face::FaceId;

/// Events this harness schedules beyond the core's closed `TimerEvent`
/// set: link-medium delivery and the observed-rate window roll.
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    Core(TimerEvent),
    /// A packet arrives at `to` after the link's propagation delay.
    LinkArrival {
        to: FaceId,
        packet: icn_core::packet::Packet,
    },
    /// Periodic `updateInterval` boundary for a face's observed-rate
    /// window (§4.C.2).
    RateWindowRoll(FaceId),
    /// A PIT entry's lifetime has elapsed; the forwarder retransmits if
    /// the entry is still outstanding (§3.1, §7).
    PitExpire(u64),
}

struct HeapEntry {
    time: Time,
    seq: u64,
    event: HarnessEvent,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest time first.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Owns simulated time and the pending-event queue. Implements
/// [`icn_core::clock::Scheduler`] so every core component can arm timers
/// through it without knowing about the harness's own event types.
pub struct EventLoop {
    now: Time,
    queue: BinaryHeap<HeapEntry>,
    seq: u64,
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop {
            now: Time::ZERO,
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }

    pub fn schedule_harness(&mut self, delay: Duration, event: HarnessEvent) {
        let time = self.now + delay;
        self.queue.push(HeapEntry {
            time,
            seq: self.seq,
            event,
        });
        self.seq += 1;
    }

    /// Pops the next event and advances `now` to its time. Returns `None`
    /// once the queue is drained.
    pub fn pop(&mut self) -> Option<(Time, HarnessEvent)> {
        let entry = self.queue.pop()?;
        self.now = entry.time;
        Some((entry.time, entry.event))
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Non-destructive look at the next event's time, without popping it.
    pub fn peek_time(&self) -> Option<Time> {
        self.queue.peek().map(|e| e.time)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for EventLoop {
    fn now(&self) -> Time {
        self.now
    }

    fn schedule(&mut self, delay: Duration, event: TimerEvent) {
        self.schedule_harness(delay, HarnessEvent::Core(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_pop_in_nondecreasing_time_order() {
        let mut loop_ = EventLoop::new();
        loop_.schedule_harness(Duration::from_millis(30), HarnessEvent::RateWindowRoll(FaceId::new(0)));
        loop_.schedule_harness(Duration::from_millis(10), HarnessEvent::RateWindowRoll(FaceId::new(1)));
        loop_.schedule_harness(Duration::from_millis(20), HarnessEvent::RateWindowRoll(FaceId::new(2)));

        let (t1, e1) = loop_.pop().unwrap();
        let (t2, _) = loop_.pop().unwrap();
        let (t3, _) = loop_.pop().unwrap();
        assert!(t1 <= t2 && t2 <= t3);
        assert!(matches!(e1, HarnessEvent::RateWindowRoll(f) if f == FaceId::new(1)));
    }

    #[test]
    fn ties_break_by_schedule_order() {
        let mut loop_ = EventLoop::new();
        loop_.schedule_harness(Duration::from_millis(5), HarnessEvent::RateWindowRoll(FaceId::new(0)));
        loop_.schedule_harness(Duration::from_millis(5), HarnessEvent::RateWindowRoll(FaceId::new(1)));
        let (_, first) = loop_.pop().unwrap();
        assert!(matches!(first, HarnessEvent::RateWindowRoll(f) if f == FaceId::new(0)));
    }
}
