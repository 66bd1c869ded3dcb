//! Time-ordered event scheduling.
//!
//! This module provides the outer simulator's scheduling surface. It includes:
//! 1. **Events:** The two kinds of timed callbacks a controller deals with (access events and
//!    tick events).
//! 2. **Contract:** The `Scheduler` trait the controller schedules, reschedules and reports
//!    completions through.
//! 3. **Queue:** `EventQueue`, a deterministic min-heap keyed by `(cycle, insertion order)`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::common::{MemCtrlError, Result};
use crate::soc::memory::{AccessEvent, ControllerId, DoneNotice, TickId};

/// A timed callback waiting in the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduledEvent {
    /// A recorded access; firing it submits the request to its controller.
    Access(AccessEvent),
    /// A controller's tick event; firing it runs the tick bridge.
    Tick {
        /// Controller driven by the tick.
        controller: ControllerId,
        /// Tick slot in the controller's arena.
        tick: TickId,
    },
}

/// Scheduling surface the controller talks to.
pub trait Scheduler {
    /// Cycle of the event currently being dispatched.
    fn now(&self) -> u64;

    /// Schedules `event` at absolute cycle `cycle`.
    ///
    /// # Errors
    ///
    /// [`MemCtrlError::ScheduleInPast`] if `cycle` precedes [`now`](Self::now).
    fn schedule(&mut self, cycle: u64, event: ScheduledEvent) -> Result<()>;

    /// Delivers the completion of an access to its downstream consumers.
    fn done(&mut self, notice: DoneNotice);
}

#[derive(Debug)]
struct Entry {
    cycle: u64,
    seq: u64,
    event: ScheduledEvent,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cycle == other.cycle && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: `BinaryHeap` is a max-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.cycle, other.seq).cmp(&(self.cycle, self.seq))
    }
}

/// Deterministic, strictly time-ordered event queue.
///
/// Events scheduled for the same cycle fire in the order they were scheduled.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Entry>,
    now: u64,
    seq: u64,
    completions: Vec<DoneNotice>,
    delivered: u64,
}

impl EventQueue {
    /// Creates an empty queue at cycle 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the earliest event and moves the clock to its cycle.
    pub fn pop(&mut self) -> Option<(u64, ScheduledEvent)> {
        let entry = self.heap.pop()?;
        self.now = entry.cycle;
        Some((entry.cycle, entry.event))
    }

    /// Cycle of the earliest pending event.
    pub fn peek_cycle(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.cycle)
    }

    /// Pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Completion notices delivered so far, oldest first.
    pub fn completions(&self) -> &[DoneNotice] {
        &self.completions
    }

    /// Completion notices delivered since the queue was created, drained or not.
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Drains the completion notices delivered so far.
    pub fn take_completions(&mut self) -> Vec<DoneNotice> {
        std::mem::take(&mut self.completions)
    }
}

impl Scheduler for EventQueue {
    fn now(&self) -> u64 {
        self.now
    }

    fn schedule(&mut self, cycle: u64, event: ScheduledEvent) -> Result<()> {
        if cycle < self.now {
            return Err(MemCtrlError::ScheduleInPast {
                cycle,
                now: self.now,
            });
        }
        self.heap.push(Entry {
            cycle,
            seq: self.seq,
            event,
        });
        self.seq += 1;
        Ok(())
    }

    fn done(&mut self, notice: DoneNotice) {
        self.delivered += 1;
        self.completions.push(notice);
    }
}
