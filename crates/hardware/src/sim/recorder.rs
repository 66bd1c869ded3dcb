//! Per-requester event recorders.
//!
//! During the bound phase a controller does not simulate device timing; it only hands back
//! its committed estimate and leaves a [`TimingRecord`] in the requester's recorder. The
//! weave phase later drains the recorders and schedules the attached access events.

use std::collections::VecDeque;

use crate::common::{PhysAddr, RequestType};
use crate::soc::memory::AccessEvent;

/// Timing information left behind by one recorded access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimingRecord {
    /// Accessed physical address.
    pub addr: PhysAddr,
    /// Cycle the request reached the controller.
    pub req_cycle: u64,
    /// Completion cycle committed to the requester.
    pub resp_cycle: u64,
    /// Request type.
    pub req_type: RequestType,
    /// Event that simulates the access in the weave phase.
    pub event: AccessEvent,
}

/// FIFO of timing records produced by one requester.
#[derive(Debug, Default)]
pub struct EventRecorder {
    records: VecDeque<TimingRecord>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    pub const fn new() -> Self {
        Self {
            records: VecDeque::new(),
        }
    }

    /// Appends a record.
    pub fn push_record(&mut self, record: TimingRecord) {
        self.records.push_back(record);
    }

    /// Removes the oldest record.
    pub fn pop_record(&mut self) -> Option<TimingRecord> {
        self.records.pop_front()
    }

    /// Oldest record, without removing it.
    pub fn record(&self) -> Option<&TimingRecord> {
        self.records.front()
    }

    /// Records waiting to be drained.
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Drops every record.
    pub fn clear_records(&mut self) {
        self.records.clear();
    }

    /// Removes all records, oldest first.
    pub fn drain_records(&mut self) -> impl Iterator<Item = TimingRecord> + '_ {
        self.records.drain(..)
    }
}
