//! In-flight request table.
//!
//! Tracks every request accepted by the device and not yet completed, in issue order. The
//! tick bridge only ever looks at the front to pick its next wake-up; completions remove
//! entries by tag with a linear scan (the table stays small).

use super::access_event::AccessEvent;
use super::oracle::{RequestId, RequestStatus};
use crate::common::{Direction, PhysAddr};

/// Controller-side record of an issued request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Tag shared with the oracle.
    pub id: RequestId,
    /// Accessed address.
    pub address: PhysAddr,
    /// Read or write.
    pub direction: Direction,
    /// Cycle the request was issued.
    pub issue_cycle: u64,
    /// Earliest cycle it may complete (`issue_cycle + min_latency`).
    pub min_finish: u64,
    /// Completion status.
    pub status: RequestStatus,
}

/// A request paired with the access event waiting on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InflightEntry {
    /// The issued request.
    pub request: Request,
    /// The held access event.
    pub event: AccessEvent,
}

/// Issue-ordered table of outstanding requests.
#[derive(Debug, Default)]
pub struct InflightTable {
    entries: Vec<InflightEntry>,
}

impl InflightTable {
    /// Creates an empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a newly issued request.
    pub fn push(&mut self, entry: InflightEntry) {
        self.entries.push(entry);
    }

    /// Oldest outstanding request.
    pub fn front(&self) -> Option<&InflightEntry> {
        self.entries.first()
    }

    /// Removes and returns the entry tagged `id`.
    pub fn take(&mut self, id: RequestId) -> Option<InflightEntry> {
        let pos = self.entries.iter().position(|e| e.request.id == id)?;
        let mut entry = self.entries.remove(pos);
        entry.request.status = RequestStatus::Complete;
        Some(entry)
    }

    /// Returns `true` if `id` is outstanding.
    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.iter().any(|e| e.request.id == id)
    }

    /// Outstanding requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in issue order.
    pub fn iter(&self) -> impl Iterator<Item = &InflightEntry> {
        self.entries.iter()
    }
}
