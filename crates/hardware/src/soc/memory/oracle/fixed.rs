//! Fixed-latency device model.
//!
//! Every accepted request completes exactly `latency` cycles after it was issued. The model
//! refuses issue once `queue_depth` requests are pending, which is enough to exercise the
//! controller's contention retry path deterministically.

use std::fmt::Write as _;

use super::{Completion, DeviceOracle, OracleRequest, PendingQueue};
use crate::common::Direction;

/// Deterministic fixed-latency oracle.
#[derive(Debug)]
pub struct FixedLatencyOracle {
    now: u64,
    latency: u64,
    queue_depth: usize,
    pending: PendingQueue,
    reads: u64,
    writes: u64,
    refused: u64,
    completed: u64,
}

impl FixedLatencyOracle {
    /// Creates a fixed-latency oracle.
    ///
    /// # Arguments
    ///
    /// * `latency` - Cycles from issue to completion.
    /// * `queue_depth` - Pending requests before issue is refused (0 = unbounded).
    pub fn new(latency: u64, queue_depth: usize) -> Self {
        Self {
            now: 0,
            latency,
            queue_depth,
            pending: PendingQueue::default(),
            reads: 0,
            writes: 0,
            refused: 0,
            completed: 0,
        }
    }

    /// Requests issued but not yet completed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl DeviceOracle for FixedLatencyOracle {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn now(&self) -> u64 {
        self.now
    }

    fn is_issuable(&mut self, _req: &OracleRequest) -> bool {
        let room = self.pending.has_room(self.queue_depth);
        if !room {
            self.refused += 1;
        }
        room
    }

    fn issue(&mut self, req: OracleRequest) -> bool {
        if !self.pending.has_room(self.queue_depth) {
            return false;
        }
        match req.direction {
            Direction::Read => self.reads += 1,
            Direction::Write => self.writes += 1,
        }
        self.pending.push(self.now + self.latency, req.id);
        true
    }

    fn advance(&mut self, cycles: u64) -> Vec<Completion> {
        let end = self.now + cycles;
        let done = self.pending.drain_until(self.now, end);
        self.now = end;
        self.completed += done.len() as u64;
        done
    }

    fn dump_stats(&mut self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "i0.fixed.cycles {}", self.now);
        let _ = writeln!(out, "i0.fixed.latency {}", self.latency);
        let _ = writeln!(out, "i0.fixed.reads {}", self.reads);
        let _ = writeln!(out, "i0.fixed.writes {}", self.writes);
        let _ = writeln!(out, "i0.fixed.refused {}", self.refused);
        let _ = writeln!(out, "i0.fixed.completed {}", self.completed);
        let _ = writeln!(out, "i0.fixed.pending {}", self.pending.len());
        out
    }
}
