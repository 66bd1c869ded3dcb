//! Open-row DRAM device model.
//!
//! This module provides a single-channel DRAM model with one open row:
//! 1. **Row hit:** `t_cas`.
//! 2. **Row closed (cold):** `t_ras + t_cas`.
//! 3. **Row conflict:** `t_pre + t_ras + t_cas`.
//!
//! Requests are serialized on the channel: each one starts when the previous one finished,
//! so completions leave the device in issue order.

use std::fmt::Write as _;

use super::{Completion, DeviceOracle, OracleRequest, PendingQueue};
use crate::common::Direction;
use crate::config::OracleConfig;

/// DRAM-style oracle with a row buffer; models CAS, RAS, and precharge latencies.
#[derive(Debug)]
pub struct RowBufferOracle {
    now: u64,
    last_row: Option<u64>,
    t_cas: u64,
    t_ras: u64,
    t_pre: u64,
    row_mask: u64,
    queue_depth: usize,
    busy_until: u64,
    pending: PendingQueue,
    reads: u64,
    writes: u64,
    refused: u64,
    row_hits: u64,
    row_misses: u64,
    row_conflicts: u64,
}

impl RowBufferOracle {
    /// Creates a row-buffer oracle with the given timing parameters (in cycles).
    ///
    /// # Arguments
    ///
    /// * `t_cas` - Column access strobe latency.
    /// * `t_ras` - Row access strobe latency.
    /// * `t_pre` - Precharge latency.
    /// * `row_bytes` - Bytes per row (power of two).
    /// * `queue_depth` - Pending requests before issue is refused (0 = unbounded).
    ///
    /// # Returns
    ///
    /// A new `RowBufferOracle` with no row currently open.
    pub fn new(t_cas: u64, t_ras: u64, t_pre: u64, row_bytes: u64, queue_depth: usize) -> Self {
        Self {
            now: 0,
            last_row: None,
            t_cas,
            t_ras,
            t_pre,
            row_mask: !(row_bytes - 1),
            queue_depth,
            busy_until: 0,
            pending: PendingQueue::default(),
            reads: 0,
            writes: 0,
            refused: 0,
            row_hits: 0,
            row_misses: 0,
            row_conflicts: 0,
        }
    }

    /// Creates the oracle from a technology configuration.
    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(
            config.t_cas,
            config.t_ras,
            config.t_pre,
            config.row_bytes,
            config.queue_depth,
        )
    }

    /// Service latency of an access to `addr`, updating the open row.
    fn access_latency(&mut self, addr: u64) -> u64 {
        let row = addr & self.row_mask;
        match self.last_row {
            Some(open_row) if open_row == row => {
                self.row_hits += 1;
                self.t_cas
            }
            Some(_) => {
                self.row_conflicts += 1;
                self.last_row = Some(row);
                self.t_pre + self.t_ras + self.t_cas
            }
            None => {
                self.row_misses += 1;
                self.last_row = Some(row);
                self.t_ras + self.t_cas
            }
        }
    }
}

impl DeviceOracle for RowBufferOracle {
    fn name(&self) -> &'static str {
        "row-buffer"
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
        let start = self.now.max(self.busy_until);
        let ready = start + self.access_latency(req.address.val());
        self.busy_until = ready;
        self.pending.push(ready, req.id);
        true
    }

    fn advance(&mut self, cycles: u64) -> Vec<Completion> {
        let end = self.now + cycles;
        let done = self.pending.drain_until(self.now, end);
        self.now = end;
        done
    }

    fn dump_stats(&mut self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "i0.dram.cycles {}", self.now);
        let _ = writeln!(out, "i0.dram.reads {}", self.reads);
        let _ = writeln!(out, "i0.dram.writes {}", self.writes);
        let _ = writeln!(out, "i0.dram.refused {}", self.refused);
        let _ = writeln!(out, "i0.dram.rowHits {}", self.row_hits);
        let _ = writeln!(out, "i0.dram.rowMisses {}", self.row_misses);
        let _ = writeln!(out, "i0.dram.rowConflicts {}", self.row_conflicts);
        let _ = writeln!(out, "i0.dram.pending {}", self.pending.len());
        out
    }
}
