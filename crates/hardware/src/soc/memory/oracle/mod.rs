//! Device timing oracles.
//!
//! The controller treats the device model as an opaque timing oracle. This module provides:
//! 1. **Contract:** The `DeviceOracle` trait (issue check, issue, clock advance, statistics).
//! 2. **Requests:** The oracle-native request and the completion it reports back.
//! 3. **Models:** `FixedLatencyOracle` and `RowBufferOracle`, plus `build_oracle` to pick one
//!    from an [`OracleConfig`].
//!
//! Completions are delivered as the return value of [`DeviceOracle::advance`]; the controller
//! handles each one as the device's completion callback.

/// Fixed-latency device model.
pub mod fixed;

/// Open-row DRAM device model.
pub mod row_buffer;

use std::collections::VecDeque;
use std::fmt;

use crate::common::{Direction, MemCtrlError, PhysAddr, Result};
use crate::config::{OracleConfig, OracleModel};

pub use fixed::FixedLatencyOracle;
pub use row_buffer::RowBufferOracle;

/// Tag identifying one request issued to the oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Completion status of an oracle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RequestStatus {
    /// Built or in flight.
    #[default]
    Incomplete,
    /// Reported complete by the oracle.
    Complete,
}

/// An oracle-native memory request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleRequest {
    /// Tag reported back on completion.
    pub id: RequestId,
    /// Line-aligned physical address.
    pub address: PhysAddr,
    /// Read or write.
    pub direction: Direction,
    /// Completion status.
    pub status: RequestStatus,
    /// Payload bytes; `None` when the device ignores data.
    pub data: Option<Vec<u8>>,
}

/// A completion reported by [`DeviceOracle::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Tag of the completed request.
    pub id: RequestId,
    /// Oracle cycle in which the request completed.
    pub cycle: u64,
}

/// A cycle-level device timing model.
///
/// Implementors keep their own clock, which only moves through [`advance`](Self::advance).
/// A request accepted by [`issue`](Self::issue) must eventually be reported by `advance`,
/// and completions must come out in non-decreasing cycle order.
pub trait DeviceOracle: Send {
    /// Short model name used in logs.
    fn name(&self) -> &'static str;

    /// Current oracle cycle.
    fn now(&self) -> u64;

    /// Returns `true` if `req` can be accepted in the current cycle.
    ///
    /// This is where contention is decided, so a `false` answer counts as a refusal in the
    /// device's statistics.
    fn is_issuable(&mut self, req: &OracleRequest) -> bool;

    /// Accepts `req`; returns `false` if the device refused it.
    fn issue(&mut self, req: OracleRequest) -> bool;

    /// Runs the device for `cycles` cycles and returns the requests completed meanwhile.
    fn advance(&mut self, cycles: u64) -> Vec<Completion>;

    /// Renders the device's internal statistics.
    fn dump_stats(&mut self) -> String;
}

/// Builds the oracle selected by `config`.
///
/// # Errors
///
/// [`MemCtrlError::OracleUnavailable`] for [`OracleModel::External`]: the external device
/// simulator is not linked into this build.
pub fn build_oracle(config: &OracleConfig) -> Result<Box<dyn DeviceOracle>> {
    match config.model {
        OracleModel::Fixed => Ok(Box::new(FixedLatencyOracle::new(
            config.latency,
            config.queue_depth,
        ))),
        OracleModel::RowBuffer => Ok(Box::new(RowBufferOracle::from_config(config))),
        OracleModel::External => Err(MemCtrlError::OracleUnavailable("External".into())),
    }
}

/// Hands out request tags.
///
/// A tag is only consumed once the request is accepted, so a refused and
/// retried request carries the same tag.
#[derive(Debug, Default)]
pub struct TagGenerator {
    next: u64,
}

impl TagGenerator {
    /// Creates a generator whose first tag is `first`.
    pub const fn new(first: u64) -> Self {
        Self { next: first }
    }

    /// Tag the next accepted request will get.
    pub const fn peek(&self) -> RequestId {
        RequestId(self.next)
    }

    /// Consumes the current tag.
    pub const fn commit(&mut self) -> RequestId {
        let id = RequestId(self.next);
        self.next += 1;
        id
    }
}

/// Requests waiting for their ready cycle, in ready order.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    entries: VecDeque<(u64, RequestId)>,
}

impl PendingQueue {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Inserts keeping ready order; equal ready cycles stay in issue order.
    pub(crate) fn push(&mut self, ready: u64, id: RequestId) {
        let pos = self.entries.partition_point(|&(r, _)| r <= ready);
        self.entries.insert(pos, (ready, id));
    }

    /// Pops everything ready before `end`, reporting each at `max(ready, now)`.
    pub(crate) fn drain_until(&mut self, now: u64, end: u64) -> Vec<Completion> {
        let mut done = Vec::new();
        while let Some(&(ready, id)) = self.entries.front() {
            if ready >= end {
                break;
            }
            let _ = self.entries.pop_front();
            done.push(Completion {
                id,
                cycle: ready.max(now),
            });
        }
        done
    }

    pub(crate) fn has_room(&self, depth: usize) -> bool {
        depth == 0 || self.entries.len() < depth
    }
}
