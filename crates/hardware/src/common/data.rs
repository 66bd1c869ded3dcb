//! Memory Request Types.
//!
//! This module defines the classification of requests arriving from the cache hierarchy.
//! These types are used for the following:
//! 1. **Coherence Response:** Deciding which coherence state the requester ends up in.
//! 2. **Direction:** Mapping a request onto a device read or write.
//! 3. **Statistics Tracking:** Per-type counters (clean and dirty evictions).

use std::fmt;
use std::str::FromStr;

use super::addr::LineAddr;
use super::error::MemCtrlError;

/// Type of request the cache hierarchy sends to main memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// Shared read (`GETS`).
    ///
    /// The requester obtains the line in Shared or Exclusive state.
    SharedRead,

    /// Exclusive read (`GETX`).
    ///
    /// The requester obtains the line in Modified state.
    ExclusiveRead,

    /// Clean eviction (`PUTS`).
    ///
    /// A clean line written back from the last-level cache. Discarded on the way
    /// to main memory unless a DRAM cache sits in between.
    CleanEvict,

    /// Dirty eviction (`PUTX`).
    ///
    /// A modified line written back from the last-level cache.
    DirtyEvict,
}

impl RequestType {
    /// All request types, in wire-code order.
    pub const ALL: [Self; 4] = [
        Self::SharedRead,
        Self::ExclusiveRead,
        Self::CleanEvict,
        Self::DirtyEvict,
    ];

    /// Returns `true` if the device sees this request as a write.
    ///
    /// Both eviction kinds are writes; both reads are reads.
    #[inline]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::CleanEvict | Self::DirtyEvict)
    }

    /// Returns the device-side direction of this request.
    #[inline]
    pub const fn direction(self) -> Direction {
        if self.is_write() {
            Direction::Write
        } else {
            Direction::Read
        }
    }

    /// Returns the protocol mnemonic (`GETS`, `GETX`, `PUTS`, `PUTX`).
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::SharedRead => "GETS",
            Self::ExclusiveRead => "GETX",
            Self::CleanEvict => "PUTS",
            Self::DirtyEvict => "PUTX",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl TryFrom<u8> for RequestType {
    type Error = MemCtrlError;

    /// Decodes a raw request code (`0=GETS`, `1=GETX`, `2=PUTS`, `3=PUTX`).
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| MemCtrlError::UnknownRequestType(code.to_string()))
    }
}

impl FromStr for RequestType {
    type Err = MemCtrlError;

    /// Parses a mnemonic; `R` and `W` are accepted as device-trace shorthands
    /// for a shared read and a dirty eviction.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GETS" | "R" => Ok(Self::SharedRead),
            "GETX" => Ok(Self::ExclusiveRead),
            "PUTS" => Ok(Self::CleanEvict),
            "PUTX" | "W" => Ok(Self::DirtyEvict),
            _ => Err(MemCtrlError::UnknownRequestType(s.to_owned())),
        }
    }
}

/// Direction of a device access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Data flows from the device to the requester.
    Read,
    /// Data flows from the requester to the device.
    Write,
}

impl Direction {
    /// Single-letter tag used by memory traces (`R` or `W`).
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Read => "R",
            Self::Write => "W",
        }
    }
}

/// MESI coherence state granted to the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CoherenceState {
    /// Line not present.
    #[default]
    Invalid,
    /// Read-only, possibly shared with other caches.
    Shared,
    /// Read-only, held by this cache alone.
    Exclusive,
    /// Dirty, held by this cache alone.
    Modified,
}

/// A request from the cache hierarchy to the memory controller.
///
/// `state` is the output slot: [`access`](crate::soc::memory::MemoryController::access)
/// writes the coherence state the requester ends up in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemReq {
    /// Request type.
    pub req_type: RequestType,
    /// Cache-line index being requested.
    pub line_addr: LineAddr,
    /// Cycle at which the request reaches the controller.
    pub cycle: u64,
    /// Coherence state output slot.
    pub state: CoherenceState,
    /// Requester (core) id; selects the event recorder.
    pub src_id: u32,
    /// Set when the requester must not be granted Exclusive on a shared read.
    pub no_excl: bool,
}

impl MemReq {
    /// Creates a request with an `Invalid` state slot and exclusivity allowed.
    pub const fn new(req_type: RequestType, line_addr: LineAddr, cycle: u64, src_id: u32) -> Self {
        Self {
            req_type,
            line_addr,
            cycle,
            state: CoherenceState::Invalid,
            src_id,
            no_excl: false,
        }
    }

    /// Marks the request as not eligible for an Exclusive grant.
    #[must_use]
    pub const fn with_no_excl(mut self) -> Self {
        self.no_excl = true;
        self
    }
}
