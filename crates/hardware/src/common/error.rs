//! Controller error definitions.
//!
//! This module defines every failure the controller can report. It provides:
//! 1. **Integration Failures:** Configuring an oracle that is not linked into this build.
//! 2. **Invariant Violations:** Bookkeeping or causality bugs in the time-domain bridge.
//! 3. **Environment Failures:** Configuration, trace and statistics-log I/O.
//!
//! All variants are fatal to a simulation run. Device contention is not an error and never
//! shows up here: the controller retries the access one cycle later.

use thiserror::Error;

/// Errors raised by the memory controller and its simulation plumbing.
#[derive(Debug, Error)]
pub enum MemCtrlError {
    /// The configured device oracle is not available in this build.
    #[error("cannot use device oracle `{0}`: this build does not link it")]
    OracleUnavailable(String),

    /// A request type outside `GETS`/`GETX`/`PUTS`/`PUTX`.
    #[error("unknown memory request type `{0}`")]
    UnknownRequestType(String),

    /// The committed response cycle does not come after the request cycle.
    #[error("response cycle {resp} does not follow request cycle {req}")]
    NonPositiveLatency {
        /// Request cycle.
        req: u64,
        /// Computed response cycle.
        resp: u64,
    },

    /// The oracle completed a request the controller is not tracking.
    #[error("[{ctrl}] completion of request {id} has no matching in-flight entry")]
    MissingInflight {
        /// Controller name.
        ctrl: String,
        /// Request tag reported by the oracle.
        id: u64,
    },

    /// The oracle completed a request while nothing was in flight.
    #[error("[{0}] completion delivered with no requests in flight")]
    EmptyInflight(String),

    /// The oracle refused a request it had just reported as issuable.
    #[error("[{ctrl}] oracle rejected request {id} after reporting it issuable")]
    IssueRejected {
        /// Controller name.
        ctrl: String,
        /// Request tag.
        id: u64,
    },

    /// The tick bridge ran without an active tick event.
    #[error("[{0}] tick bridge invoked with no active tick event")]
    NoActiveTick(String),

    /// A tick event was recycled while it still drives the oracle.
    #[error("[{ctrl}] tick event {tick} recycled while still driving the oracle")]
    TickRecycle {
        /// Controller name.
        ctrl: String,
        /// Tick slot index.
        tick: usize,
    },

    /// A tick handle that does not name an allocated slot.
    #[error("unknown tick event {0}")]
    UnknownTick(usize),

    /// The oracle clock would have to move backwards.
    #[error("[{ctrl}] oracle clock at {current} cannot move back to {target}")]
    ClockRegression {
        /// Controller name.
        ctrl: String,
        /// Cycle the oracle has already reached.
        current: u64,
        /// Requested synchronization cycle.
        target: u64,
    },

    /// An event was scheduled before the scheduler's current cycle.
    #[error("event scheduled at cycle {cycle}, but the scheduler is already at {now}")]
    ScheduleInPast {
        /// Requested cycle.
        cycle: u64,
        /// Scheduler time.
        now: u64,
    },

    /// An event lifecycle call made in the wrong state.
    #[error("{event}: called {op} in state {state}")]
    EventState {
        /// Event kind.
        event: &'static str,
        /// Lifecycle operation.
        op: &'static str,
        /// State the event was in.
        state: String,
    },

    /// A controller id that is not registered with the simulator.
    #[error("no memory controller with id {0}")]
    UnknownController(usize),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed memory trace line.
    #[error("trace line {line}: {reason}")]
    TraceParse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Statistics log, memory trace or configuration file I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Configuration JSON could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MemCtrlError>;
