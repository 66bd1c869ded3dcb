//! Outer simulation plumbing.
//!
//! This module provides what surrounds a memory controller in a phase-based simulator:
//! 1. **Scheduling:** The `Scheduler` contract and a deterministic `EventQueue`.
//! 2. **Recording:** Per-requester event recorders filled during the bound phase.
//! 3. **Context:** The explicit `SimContext` handed to controllers.
//! 4. **Driving:** Trace parsing and the bound/weave `Simulator`.

/// Simulation context (output directory, line geometry, recorders).
pub mod context;

/// Scheduler contract and time-ordered event queue.
pub mod event_queue;

/// Per-requester timing records.
pub mod recorder;

/// Bound/weave phase driver.
pub mod simulator;

/// Memory trace parsing.
pub mod trace;

pub use context::SimContext;
pub use event_queue::{EventQueue, ScheduledEvent, Scheduler};
pub use recorder::{EventRecorder, TimingRecord};
pub use simulator::{PhaseSummary, Simulator};
pub use trace::{TraceEntry, parse_line, parse_trace, read_trace};
