//! Memory-controller timing model library.
//!
//! This crate bridges a phase-based outer simulator and a cycle-level device timing model:
//! 1. **Controller:** Bound-phase `access`, weave-phase `enqueue`, the tick bridge and the
//!    completion callback.
//! 2. **Oracles:** A pluggable device timing contract with fixed-latency and row-buffer models.
//! 3. **Simulation:** Scheduler, event recorders, simulation context and a phase driver.
//! 4. **Statistics:** Request counters, latency and address-reuse histograms, and the
//!    per-controller statistics log.

/// Common types and constants (addresses, request types, errors).
pub mod common;
/// Controller, device and simulation configuration.
pub mod config;
/// Outer simulation plumbing (scheduler, recorders, context, phase driver).
pub mod sim;
/// Memory controller and device timing oracles.
pub mod soc;
/// Statistics collection and reporting.
pub mod stats;

/// Crate-wide error type and result alias.
pub use crate::common::{MemCtrlError, Result};
/// Configuration types; deserialize from JSON.
pub use crate::config::{ControllerConfig, OracleConfig, SimContextConfig};
/// Simulation driver and context.
pub use crate::sim::{SimContext, Simulator};
/// The memory controller; construct with `MemoryController::new`.
pub use crate::soc::memory::MemoryController;
