//! Main Memory Timing.
//!
//! This module implements the memory controller's timing bridge. It provides:
//! 1. **Controller:** `MemoryController`, the bound-phase `access` and weave-phase machinery.
//! 2. **Events:** Access events (per request) and recyclable tick events (per controller).
//! 3. **In-Flight Table:** Requests accepted by the device and not yet completed.
//! 4. **Oracles:** The device timing oracle contract and its built-in models.

/// Access events and completion notices.
pub mod access_event;

/// The memory controller.
pub mod controller;

/// In-flight request table.
pub mod inflight;

/// Device timing oracles.
pub mod oracle;

/// Tick events and their arena.
pub mod tick_event;

pub use access_event::{AccessEvent, ControllerId, DoneNotice, EventState};
pub use controller::MemoryController;
pub use inflight::{InflightEntry, InflightTable, Request};
pub use oracle::{
    Completion, DeviceOracle, FixedLatencyOracle, OracleRequest, RequestId, RequestStatus,
    RowBufferOracle, TagGenerator, build_oracle,
};
pub use tick_event::{TickArena, TickEvent, TickId, TickState};
