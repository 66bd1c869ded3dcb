//! Common utilities and types used throughout the memory-controller model.
//!
//! This module provides the building blocks shared by every other module. It includes:
//! 1. **Address Types:** Strong types for line indices and physical addresses.
//! 2. **Constants:** Histogram geometry and statistics-log format.
//! 3. **Request Types:** Request classification, directions and coherence states.
//! 4. **Error Handling:** The crate-wide error enum and `Result` alias.

/// Address type definitions (line and physical addresses).
pub mod addr;

/// Common constants used throughout the controller.
pub mod constants;

/// Memory request type definitions.
pub mod data;

/// Error types.
pub mod error;

pub use addr::{LineAddr, PhysAddr};
pub use constants::{BIN_SIZE, NUM_BINS, STATS_SEPARATOR};
pub use data::{CoherenceState, Direction, MemReq, RequestType};
pub use error::{MemCtrlError, Result};
