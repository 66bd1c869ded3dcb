//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components of the simulated memory system. Only the main
//! memory side is modelled: the controller, its events and its device timing oracles.

/// Memory controller and device timing oracles.
pub mod memory;
