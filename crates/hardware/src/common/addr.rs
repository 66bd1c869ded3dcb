//! Physical and line address types.
//!
//! This module defines strong types for the two address granularities the controller sees:
//! 1. **Line addresses:** What the cache hierarchy hands over (`address >> line_bits`).
//! 2. **Physical addresses:** What the device timing oracle, the histograms and the trace use.
//!
//! Keeping them apart stops a line index from being histogrammed or issued as a byte address.

use std::fmt;

/// A cache-line index as carried by requests from the cache hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LineAddr(pub u64);

/// A byte-granular physical address in the simulated memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysAddr(pub u64);

impl LineAddr {
    /// Creates a new line address from a raw line index.
    #[inline(always)]
    pub const fn new(line: u64) -> Self {
        Self(line)
    }

    /// Returns the raw line index.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Expands the line index into the physical address of the first byte of the line.
    ///
    /// # Arguments
    ///
    /// * `line_bits` - log2 of the cache line size in bytes.
    ///
    /// # Returns
    ///
    /// The line-aligned `PhysAddr`.
    #[inline(always)]
    pub const fn to_phys(self, line_bits: u32) -> PhysAddr {
        PhysAddr(self.0 << line_bits)
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Returns the line index this address falls into.
    #[inline(always)]
    pub const fn line(self, line_bits: u32) -> LineAddr {
        LineAddr(self.0 >> line_bits)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Display for LineAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line:{:#x}", self.0)
    }
}
