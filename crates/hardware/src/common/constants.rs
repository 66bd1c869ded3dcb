//! Global Controller Constants.
//!
//! This module defines constants shared across the controller. It includes:
//! 1. **Histogram Geometry:** Bin width and bin count of the latency and reuse histograms.
//! 2. **Log Format:** Separator and header used by the per-controller statistics log.
//! 3. **Memory Trace:** File name and payload placeholder of the optional access trace.

/// Width, in cycles, of one latency histogram bucket.
pub const BIN_SIZE: u64 = 10;

/// Number of buckets in the latency and address-reuse histograms.
///
/// The last bucket absorbs everything beyond `(NUM_BINS - 1) * BIN_SIZE`.
pub const NUM_BINS: usize = 100;

/// Separator line written after every statistics dump.
pub const STATS_SEPARATOR: &str = "===";

/// Prefix of the header line that opens every statistics log.
pub const STATS_HEADER_PREFIX: &str = "# nvmain stats for";

/// File name of the memory access trace, relative to the output directory.
pub const MEMTRACE_FILE: &str = "memory.trace";

/// Number of hex digits of zero payload written per memory trace line.
pub const MEMTRACE_DATA_DIGITS: usize = 64;
