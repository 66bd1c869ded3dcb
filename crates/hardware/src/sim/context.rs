//! Simulation context.
//!
//! Everything a controller needs from its surroundings and would otherwise reach through
//! global state: the output directory, the cache line geometry, whether a DRAM cache sits in
//! front of main memory, and the per-requester event recorders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::recorder::EventRecorder;
use crate::common::Result;
use crate::common::constants::MEMTRACE_FILE;
use crate::config::SimContextConfig;

/// Explicit simulation context passed to controllers at construction and on every access.
#[derive(Debug)]
pub struct SimContext {
    output_dir: PathBuf,
    line_size: u32,
    line_bits: u32,
    has_dram_cache: bool,
    phase_length: u64,
    recorders: BTreeMap<u32, EventRecorder>,
}

impl SimContext {
    /// Builds a context from a validated configuration.
    pub fn new(config: &SimContextConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            output_dir: config.output_dir.clone(),
            line_size: config.line_size,
            line_bits: config.line_size.trailing_zeros(),
            has_dram_cache: config.has_dram_cache,
            phase_length: config.phase_length,
            recorders: BTreeMap::new(),
        })
    }

    /// Directory receiving statistics logs and memory traces.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Cache line size in bytes.
    pub const fn line_size(&self) -> u32 {
        self.line_size
    }

    /// log2 of the cache line size.
    pub const fn line_bits(&self) -> u32 {
        self.line_bits
    }

    /// Returns `true` if clean evictions are timed rather than discarded.
    pub const fn has_dram_cache(&self) -> bool {
        self.has_dram_cache
    }

    /// Bound/weave phase length in cycles.
    pub const fn phase_length(&self) -> u64 {
        self.phase_length
    }

    /// Path of the statistics log of controller `name`.
    pub fn stats_path(&self, name: &str, output_file: &str) -> PathBuf {
        self.output_dir.join(format!("{name}-{output_file}"))
    }

    /// Path of the shared memory access trace.
    pub fn memtrace_path(&self) -> PathBuf {
        self.output_dir.join(MEMTRACE_FILE)
    }

    /// Activates event recording for requester `src_id`.
    pub fn enable_recorder(&mut self, src_id: u32) {
        let _ = self.recorders.entry(src_id).or_default();
    }

    /// Stops event recording for `src_id`, returning the recorder with any undrained records.
    pub fn disable_recorder(&mut self, src_id: u32) -> Option<EventRecorder> {
        self.recorders.remove(&src_id)
    }

    /// Recorder of `src_id`, if recording is active.
    pub fn recorder(&self, src_id: u32) -> Option<&EventRecorder> {
        self.recorders.get(&src_id)
    }

    /// Mutable recorder of `src_id`, if recording is active.
    pub fn recorder_mut(&mut self, src_id: u32) -> Option<&mut EventRecorder> {
        self.recorders.get_mut(&src_id)
    }
}
