//! Controller statistics collection and reporting.
//!
//! This module tracks the metrics a memory controller exposes for architectural studies. It provides:
//! 1. **Request counts:** Issued, read, write, clean- and dirty-eviction counters.
//! 2. **Latency:** Total read/write latency and a fixed-width read latency histogram.
//! 3. **Footprint:** Distinct addresses touched, bytes touched, and an address-reuse histogram.
//! 4. **Reporting:** A named statistics tree that renders as text or serializes to JSON.

use std::fmt;

use serde::Serialize;

use crate::common::{BIN_SIZE, NUM_BINS};

/// A named scalar counter.
#[derive(Clone, Debug, Serialize)]
pub struct Counter {
    name: &'static str,
    desc: &'static str,
    value: u64,
}

impl Counter {
    /// Creates a zeroed counter.
    pub const fn new(name: &'static str, desc: &'static str) -> Self {
        Self {
            name,
            desc,
            value: 0,
        }
    }

    /// Increments by one.
    #[inline]
    pub const fn inc(&mut self) {
        self.value += 1;
    }

    /// Increments by `delta`.
    #[inline]
    pub const fn add(&mut self, delta: u64) {
        self.value += delta;
    }

    /// Current value.
    #[inline]
    pub const fn get(&self) -> u64 {
        self.value
    }

    /// Short name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// One-line description.
    pub const fn desc(&self) -> &'static str {
        self.desc
    }
}

/// A named vector of counters (histogram).
#[derive(Clone, Debug, Serialize)]
pub struct VectorCounter {
    name: &'static str,
    desc: &'static str,
    bins: Vec<u64>,
}

impl VectorCounter {
    /// Creates a zeroed vector of `len` bins.
    pub fn new(name: &'static str, desc: &'static str, len: usize) -> Self {
        Self {
            name,
            desc,
            bins: vec![0; len],
        }
    }

    /// Adds `delta` to bin `bin`.
    #[inline]
    pub fn inc(&mut self, bin: usize, delta: u64) {
        self.bins[bin] += delta;
    }

    /// Removes one from bin `bin`.
    #[inline]
    pub fn dec(&mut self, bin: usize) {
        debug_assert!(self.bins[bin] > 0, "{}[{bin}] decremented below zero", self.name);
        self.bins[bin] = self.bins[bin].saturating_sub(1);
    }

    /// Value of bin `bin` (0 past the end).
    pub fn get(&self, bin: usize) -> u64 {
        self.bins.get(bin).copied().unwrap_or(0)
    }

    /// All bins.
    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    /// Sum over all bins.
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Short name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// One-line description.
    pub const fn desc(&self) -> &'static str {
        self.desc
    }
}

/// Per-controller statistics.
#[derive(Clone, Debug, Serialize)]
pub struct MemCtrlStats {
    /// Requests accepted by the device.
    pub issued: Counter,
    /// Completed read requests.
    pub reads: Counter,
    /// Completed write requests.
    pub writes: Counter,
    /// Clean evictions received.
    pub clean_evicts: Counter,
    /// Dirty evictions received.
    pub dirty_evicts: Counter,
    /// Sum of realized read latencies.
    pub total_read_latency: Counter,
    /// Sum of realized write latencies.
    pub total_write_latency: Counter,
    /// Bytes of distinct lines touched.
    pub footprint: Counter,
    /// Distinct line addresses touched.
    pub addresses: Counter,
    /// Read latency histogram, `BIN_SIZE` cycles per bucket.
    pub latency_hist: VectorCounter,
    /// Number of addresses currently accessed `i` times (last bucket: `>= NUM_BINS - 1`).
    pub address_reuse_hist: VectorCounter,
}

impl Default for MemCtrlStats {
    fn default() -> Self {
        Self {
            issued: Counter::new("issued", "Issued requests"),
            reads: Counter::new("rd", "Read requests"),
            writes: Counter::new("wr", "Write requests"),
            clean_evicts: Counter::new("PUTS", "Clean Evictions (from lower level)"),
            dirty_evicts: Counter::new("PUTX", "Dirty Evictions (from lower level)"),
            total_read_latency: Counter::new("rdlat", "Total latency experienced by read requests"),
            total_write_latency: Counter::new(
                "wrlat",
                "Total latency experienced by write requests",
            ),
            footprint: Counter::new("footprint", "Total memory footprint in bytes"),
            addresses: Counter::new("addresses", "Total number of distinct memory addresses"),
            latency_hist: VectorCounter::new(
                "mlh",
                "latency histogram for memory requests",
                NUM_BINS,
            ),
            address_reuse_hist: VectorCounter::new(
                "addressReuse",
                "address reuse histogram for memory requests",
                NUM_BINS,
            ),
        }
    }
}

impl MemCtrlStats {
    /// Histogram bucket of a realized latency: `min(latency / BIN_SIZE, NUM_BINS - 1)`.
    #[inline]
    pub fn latency_bucket(latency: u64) -> usize {
        (latency / BIN_SIZE).min(NUM_BINS as u64 - 1) as usize
    }

    /// Reuse-histogram bucket of a per-address access count.
    #[inline]
    pub fn reuse_bucket(count: u64) -> usize {
        count.min(NUM_BINS as u64 - 1) as usize
    }

    /// Mean realized read latency, 0 when nothing was read.
    pub fn avg_read_latency(&self) -> f64 {
        if self.reads.get() == 0 {
            0.0
        } else {
            self.total_read_latency.get() as f64 / self.reads.get() as f64
        }
    }

    /// Mean realized write latency, 0 when nothing was written.
    pub fn avg_write_latency(&self) -> f64 {
        if self.writes.get() == 0 {
            0.0
        } else {
            self.total_write_latency.get() as f64 / self.writes.get() as f64
        }
    }

    /// Builds the statistics group registered under `name`.
    pub fn to_aggregate(&self, name: &str) -> AggregateStat {
        let mut group = AggregateStat::new(name, "Memory controller stats");
        for counter in [
            &self.issued,
            &self.reads,
            &self.writes,
            &self.clean_evicts,
            &self.dirty_evicts,
            &self.total_read_latency,
            &self.total_write_latency,
            &self.footprint,
            &self.addresses,
        ] {
            group.append_counter(counter);
        }
        group.append_vector(&self.latency_hist);
        group.append_vector(&self.address_reuse_hist);
        group
    }
}

/// A node of the statistics tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StatNode {
    /// Single value.
    Scalar {
        /// Stat name.
        name: String,
        /// Description.
        desc: String,
        /// Value.
        value: u64,
    },
    /// Histogram or per-index vector.
    Vector {
        /// Stat name.
        name: String,
        /// Description.
        desc: String,
        /// Bin values.
        bins: Vec<u64>,
    },
    /// Nested group.
    Group(AggregateStat),
}

impl StatNode {
    /// Name of this node.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar { name, .. } | Self::Vector { name, .. } => name,
            Self::Group(group) => group.name(),
        }
    }
}

/// A named group of statistics, possibly nested.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AggregateStat {
    name: String,
    desc: String,
    children: Vec<StatNode>,
}

impl AggregateStat {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            children: Vec::new(),
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Group description.
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Direct children, in registration order.
    pub fn children(&self) -> &[StatNode] {
        &self.children
    }

    /// Appends a snapshot of a scalar counter.
    pub fn append_counter(&mut self, counter: &Counter) {
        self.children.push(StatNode::Scalar {
            name: counter.name().to_owned(),
            desc: counter.desc().to_owned(),
            value: counter.get(),
        });
    }

    /// Appends a snapshot of a vector counter.
    pub fn append_vector(&mut self, vector: &VectorCounter) {
        self.children.push(StatNode::Vector {
            name: vector.name().to_owned(),
            desc: vector.desc().to_owned(),
            bins: vector.bins().to_vec(),
        });
    }

    /// Appends a nested group.
    pub fn append(&mut self, group: Self) {
        self.children.push(StatNode::Group(group));
    }

    /// Looks up a node by dotted path relative to this group (e.g. `"mem-0.rd"`).
    pub fn find(&self, path: &str) -> Option<&StatNode> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let node = self.children.iter().find(|c| c.name() == head)?;
        match (node, rest) {
            (_, None) => Some(node),
            (StatNode::Group(group), Some(rest)) => group.find(rest),
            _ => None,
        }
    }

    /// Looks up a scalar value by dotted path.
    pub fn scalar(&self, path: &str) -> Option<u64> {
        match self.find(path)? {
            StatNode::Scalar { value, .. } => Some(*value),
            _ => None,
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        writeln!(f, "{pad}{}: # {}", self.name, self.desc)?;
        for child in &self.children {
            match child {
                StatNode::Scalar { name, desc, value } => {
                    writeln!(f, "{pad}  {name}: {value} # {desc}")?;
                }
                StatNode::Vector { name, desc, bins } => {
                    let joined = bins
                        .iter()
                        .map(u64::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    writeln!(f, "{pad}  {name}: [{joined}] # {desc}")?;
                }
                StatNode::Group(group) => group.fmt_indented(f, depth + 1)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for AggregateStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
