//! Memory controller timing bridge.
//!
//! The controller sits between a fast, phase-based outer simulator and a cycle-level device
//! timing oracle. It provides:
//! 1. **Bound phase (`access`):** Grants the coherence state, commits `cycle + min_latency` as
//!    the completion estimate, and records an access event for the weave phase.
//! 2. **Submission (`enqueue`):** Issues the access to the oracle, retrying one cycle later on
//!    contention, and arms the tick event for the first in-flight request.
//! 3. **Tick bridge (`tick`):** Pulls the oracle clock forward to the outer simulator's cycle
//!    and picks the next wake-up: poll every cycle while the tracked request is pending, or
//!    jump to the next request's minimum finish cycle.
//! 4. **Completion (`request_complete`):** Records the realized latency and releases the
//!    access event to its consumers, never dated before its committed minimum finish.
//!
//! The oracle never runs ahead of the outer simulator: its clock only moves in
//! [`MemoryController::tick`] and [`MemoryController::enqueue`], and only up to `cycle + 1`.

use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use super::access_event::{AccessEvent, ControllerId};
use super::inflight::{InflightEntry, InflightTable, Request};
use super::oracle::{
    DeviceOracle, OracleRequest, RequestId, RequestStatus, TagGenerator, build_oracle,
};
use super::tick_event::{TickArena, TickId, TickState};
use crate::common::constants::{MEMTRACE_DATA_DIGITS, STATS_HEADER_PREFIX};
use crate::common::{
    CoherenceState, MemCtrlError, MemReq, RequestType, Result, STATS_SEPARATOR,
};
use crate::config::{ControllerConfig, OracleConfig};
use crate::sim::{ScheduledEvent, Scheduler, SimContext, TimingRecord};
use crate::stats::{AggregateStat, MemCtrlStats};

/// First tag handed to the oracle.
const FIRST_TAG: u64 = 1000;

/// Memory controller bridging phase-based simulation and a cycle-level device oracle.
pub struct MemoryController {
    id: ControllerId,
    name: String,
    min_latency: u64,
    domain: u32,
    capacity_mb: u32,
    line_size: u32,

    oracle: Box<dyn DeviceOracle>,
    tags: TagGenerator,
    ignore_data: bool,
    event_driven: bool,

    inflight: InflightTable,
    memory_histogram: HashMap<u64, u64>,

    cur_cycle: u64,
    update_cycle: u64,

    ticks: TickArena,
    next_sched_event: Option<TickId>,
    next_sched_request: Option<RequestId>,

    stats: MemCtrlStats,
    stats_path: PathBuf,
    memtrace: Option<BufWriter<File>>,
}

impl MemoryController {
    /// Creates a controller backed by the oracle `oracle_config` selects.
    ///
    /// # Errors
    ///
    /// [`MemCtrlError::OracleUnavailable`] if the configured oracle is not linked into this
    /// build, [`MemCtrlError::Config`] for invalid settings, and [`MemCtrlError::Io`] if the
    /// statistics log cannot be created.
    pub fn new(
        id: ControllerId,
        config: &ControllerConfig,
        oracle_config: &OracleConfig,
        ctx: &SimContext,
    ) -> Result<Self> {
        oracle_config.validate()?;
        let oracle = build_oracle(oracle_config)?;
        Self::with_oracle(id, config, oracle_config, oracle, ctx)
    }

    /// Creates a controller around an already-built oracle.
    ///
    /// Truncates the statistics log and writes its header.
    pub fn with_oracle(
        id: ControllerId,
        config: &ControllerConfig,
        oracle_config: &OracleConfig,
        oracle: Box<dyn DeviceOracle>,
        ctx: &SimContext,
    ) -> Result<Self> {
        config.validate()?;

        info!(
            "[{}] reading technology config {}",
            config.name,
            config.resolved_tech_path()
        );
        info!(
            "[{}] {} oracle, {:.1} MHz cpu, {:.1} MHz bus, min latency {}",
            config.name,
            oracle.name(),
            oracle_config.cpu_freq_mhz,
            oracle_config.bus_freq_mhz,
            config.min_latency
        );
        if oracle_config.event_driven {
            warn!(
                "[{}] EventDriven requested; the tick bridge still drives the oracle",
                config.name
            );
        }

        let stats_path = ctx.stats_path(&config.name, &config.output_file);
        let mut log = File::create(&stats_path)?;
        writeln!(log, "{STATS_HEADER_PREFIX} {}", config.name)?;
        writeln!(log, "{STATS_SEPARATOR}")?;
        info!("[{}] statistics log {}", config.name, stats_path.display());

        let memtrace = if config.memtrace {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(ctx.memtrace_path())?;
            Some(BufWriter::new(file))
        } else {
            None
        };

        Ok(Self {
            id,
            name: config.name.clone(),
            min_latency: config.min_latency,
            domain: config.domain,
            capacity_mb: config.capacity_mb,
            line_size: ctx.line_size(),
            oracle,
            tags: TagGenerator::new(FIRST_TAG),
            ignore_data: oracle_config.ignore_data,
            event_driven: oracle_config.event_driven,
            inflight: InflightTable::new(),
            memory_histogram: HashMap::new(),
            cur_cycle: 0,
            update_cycle: 0,
            ticks: TickArena::new(),
            next_sched_event: None,
            next_sched_request: None,
            stats: MemCtrlStats::default(),
            stats_path,
            memtrace,
        })
    }

    /// Bound-phase entry point: grants the coherence state and returns the committed
    /// completion cycle.
    ///
    /// When the requester has an active recorder (and the request is not a clean eviction
    /// discarded on its way to main memory), an access event is recorded for the weave phase.
    ///
    /// # Arguments
    ///
    /// * `req` - The request; its `state` slot receives the granted coherence state.
    /// * `ctx` - Simulation context holding the recorders.
    ///
    /// # Returns
    ///
    /// `req.cycle + min_latency`.
    ///
    /// # Errors
    ///
    /// [`MemCtrlError::NonPositiveLatency`] if the committed cycle does not follow the request
    /// cycle.
    pub fn access(&mut self, req: &mut MemReq, ctx: &mut SimContext) -> Result<u64> {
        req.state = match req.req_type {
            RequestType::CleanEvict => {
                self.stats.clean_evicts.inc();
                CoherenceState::Invalid
            }
            RequestType::DirtyEvict => {
                self.stats.dirty_evicts.inc();
                CoherenceState::Invalid
            }
            RequestType::SharedRead if req.no_excl => CoherenceState::Shared,
            RequestType::SharedRead => CoherenceState::Exclusive,
            RequestType::ExclusiveRead => CoherenceState::Modified,
        };

        let resp_cycle = req.cycle.saturating_add(self.min_latency);
        if resp_cycle <= req.cycle {
            return Err(MemCtrlError::NonPositiveLatency {
                req: req.cycle,
                resp: resp_cycle,
            });
        }

        if !ctx.has_dram_cache() && req.req_type == RequestType::CleanEvict {
            return Ok(resp_cycle);
        }
        let addr = req.line_addr.to_phys(ctx.line_bits());
        let Some(recorder) = ctx.recorder_mut(req.src_id) else {
            return Ok(resp_cycle);
        };

        let write = req.req_type.is_write();
        let mut event = AccessEvent::new(self.id, addr, write, req.src_id, self.domain);
        event.set_min_start_cycle(req.cycle);
        recorder.push_record(TimingRecord {
            addr,
            req_cycle: req.cycle,
            resp_cycle,
            req_type: req.req_type,
            event,
        });

        if let Some(out) = self.memtrace.as_mut() {
            let tag = if write { "W" } else { "R" };
            writeln!(
                out,
                "{} {tag} {addr} {:0>width$}",
                req.cycle,
                "",
                width = MEMTRACE_DATA_DIGITS
            )?;
        }

        Ok(resp_cycle)
    }

    /// Moves the oracle clock to `target`, handling every completion it reports on the way.
    fn sync_oracle(&mut self, target: u64, sched: &mut dyn Scheduler) -> Result<()> {
        if target < self.update_cycle {
            return Err(MemCtrlError::ClockRegression {
                ctrl: self.name.clone(),
                current: self.update_cycle,
                target,
            });
        }
        let completions = self.oracle.advance(target - self.update_cycle);
        self.update_cycle = target;
        for completion in completions {
            self.cur_cycle = completion.cycle;
            let _ = self.request_complete(completion.id, sched)?;
        }
        self.cur_cycle = target;
        Ok(())
    }

    /// Weave-phase submission of a running access event at `cycle`.
    ///
    /// On contention the event is rescheduled for `cycle + 1` and nothing else changes.
    pub fn enqueue(
        &mut self,
        mut event: AccessEvent,
        cycle: u64,
        sched: &mut dyn Scheduler,
    ) -> Result<()> {
        let request = OracleRequest {
            id: self.tags.peek(),
            address: event.addr(),
            direction: event.direction(),
            status: RequestStatus::Incomplete,
            data: (!self.ignore_data).then(|| vec![0; self.line_size as usize]),
        };

        self.sync_oracle(cycle + 1, sched)?;

        if !self.oracle.is_issuable(&request) {
            debug!(
                "[{}] {} access to {} requeued at {}",
                self.name,
                event.direction().tag(),
                event.addr(),
                cycle + 1
            );
            event.requeue()?;
            return sched.schedule(cycle + 1, ScheduledEvent::Access(event));
        }

        let id = self.tags.commit();
        let record = Request {
            id,
            address: request.address,
            direction: request.direction,
            issue_cycle: cycle,
            min_finish: cycle + self.min_latency,
            status: RequestStatus::Incomplete,
        };
        if !self.oracle.issue(request) {
            return Err(MemCtrlError::IssueRejected {
                ctrl: self.name.clone(),
                id: id.0,
            });
        }
        self.stats.issued.inc();
        self.update_footprint(record.address.val());

        debug!(
            "[{}] issued {} {} {} at {}, {} in flight",
            self.name,
            id,
            record.direction.tag(),
            record.address,
            cycle,
            self.inflight.len() + 1
        );

        event.hold()?;
        self.inflight.push(InflightEntry {
            request: record,
            event,
        });

        if self.next_sched_event.is_none() {
            self.arm_tick(cycle, sched)?;
        }
        Ok(())
    }

    /// Address histogram, footprint and reuse-histogram bookkeeping for an issued access.
    fn update_footprint(&mut self, addr: u64) {
        let stats = &mut self.stats;
        match self.memory_histogram.get_mut(&addr) {
            None => {
                let _ = self.memory_histogram.insert(addr, 1);
                stats.addresses.inc();
                stats.footprint.add(u64::from(self.line_size));
                stats.address_reuse_hist.inc(1, 1);
            }
            Some(count) => {
                // Order matters: the old bucket must still hold this address.
                stats.address_reuse_hist.dec(MemCtrlStats::reuse_bucket(*count));
                *count += 1;
                stats.address_reuse_hist.inc(MemCtrlStats::reuse_bucket(*count), 1);
            }
        }
    }

    /// Acquires a tick event and arms it for the oldest in-flight request.
    fn arm_tick(&mut self, cycle: u64, sched: &mut dyn Scheduler) -> Result<()> {
        let Some(front) = self.inflight.front() else {
            return Ok(());
        };
        let (front_id, front_finish) = (front.request.id, front.request.min_finish);
        let when = front_finish.max(cycle + 1);

        let tick = self.ticks.acquire(self.id, self.domain);
        self.ticks.get_mut(tick)?.enqueue()?;
        sched.schedule(
            when,
            ScheduledEvent::Tick {
                controller: self.id,
                tick,
            },
        )?;
        self.next_sched_event = Some(tick);
        self.next_sched_request = Some(front_id);
        trace!("[{}] {} armed for {} at {}", self.name, tick, front_id, when);
        Ok(())
    }

    /// Tick bridge: advances the oracle to `cycle + 1` and returns the next wake-up cycle,
    /// or 0 once nothing is in flight.
    ///
    /// # Errors
    ///
    /// [`MemCtrlError::NoActiveTick`] if no tick event is driving this controller.
    pub fn tick(&mut self, cycle: u64, sched: &mut dyn Scheduler) -> Result<u64> {
        if self.next_sched_event.is_none() {
            return Err(MemCtrlError::NoActiveTick(self.name.clone()));
        }
        self.sync_oracle(cycle + 1, sched)?;

        if let Some(tracked) = self.next_sched_request {
            trace!("[{}] {} pending at {}, polling", self.name, tracked, cycle);
            return Ok(cycle + 1);
        }

        let Some(front) = self.inflight.front() else {
            self.next_sched_event = None;
            trace!("[{}] idle at {}", self.name, cycle);
            return Ok(0);
        };
        let (front_id, min_finish) = (front.request.id, front.request.min_finish);
        self.next_sched_request = Some(front_id);
        let next = if cycle >= min_finish {
            cycle + 1
        } else {
            min_finish
        };
        trace!("[{}] tracking {} from {}, next {}", self.name, front_id, cycle, next);
        Ok(next)
    }

    /// Fires tick event `tick` at `cycle`: runs the bridge and reschedules or recycles it.
    pub fn simulate_tick(
        &mut self,
        tick: TickId,
        cycle: u64,
        sched: &mut dyn Scheduler,
    ) -> Result<()> {
        match self.ticks.get(tick)?.state() {
            TickState::Queued => {
                self.ticks.get_mut(tick)?.start()?;
                let next = self.tick(cycle, sched)?;
                let slot = self.ticks.get_mut(tick)?;
                if next == 0 {
                    slot.finish()?;
                    self.recycle_event(tick)
                } else {
                    slot.requeue()?;
                    sched.schedule(
                        next,
                        ScheduledEvent::Tick {
                            controller: self.id,
                            tick,
                        },
                    )
                }
            }
            TickState::Annulled => {
                self.ticks.get_mut(tick)?.drain()?;
                self.recycle_event(tick)
            }
            state => Err(MemCtrlError::EventState {
                event: "tick event",
                op: "simulate",
                state: state.to_string(),
            }),
        }
    }

    /// Returns an idle tick event to the free list.
    ///
    /// # Errors
    ///
    /// [`MemCtrlError::TickRecycle`] if `tick` still drives the oracle.
    pub fn recycle_event(&mut self, tick: TickId) -> Result<()> {
        if self.next_sched_event == Some(tick) {
            return Err(MemCtrlError::TickRecycle {
                ctrl: self.name.clone(),
                tick: tick.0,
            });
        }
        self.ticks.recycle(tick)?;
        trace!("[{}] {} recycled, {} free", self.name, tick, self.ticks.free_len());
        Ok(())
    }

    /// Cancels the active tick event.
    ///
    /// The event stays in the scheduler, marked annulled, and recycles itself when it fires.
    /// In-flight requests keep waiting; the next [`enqueue`](Self::enqueue) arms a fresh tick
    /// for the oldest one. Returns `false` if no tick was active.
    pub fn annul_tick(&mut self) -> Result<bool> {
        let Some(tick) = self.next_sched_event.take() else {
            return Ok(false);
        };
        self.ticks.get_mut(tick)?.annul()?;
        self.next_sched_request = None;
        debug!("[{}] {} annulled, {} in flight", self.name, tick, self.inflight.len());
        Ok(true)
    }

    /// Completion callback for request `id`, reported by the oracle at `cur_cycle`.
    ///
    /// The statistics take the realized latency, `cur_cycle + 1 - start`. Consumers are told
    /// the access finished no earlier than its committed minimum finish and no earlier than
    /// the scheduler's current cycle, so a device faster than `min_latency` never lets the
    /// outer simulator observe a completion before the cycle `access` promised.
    ///
    /// # Errors
    ///
    /// [`MemCtrlError::EmptyInflight`] or [`MemCtrlError::MissingInflight`] if `id` is not in
    /// flight.
    pub fn request_complete(&mut self, id: RequestId, sched: &mut dyn Scheduler) -> Result<bool> {
        if self.inflight.is_empty() {
            return Err(MemCtrlError::EmptyInflight(self.name.clone()));
        }
        let Some(InflightEntry { request, mut event }) = self.inflight.take(id) else {
            return Err(MemCtrlError::MissingInflight {
                ctrl: self.name.clone(),
                id: id.0,
            });
        };

        let realized = self.cur_cycle + 1;
        let latency = realized.saturating_sub(event.start_cycle());
        if event.is_write() {
            self.stats.writes.inc();
            self.stats.total_write_latency.add(latency);
        } else {
            self.stats.reads.inc();
            self.stats.total_read_latency.add(latency);
            self.stats
                .latency_hist
                .inc(MemCtrlStats::latency_bucket(latency), 1);
        }

        let done_cycle = realized.max(request.min_finish).max(sched.now());
        event.release()?;
        sched.done(event.done(done_cycle)?);

        if self.next_sched_request == Some(id) {
            self.next_sched_request = None;
        }

        debug!(
            "[{}] {} {} {} done at {} (device {}, {} cycles), {} in flight",
            self.name,
            id,
            request.direction.tag(),
            request.address,
            done_cycle,
            realized,
            latency,
            self.inflight.len()
        );
        Ok(true)
    }

    /// Appends the oracle's statistics, the controller counters and a separator to the log.
    pub fn print_stats(&mut self) -> Result<()> {
        if let Some(out) = self.memtrace.as_mut() {
            out.flush()?;
        }
        let mut out = OpenOptions::new().append(true).open(&self.stats_path)?;
        out.write_all(self.oracle.dump_stats().as_bytes())?;
        write!(out, "{}", self.stats.to_aggregate(&self.name))?;
        writeln!(out, "{STATS_SEPARATOR}")?;
        Ok(())
    }

    /// Registers the controller's statistics group under `parent`.
    pub fn init_stats(&self, parent: &mut AggregateStat) {
        parent.append(self.stats.to_aggregate(&self.name));
    }

    /// Controller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Controller id.
    pub const fn id(&self) -> ControllerId {
        self.id
    }

    /// Minimum committed latency.
    pub const fn min_latency(&self) -> u64 {
        self.min_latency
    }

    /// Configured capacity in MiB.
    pub const fn capacity_mb(&self) -> u32 {
        self.capacity_mb
    }

    /// Returns `true` if the device model was configured event-driven.
    pub const fn event_driven(&self) -> bool {
        self.event_driven
    }

    /// Statistics collected so far.
    pub const fn stats(&self) -> &MemCtrlStats {
        &self.stats
    }

    /// Requests currently in flight.
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    /// In-flight table, oldest first.
    pub const fn inflight(&self) -> &InflightTable {
        &self.inflight
    }

    /// Cycle the oracle clock was last synchronized to.
    pub const fn update_cycle(&self) -> u64 {
        self.update_cycle
    }

    /// Oracle cycle as seen by the last completion or synchronization.
    pub const fn cur_cycle(&self) -> u64 {
        self.cur_cycle
    }

    /// Tick event currently driving the oracle.
    pub const fn active_tick(&self) -> Option<TickId> {
        self.next_sched_event
    }

    /// Request the tick bridge is waiting on.
    pub const fn tracked_request(&self) -> Option<RequestId> {
        self.next_sched_request
    }

    /// State of tick slot `tick`.
    pub fn tick_state(&self, tick: TickId) -> Result<TickState> {
        Ok(self.ticks.get(tick)?.state())
    }

    /// Tick events on the free list.
    pub fn free_ticks(&self) -> usize {
        self.ticks.free_len()
    }

    /// Tick events ever allocated.
    pub fn allocated_ticks(&self) -> usize {
        self.ticks.allocated()
    }

    /// Distinct addresses issued so far.
    pub fn distinct_addresses(&self) -> usize {
        self.memory_histogram.len()
    }

    /// Times `addr` was issued.
    pub fn address_count(&self, addr: u64) -> u64 {
        self.memory_histogram.get(&addr).copied().unwrap_or(0)
    }

    /// Path of the statistics log.
    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }

    /// The device oracle.
    pub fn oracle(&self) -> &dyn DeviceOracle {
        self.oracle.as_ref()
    }
}

impl fmt::Debug for MemoryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryController")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("oracle", &self.oracle.name())
            .field("min_latency", &self.min_latency)
            .field("inflight", &self.inflight.len())
            .field("update_cycle", &self.update_cycle)
            .field("next_sched_event", &self.next_sched_event)
            .field("next_sched_request", &self.next_sched_request)
            .finish_non_exhaustive()
    }
}
