//! Simulator: owns the context, the controllers and the event queue side by side.
//!
//! The simulator alternates two phases. In the bound phase requests go through
//! [`Simulator::access`], which returns the committed estimate and moves any recorded access
//! events into the queue. In the weave phase [`Simulator::run_until`] dispatches queued events
//! in cycle order, which is where the device oracle actually runs.

use tracing::{debug, info};

use super::context::SimContext;
use super::event_queue::{EventQueue, ScheduledEvent, Scheduler};
use super::trace::TraceEntry;
use crate::common::{MemCtrlError, MemReq, Result};
use crate::config::{ControllerConfig, OracleConfig};
use crate::soc::memory::{ControllerId, DeviceOracle, DoneNotice, MemoryController};
use crate::stats::AggregateStat;

/// Outcome of a phased trace replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseSummary {
    /// Weave phases executed, including the final drain.
    pub phases: u64,
    /// Requests handed to `access`.
    pub requests: u64,
    /// Accesses whose device timing completed.
    pub completed: u64,
    /// Latest committed completion estimate.
    pub last_response: u64,
    /// Cycle of the last dispatched event.
    pub final_cycle: u64,
}

/// Top-level simulator: context, memory controllers and the outer event queue.
#[derive(Debug)]
pub struct Simulator {
    ctx: SimContext,
    controllers: Vec<MemoryController>,
    queue: EventQueue,
}

impl Simulator {
    /// Creates a simulator with no controllers.
    pub fn new(ctx: SimContext) -> Self {
        Self {
            ctx,
            controllers: Vec::new(),
            queue: EventQueue::new(),
        }
    }

    /// Builds a controller from its configuration and registers it.
    pub fn add_controller(
        &mut self,
        config: &ControllerConfig,
        oracle_config: &OracleConfig,
    ) -> Result<ControllerId> {
        let id = ControllerId(self.controllers.len());
        let ctrl = MemoryController::new(id, config, oracle_config, &self.ctx)?;
        self.controllers.push(ctrl);
        Ok(id)
    }

    /// Registers a controller around an already-built oracle.
    pub fn add_controller_with_oracle(
        &mut self,
        config: &ControllerConfig,
        oracle_config: &OracleConfig,
        oracle: Box<dyn DeviceOracle>,
    ) -> Result<ControllerId> {
        let id = ControllerId(self.controllers.len());
        let ctrl = MemoryController::with_oracle(id, config, oracle_config, oracle, &self.ctx)?;
        self.controllers.push(ctrl);
        Ok(id)
    }

    /// Looks up a controller.
    pub fn controller(&self, id: ControllerId) -> Result<&MemoryController> {
        self.controllers
            .get(id.0)
            .ok_or(MemCtrlError::UnknownController(id.0))
    }

    /// Looks up a controller mutably.
    pub fn controller_mut(&mut self, id: ControllerId) -> Result<&mut MemoryController> {
        self.controllers
            .get_mut(id.0)
            .ok_or(MemCtrlError::UnknownController(id.0))
    }

    /// All registered controllers.
    pub fn controllers(&self) -> &[MemoryController] {
        &self.controllers
    }

    /// Simulation context.
    pub const fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Mutable simulation context (e.g. to enable recorders).
    pub const fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    /// The outer event queue.
    pub const fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Current outer-simulator cycle.
    pub fn now(&self) -> u64 {
        self.queue.now()
    }

    /// Bound-phase access through controller `id`.
    ///
    /// Access events recorded for the requester are queued at their minimum start cycle (or
    /// now, if that has already passed).
    pub fn access(&mut self, id: ControllerId, req: &mut MemReq) -> Result<u64> {
        let ctrl = self
            .controllers
            .get_mut(id.0)
            .ok_or(MemCtrlError::UnknownController(id.0))?;
        let resp = ctrl.access(req, &mut self.ctx)?;

        if let Some(recorder) = self.ctx.recorder_mut(req.src_id) {
            for record in recorder.drain_records() {
                let mut event = record.event;
                event.queue()?;
                let at = event.min_start_cycle().max(self.queue.now());
                self.queue.schedule(at, ScheduledEvent::Access(event))?;
            }
        }
        Ok(resp)
    }

    /// Dispatches one event.
    fn dispatch(&mut self, cycle: u64, event: ScheduledEvent) -> Result<()> {
        match event {
            ScheduledEvent::Access(mut event) => {
                let id = event.controller();
                let ctrl = self
                    .controllers
                    .get_mut(id.0)
                    .ok_or(MemCtrlError::UnknownController(id.0))?;
                event.run(cycle)?;
                ctrl.enqueue(event, cycle, &mut self.queue)
            }
            ScheduledEvent::Tick { controller, tick } => {
                let ctrl = self
                    .controllers
                    .get_mut(controller.0)
                    .ok_or(MemCtrlError::UnknownController(controller.0))?;
                ctrl.simulate_tick(tick, cycle, &mut self.queue)
            }
        }
    }

    /// Weave phase: dispatches every event scheduled before `limit`.
    ///
    /// Returns the number of events dispatched.
    pub fn run_until(&mut self, limit: u64) -> Result<u64> {
        let mut dispatched = 0;
        while let Some(cycle) = self.queue.peek_cycle() {
            if cycle >= limit {
                break;
            }
            let Some((cycle, event)) = self.queue.pop() else {
                break;
            };
            self.dispatch(cycle, event)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Dispatches events until the queue is empty; returns the cycle reached.
    pub fn run_to_completion(&mut self) -> Result<u64> {
        let _ = self.run_until(u64::MAX)?;
        Ok(self.queue.now())
    }

    /// Replays `trace` through controller `id` in bound/weave phases of the context's phase
    /// length, then drains the queue.
    ///
    /// Every requester in the trace gets an event recorder.
    pub fn run_phases(&mut self, id: ControllerId, trace: &[TraceEntry]) -> Result<PhaseSummary> {
        let _ = self.controller(id)?;
        let phase = self.ctx.phase_length();
        let line_bits = self.ctx.line_bits();
        let completed_before = self.queue.delivered();
        let mut summary = PhaseSummary::default();
        let mut phase_end = phase;

        for entry in trace {
            if entry.cycle >= phase_end {
                let start = entry.cycle - entry.cycle % phase;
                let dispatched = self.run_until(start)?;
                debug!("weave phase ending {start}: {dispatched} events");
                summary.phases += 1;
                phase_end = start + phase;
            }
            self.ctx.enable_recorder(entry.src_id);
            let mut req = entry.to_request(line_bits);
            let resp = self.access(id, &mut req)?;
            summary.requests += 1;
            summary.last_response = summary.last_response.max(resp);
        }

        summary.final_cycle = self.run_to_completion()?;
        summary.phases += 1;
        summary.completed = self.queue.delivered() - completed_before;
        info!(
            "replayed {} requests in {} phases, {} completed by cycle {}",
            summary.requests, summary.phases, summary.completed, summary.final_cycle
        );
        Ok(summary)
    }

    /// Accesses completed so far.
    pub const fn completed(&self) -> u64 {
        self.queue.delivered()
    }

    /// Drains the completion notices delivered so far.
    pub fn take_completions(&mut self) -> Vec<DoneNotice> {
        self.queue.take_completions()
    }

    /// Appends a statistics snapshot to every controller's log.
    pub fn print_stats(&mut self) -> Result<()> {
        for ctrl in &mut self.controllers {
            ctrl.print_stats()?;
        }
        Ok(())
    }

    /// Statistics tree with one group per controller.
    pub fn stats(&self) -> AggregateStat {
        let mut root = AggregateStat::new("mem", "Memory controllers");
        for ctrl in &self.controllers {
            ctrl.init_stats(&mut root);
        }
        root
    }
}
