//! Access events.
//!
//! An `AccessEvent` is the outer simulator's handle on one recorded memory access. It is
//! created by `access`, queued by the scheduler at its minimum start cycle, handed to the
//! controller when it fires, pinned (`hold`) while the device works on it, and finally
//! released and marked done at the cycle the device completed it.

use std::fmt;

use crate::common::{Direction, MemCtrlError, PhysAddr, Result};

/// Index of a controller inside a [`Simulator`](crate::sim::Simulator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ControllerId(pub usize);

/// Lifecycle state of an access event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EventState {
    /// Recorded, not yet queued.
    #[default]
    None,
    /// Waiting in the scheduler.
    Queued,
    /// Being simulated.
    Running,
    /// Pinned while in flight in the device.
    Held,
    /// Completed; downstream consumers were notified.
    Done,
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Completion notice delivered to the consumers of an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoneNotice {
    /// Controller that served the access.
    pub controller: ControllerId,
    /// Requester id.
    pub src_id: u32,
    /// Accessed address.
    pub addr: PhysAddr,
    /// Read or write.
    pub direction: Direction,
    /// Cycle the event started simulating.
    pub start_cycle: u64,
    /// Cycle consumers observe the completion; never before the committed minimum finish.
    pub done_cycle: u64,
}

impl DoneNotice {
    /// Latency as observed by consumers.
    pub const fn latency(&self) -> u64 {
        self.done_cycle.saturating_sub(self.start_cycle)
    }
}

/// One recorded access awaiting its device timing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessEvent {
    controller: ControllerId,
    addr: PhysAddr,
    write: bool,
    src_id: u32,
    domain: u32,
    min_start_cycle: u64,
    start_cycle: u64,
    state: EventState,
}

impl AccessEvent {
    /// Creates an event in state [`EventState::None`].
    pub const fn new(controller: ControllerId, addr: PhysAddr, write: bool, src_id: u32, domain: u32) -> Self {
        Self {
            controller,
            addr,
            write,
            src_id,
            domain,
            min_start_cycle: 0,
            start_cycle: 0,
            state: EventState::None,
        }
    }

    /// Controller this event belongs to.
    pub const fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Accessed address.
    pub const fn addr(&self) -> PhysAddr {
        self.addr
    }

    /// Returns `true` for writes.
    pub const fn is_write(&self) -> bool {
        self.write
    }

    /// Device-side direction.
    pub const fn direction(&self) -> Direction {
        if self.write {
            Direction::Write
        } else {
            Direction::Read
        }
    }

    /// Requester id.
    pub const fn src_id(&self) -> u32 {
        self.src_id
    }

    /// Simulation domain.
    pub const fn domain(&self) -> u32 {
        self.domain
    }

    /// Earliest cycle the event may start.
    pub const fn min_start_cycle(&self) -> u64 {
        self.min_start_cycle
    }

    /// Sets the earliest cycle the event may start.
    pub const fn set_min_start_cycle(&mut self, cycle: u64) {
        self.min_start_cycle = cycle;
    }

    /// Cycle at which the event last started simulating.
    pub const fn start_cycle(&self) -> u64 {
        self.start_cycle
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> EventState {
        self.state
    }

    fn transition(&mut self, op: &'static str, from: &[EventState], to: EventState) -> Result<()> {
        if !from.contains(&self.state) {
            return Err(MemCtrlError::EventState {
                event: "access event",
                op,
                state: self.state.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// Marks the event as waiting in the scheduler.
    pub fn queue(&mut self) -> Result<()> {
        self.transition("queue", &[EventState::None], EventState::Queued)
    }

    /// Starts simulating the event at `cycle`.
    pub fn run(&mut self, cycle: u64) -> Result<()> {
        self.transition("run", &[EventState::None, EventState::Queued], EventState::Running)?;
        self.start_cycle = cycle;
        Ok(())
    }

    /// Puts a running event back into the scheduler.
    pub fn requeue(&mut self) -> Result<()> {
        self.transition("requeue", &[EventState::Running], EventState::Queued)
    }

    /// Pins the event while the device works on it.
    pub fn hold(&mut self) -> Result<()> {
        self.transition("hold", &[EventState::Running], EventState::Held)
    }

    /// Unpins a held event.
    pub fn release(&mut self) -> Result<()> {
        self.transition("release", &[EventState::Held], EventState::Running)
    }

    /// Completes the event at `cycle` and returns the notice for its consumers.
    pub fn done(&mut self, cycle: u64) -> Result<DoneNotice> {
        self.transition("done", &[EventState::Running], EventState::Done)?;
        Ok(DoneNotice {
            controller: self.controller,
            src_id: self.src_id,
            addr: self.addr,
            direction: self.direction(),
            start_cycle: self.start_cycle,
            done_cycle: cycle,
        })
    }
}
