//! Scheduled tick events and their recycling arena.
//!
//! A tick event drives one controller's device oracle forward. Exactly one is active per
//! controller while requests are in flight; once the in-flight table drains, the event goes
//! back to the arena's free list and the next enqueue reuses it.
//!
//! State machine:
//!
//! ```text
//!   Idle --enqueue--> Queued --start--> Running --requeue--> Queued
//!                       |                  |
//!                     annul             finish
//!                       v                  v
//!                   Annulled --drain--> Idle (back on the free list)
//! ```

use std::fmt;

use super::access_event::ControllerId;
use crate::common::{MemCtrlError, Result};

/// Handle of a tick event slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickId(pub usize);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick{}", self.0)
    }
}

/// Lifecycle state of a tick event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TickState {
    /// Inactive; may sit on the free list.
    #[default]
    Idle,
    /// Waiting in the scheduler for its cycle.
    Queued,
    /// Executing a tick.
    Running,
    /// Cancelled while queued; recycles itself when it fires.
    Annulled,
}

impl fmt::Display for TickState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A recyclable timer that drives a controller's oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickEvent {
    id: TickId,
    controller: ControllerId,
    domain: u32,
    state: TickState,
    activations: u64,
}

impl TickEvent {
    fn new(id: TickId, controller: ControllerId, domain: u32) -> Self {
        Self {
            id,
            controller,
            domain,
            state: TickState::Idle,
            activations: 0,
        }
    }

    /// Slot handle.
    pub const fn id(&self) -> TickId {
        self.id
    }

    /// Controller driven by this event.
    pub const fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Simulation domain.
    pub const fn domain(&self) -> u32 {
        self.domain
    }

    /// Current state.
    pub const fn state(&self) -> TickState {
        self.state
    }

    /// Number of times the event was armed from idle.
    pub const fn activations(&self) -> u64 {
        self.activations
    }

    fn transition(&mut self, op: &'static str, from: TickState, to: TickState) -> Result<()> {
        if self.state != from {
            return Err(MemCtrlError::EventState {
                event: "tick event",
                op,
                state: self.state.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// Arms an idle event.
    pub fn enqueue(&mut self) -> Result<()> {
        self.transition("enqueue", TickState::Idle, TickState::Queued)?;
        self.activations += 1;
        Ok(())
    }

    /// Begins executing a queued event.
    pub fn start(&mut self) -> Result<()> {
        self.transition("start", TickState::Queued, TickState::Running)
    }

    /// Re-arms a running event for a later cycle.
    pub fn requeue(&mut self) -> Result<()> {
        self.transition("requeue", TickState::Running, TickState::Queued)
    }

    /// Retires a running event that has nothing left to drive.
    pub fn finish(&mut self) -> Result<()> {
        self.transition("finish", TickState::Running, TickState::Idle)
    }

    /// Cancels a queued event without removing it from the scheduler.
    pub fn annul(&mut self) -> Result<()> {
        self.transition("annul", TickState::Queued, TickState::Annulled)
    }

    /// Retires an annulled event when it fires.
    pub fn drain(&mut self) -> Result<()> {
        self.transition("drain", TickState::Annulled, TickState::Idle)
    }
}

/// Owns every tick event a controller ever allocated.
///
/// Slots are never deallocated; recycling pushes the handle on the free list.
#[derive(Debug, Default)]
pub struct TickArena {
    slots: Vec<TickEvent>,
    free: Vec<TickId>,
}

impl TickArena {
    /// Creates an empty arena.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Reuses a free slot, or allocates one when the free list is empty.
    pub fn acquire(&mut self, controller: ControllerId, domain: u32) -> TickId {
        if let Some(id) = self.free.pop() {
            return id;
        }
        let id = TickId(self.slots.len());
        self.slots.push(TickEvent::new(id, controller, domain));
        id
    }

    /// Returns an idle slot to the free list.
    pub fn recycle(&mut self, id: TickId) -> Result<()> {
        let slot = self.get(id)?;
        if slot.state() != TickState::Idle {
            return Err(MemCtrlError::EventState {
                event: "tick event",
                op: "recycle",
                state: slot.state().to_string(),
            });
        }
        if self.free.contains(&id) {
            return Err(MemCtrlError::EventState {
                event: "tick event",
                op: "recycle",
                state: "already free".into(),
            });
        }
        self.free.push(id);
        Ok(())
    }

    /// Looks up a slot.
    pub fn get(&self, id: TickId) -> Result<&TickEvent> {
        self.slots.get(id.0).ok_or(MemCtrlError::UnknownTick(id.0))
    }

    /// Looks up a slot mutably.
    pub fn get_mut(&mut self, id: TickId) -> Result<&mut TickEvent> {
        self.slots.get_mut(id.0).ok_or(MemCtrlError::UnknownTick(id.0))
    }

    /// Slots ever allocated.
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Slots on the free list.
    pub fn free_len(&self) -> usize {
        self.free.len()
    }
}
