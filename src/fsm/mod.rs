//! Function-pointer finite state machine engine for the alert session.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  StateTable                                             │
//! │  ┌──────────┬───────────┬──────────┬──────────────────┐ │
//! │  │ StateId  │ on_enter  │ on_exit  │ on_update        │ │
//! │  ├──────────┼───────────┼──────────┼──────────────────┤ │
//! │  │ Idle     │ fn(ctx)   │ -        │ fn(ctx)->Option<>│ │
//! │  │ Alerting │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<>│ │
//! │  └──────────┴───────────┴──────────┴──────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Each evaluation (detection tick or remote command) the engine calls
//! `on_update` for the **current** state.  If it returns `Some(next_id)`,
//! the engine runs `on_exit` for the current state, then `on_enter` for the
//! next, and updates the current pointer.  Mode changes inside `Alerting`
//! happen in `on_update` without a transition.

pub mod context;
pub mod states;

use context::AlertContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all alert states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// No fire and no pinned override.
    Idle = 0,
    /// Fire present or an override pinned to a non-`Off` mode.
    Alerting = 1,
}

impl StateId {
    /// Total number of states: used to size the table array.
    pub const COUNT: usize = 2;

    /// Convert an index back to `StateId`.  Out-of-range indices fall back
    /// to `Alerting`, the audible state.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Alerting,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Alerting
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut AlertContext);

/// Signature for the per-evaluation update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut AlertContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut AlertContext) {
        info!("Alert FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Evaluate the current state once and perform any transition it asks
    /// for.  Returns the `(from, to)` pair when the state changed.
    pub fn tick(&mut self, ctx: &mut AlertContext) -> Option<(StateId, StateId)> {
        let next = (self.table[self.current].on_update)(ctx)?;
        let from = self.current_state();
        if next == from {
            return None;
        }
        self.transition(next, ctx);
        Some((from, next))
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut AlertContext) {
        let next_idx = next_id as usize;

        info!(
            "Alert FSM: {} -> {} ({:?})",
            self.table[self.current].name, self.table[next_idx].name, ctx.cause
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
