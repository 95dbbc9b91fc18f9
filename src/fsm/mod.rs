//! Function-pointer finite state machine engine for the roaster modes.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                      │
//! │  ┌──────────┬──────────┬──────────┬──────────────┬─────────────┐ │
//! │  │ StateId  │ on_enter │ on_exit  │ on_event     │ on_update   │ │
//! │  ├──────────┼──────────┼──────────┼──────────────┼─────────────┤ │
//! │  │ Off      │ fn(ctx)  │    -     │ fn(ctx, ev)  │ fn(ctx)->.. │ │
//! │  │ FanOnly  │ fn(ctx)  │    -     │ fn(ctx, ev)  │ fn(ctx)->.. │ │
//! │  │ Preheat  │ fn(ctx)  │    -     │ fn(ctx, ev)  │ fn(ctx)->.. │ │
//! │  │ Roasting │ fn(ctx)  │    -     │ fn(ctx, ev)  │ fn(ctx)->.. │ │
//! │  │ Cooling  │ fn(ctx)  │    -     │      -       │ fn(ctx)->.. │ │
//! │  │ Manual   │ fn(ctx)  │ fn(ctx)  │ fn(ctx, ev)  │ fn(ctx)->.. │ │
//! │  │ Error    │ fn(ctx)  │    -     │      -       │ fn(ctx)->.. │ │
//! │  └──────────┴──────────┴──────────┴──────────────┴─────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operator events go through [`decide`], a pure function of the current
//! mode and the event.  Its [`Decision`] is then applied: `Ignore` touches
//! nothing, `Adjust` runs the state's `on_event` handler in place, and
//! `Transition` stages the event payload and runs `on_exit` / `on_enter`.
//!
//! Each tick the engine calls `on_update` for the current state; returning
//! `Some(next)` is an internal transition (e.g. cooling complete).  All
//! handlers receive `&mut RoasterContext`; none touch hardware.

pub mod context;
pub mod states;

use context::RoasterContext;
use log::{debug, info};
use serde::Serialize;

use crate::safety::LatchedFault;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Operating modes.  The discriminant is the `stateId` reported in telemetry.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum StateId {
    Off = 0,
    FanOnly = 1,
    Preheat = 2,
    Roasting = 3,
    Cooling = 4,
    Manual = 5,
    Error = 6,
}

impl StateId {
    /// Total number of states: used to size the table array.
    pub const COUNT: usize = 7;

    pub const ALL: [StateId; Self::COUNT] = [
        Self::Off,
        Self::FanOnly,
        Self::Preheat,
        Self::Roasting,
        Self::Cooling,
        Self::Manual,
        Self::Error,
    ];

    /// Convert an index back to `StateId`.  Out-of-range returns `Error`
    /// (safe fallback) and asserts in debug builds.
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(id) => *id,
            None => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }

    /// Wire name, as reported in the telemetry `state` field.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::FanOnly => "FAN_ONLY",
            Self::Preheat => "PREHEAT",
            Self::Roasting => "ROASTING",
            Self::Cooling => "COOLING",
            Self::Manual => "MANUAL",
            Self::Error => "ERROR",
        }
    }
}

// ---------------------------------------------------------------------------
// Events and decisions
// ---------------------------------------------------------------------------

/// Externally driven events.  Values are already resolved against config
/// defaults by the command layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// Fan speed (%); clamped to 1..=100 on entry.
    StartFanOnly(f32),
    ExitFanOnly,
    /// Preheat target (°C); ignored unless positive.
    StartPreheat(f32),
    /// Roast setpoint (°C); ignored unless positive.
    LoadBeans(f32),
    EndRoast,
    FirstCrack,
    CoolComplete,
    EnterManual,
    ExitManual,
    Stop,
    ClearFault,
    Disconnected,
    SetSetpoint(f32),
    SetFanSpeed(f32),
    SetHeaterPower(f32),
}

/// What applying an event to a mode should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Not valid in this mode: no mode change, no side effects.
    Ignore,
    /// Valid, stays in the current mode and updates it in place.
    Adjust,
    /// Valid, moves to another mode.
    Transition(StateId),
}

/// The transition table.  Pure: reads nothing but its arguments.
pub fn decide(mode: StateId, event: &Event) -> Decision {
    use Decision::{Adjust, Ignore, Transition};
    use StateId::{Cooling, Error, FanOnly, Manual, Off, Preheat, Roasting};

    match (mode, event) {
        (Off, Event::StartFanOnly(_)) => Transition(FanOnly),
        (FanOnly, Event::ExitFanOnly) => Transition(Off),
        (Off | FanOnly, Event::StartPreheat(_)) => Transition(Preheat),
        (Preheat, Event::LoadBeans(_)) => Transition(Roasting),
        (Roasting, Event::EndRoast) => Transition(Cooling),
        (Roasting, Event::FirstCrack) => Adjust,
        (Cooling, Event::CoolComplete) => Transition(Off),
        (Off, Event::EnterManual) => Transition(Manual),
        (Manual, Event::ExitManual) => Transition(Off),
        (Off | Error, Event::Stop) => Ignore,
        (_, Event::Stop) => Transition(Off),
        (Error, Event::ClearFault) => Transition(Off),
        (Preheat | Roasting, Event::Disconnected) => Transition(Cooling),
        (Manual | FanOnly, Event::Disconnected) => Transition(Off),
        (Off | Preheat | Roasting, Event::SetSetpoint(v)) if *v > 0.0 => Adjust,
        (FanOnly | Preheat | Roasting | Manual, Event::SetFanSpeed(_)) => Adjust,
        (Manual, Event::SetHeaterPower(_)) => Adjust,
        _ => Ignore,
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut RoasterContext);

/// Signature for in-place event handling (`Decision::Adjust`).
pub type StateEventFn = fn(&mut RoasterContext, &Event);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut RoasterContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single mode.
pub struct StateDescriptor {
    pub id: StateId,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_event: Option<StateEventFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut RoasterContext) {
        info!("FSM starting in {}", self.current_state().name());
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Apply one operator event.  Returns the decision that was applied.
    pub fn handle_event(&mut self, event: &Event, ctx: &mut RoasterContext) -> Decision {
        let decision = decide(self.current_state(), event);
        match decision {
            Decision::Ignore => {
                debug!("{event:?} ignored in {}", self.current_state().name());
            }
            Decision::Adjust => {
                if let Some(on_event) = self.table[self.current].on_event {
                    on_event(ctx, event);
                }
            }
            Decision::Transition(next) => {
                states::stage_transition(ctx, event);
                self.transition(next, ctx);
            }
        }
        decision
    }

    /// Advance the FSM by one tick.
    pub fn tick(&mut self, ctx: &mut RoasterContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Latch `fault` into the context and jump to `Error`, regardless of
    /// what the current state wanted.
    pub fn force_error(&mut self, fault: LatchedFault, ctx: &mut RoasterContext) {
        ctx.error = Some(fault);
        self.force_transition(StateId::Error, ctx);
    }

    /// Force an immediate transition.  No-op if already in `next`.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut RoasterContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut RoasterContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.current_state().name(),
            next_id.name()
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
