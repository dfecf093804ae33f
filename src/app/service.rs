//! Alert service: the hexagonal core.
//!
//! [`AlertService`] owns the alert FSM and its context.  It is fed detection
//! snapshots and validated commands, and pushes side effects out through
//! ports: the active mode to the buzzer, fire alerts to the event sink.
//! Neither port blocks, so an evaluation never waits on I/O.
//!
//! ```text
//!  DetectionState ──▶ ┌──────────────────────┐ ──set_mode()──▶ ActuatorPort
//!                     │     AlertService     │
//!  AlertCommand ────▶ │  FSM · AlertSession  │ ──emit()──────▶ EventSink
//!                     └──────────────────────┘
//! ```

use log::debug;

use crate::config::SystemConfig;
use crate::drivers::buzzer::AlertMode;
use crate::fsm::context::{AlertContext, AlertSession, Trigger};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::state::DetectionState;

use super::commands::AlertCommand;
use super::events::OutboundEvent;
use super::ports::{ActuatorPort, EventSink};

/// `(from, to)` of a state change.
pub type Transition = (StateId, StateId);

// ───────────────────────────────────────────────────────────────
// AlertService
// ───────────────────────────────────────────────────────────────

pub struct AlertService {
    fsm: Fsm,
    ctx: AlertContext,
    /// Last mode handed to the actuator; `None` before `start`.
    applied_mode: Option<AlertMode>,
}

impl AlertService {
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: AlertContext::new(config),
            applied_mode: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter `Idle` and push the initial (silent) mode to the actuator.
    pub fn start(&mut self, actuator: &mut impl ActuatorPort) {
        self.fsm.start(&mut self.ctx);
        self.apply_mode(actuator);
    }

    // ── Evaluation ────────────────────────────────────────────

    /// One detection cycle.  Re-evaluating an unchanged snapshot produces
    /// no transition and no event.
    pub fn evaluate(
        &mut self,
        detection: DetectionState,
        now_ms: u64,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Option<Transition> {
        self.ctx.detection = detection;
        self.run(Trigger::Tick, now_ms, actuator, sink)
    }

    /// Apply one validated remote command against the latest snapshot.
    pub fn handle_command(
        &mut self,
        cmd: AlertCommand,
        now_ms: u64,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Option<Transition> {
        debug!("AlertService: command {:?} at {}ms", cmd, now_ms);
        self.run(Trigger::Command(cmd), now_ms, actuator, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn session(&self) -> AlertSession {
        self.ctx.session
    }

    pub fn mode(&self) -> AlertMode {
        self.ctx.session.current_mode
    }

    // ── Internal ──────────────────────────────────────────────

    fn run(
        &mut self,
        trigger: Trigger,
        now_ms: u64,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Option<Transition> {
        self.ctx.now_ms = now_ms;
        self.ctx.trigger = trigger;
        let transition = self.fsm.tick(&mut self.ctx);

        self.apply_mode(actuator);
        if let Some(alert) = self.ctx.pending_alert.take() {
            sink.emit(OutboundEvent::FireAlert(alert));
        }
        transition
    }

    /// Push the session mode to the actuator only when it changed.
    fn apply_mode(&mut self, actuator: &mut impl ActuatorPort) {
        let mode = self.ctx.session.current_mode;
        if self.applied_mode != Some(mode) {
            actuator.set_mode(mode);
            self.applied_mode = Some(mode);
        }
    }
}
