//! Shared mutable context threaded through every FSM handler.
//!
//! `AlertContext` is the single struct the state handlers read from and
//! write to: the alert session, the detection snapshot under evaluation,
//! what triggered this evaluation, and the side effects (mode, pending fire
//! alert) the service applies after the tick.

use crate::app::commands::AlertCommand;
use crate::app::events::FireAlertData;
use crate::config::SystemConfig;
use crate::drivers::buzzer::AlertMode;
use crate::state::DetectionState;

// ---------------------------------------------------------------------------
// Alert session (owned by the state machine)
// ---------------------------------------------------------------------------

/// The state machine's own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertSession {
    pub current_mode: AlertMode,
    /// Fire flag seen on the previous tick, for edge detection.
    pub last_fire_state: bool,
    /// A remote command has pinned `current_mode`.
    pub override_active: bool,
    /// Auto-revert deadline of a pinned `test_alarm`.
    pub revert_deadline_ms: Option<u64>,
}

impl AlertSession {
    pub const fn new() -> Self {
        Self {
            current_mode: AlertMode::Off,
            last_fire_state: false,
            override_active: false,
            revert_deadline_ms: None,
        }
    }
}

impl Default for AlertSession {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Evaluation inputs
// ---------------------------------------------------------------------------

/// What caused this evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Periodic detection cycle.
    Tick,
    /// A validated remote command.
    Command(AlertCommand),
}

/// Why the last transition happened; read by `on_enter` handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    Startup,
    FireEdge,
    FireCleared,
    Command,
    AutoRevert,
}

/// A flip of `fire_detected` between two consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireEdge {
    Rising,
    Falling,
}

// ---------------------------------------------------------------------------
// AlertContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct AlertContext {
    // -- Timing --
    /// Monotonic time of the current evaluation.
    pub now_ms: u64,

    // -- Inputs --
    pub detection: DetectionState,
    pub trigger: Trigger,

    // -- State --
    pub session: AlertSession,
    pub cause: TransitionCause,

    // -- Outputs --
    /// Fire alert raised during this evaluation, drained by the service.
    pub pending_alert: Option<FireAlertData>,

    // -- Configuration --
    pub test_alarm_ms: u64,
    alert_seq: u32,
    /// `detected_at_ms` of the detection episode last alerted.
    alerted_episode: Option<u64>,
}

impl AlertContext {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            now_ms: 0,
            detection: DetectionState::new(),
            trigger: Trigger::Tick,
            session: AlertSession::new(),
            cause: TransitionCause::Startup,
            pending_alert: None,
            test_alarm_ms: u64::from(config.test_alarm_duration_ms),
            alert_seq: 0,
            alerted_episode: None,
        }
    }

    /// Compare the current fire flag with the previous tick's and record it.
    /// Each flip is reported exactly once.
    pub fn observe_fire_edge(&mut self) -> Option<FireEdge> {
        let now = self.detection.fire_detected;
        let was = core::mem::replace(&mut self.session.last_fire_state, now);
        match (was, now) {
            (false, true) => Some(FireEdge::Rising),
            (true, false) => Some(FireEdge::Falling),
            _ => None,
        }
    }

    /// Pin the override to `mode`, replacing any pending auto-revert.
    pub fn pin_override(&mut self, mode: AlertMode, revert_after_ms: Option<u64>) {
        self.session.override_active = true;
        self.session.current_mode = mode;
        self.session.revert_deadline_ms = revert_after_ms.map(|d| self.now_ms.saturating_add(d));
    }

    pub fn clear_override(&mut self) {
        self.session.override_active = false;
        self.session.revert_deadline_ms = None;
    }

    /// `true` once a pinned test alarm has reached its deadline.
    pub fn revert_due(&self) -> bool {
        self.session
            .revert_deadline_ms
            .is_some_and(|deadline| self.now_ms >= deadline)
    }

    /// Force `Alarm` and queue a fire alert for the current detection
    /// episode, unless that episode was already alerted.
    pub fn raise_fire_alarm(&mut self) {
        self.session.current_mode = AlertMode::Alarm;
        let episode = self.detection.detected_at_ms.or(Some(self.now_ms));
        if self.alerted_episode == episode {
            return;
        }
        self.alerted_episode = episode;
        self.alert_seq = self.alert_seq.wrapping_add(1);
        self.pending_alert = Some(FireAlertData {
            alert_id: self.alert_seq,
            timestamp_ms: self.now_ms,
            detection: self.detection,
        });
    }
}
