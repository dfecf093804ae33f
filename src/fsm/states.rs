//! Concrete state handler functions and table builder.
//!
//! ```text
//!                 [fire rising edge]  → Alarm + FireAlert
//!                 [command ≠ Off]     → pinned mode
//!   IDLE ────────────────────────────────────────────▶ ALERTING ──┐
//!     ▲                                                   │  ▲    │ [command ≠ Off]
//!     │  [fire falling edge, no override]                 │  └────┘ mode change only
//!     │  [command Off]                                    │
//!     └──[test_alarm deadline, no fire]───────────────────┘
//! ```
//!
//! While an override is pinned, fire edges are logged but never change the
//! mode.  The override is cleared only by `buzzer_off` / `set_mode off` or
//! by a `test_alarm` deadline.

use log::{info, warn};

use super::context::{AlertContext, FireEdge, TransitionCause, Trigger};
use super::{StateDescriptor, StateId};
use crate::app::commands::AlertCommand;
use crate::drivers::buzzer::AlertMode;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Alerting
        StateDescriptor {
            id: StateId::Alerting,
            name: "Alerting",
            on_enter: Some(alerting_enter),
            on_exit: Some(alerting_exit),
            on_update: alerting_update,
        },
    ]
}

/// Revert window for a command, if it is time-limited.
fn revert_window(ctx: &AlertContext, cmd: AlertCommand) -> Option<u64> {
    matches!(cmd, AlertCommand::TestAlarm).then_some(ctx.test_alarm_ms)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut AlertContext) {
    ctx.session.current_mode = AlertMode::Off;
    ctx.clear_override();
    match ctx.cause {
        TransitionCause::Startup => info!("IDLE: monitoring sensors"),
        TransitionCause::FireCleared => info!("IDLE: fire cleared, de-escalating alert"),
        TransitionCause::AutoRevert => info!("IDLE: test alarm expired, override released"),
        TransitionCause::Command => info!("IDLE: silenced by remote command"),
        TransitionCause::FireEdge => {}
    }
}

fn idle_update(ctx: &mut AlertContext) -> Option<StateId> {
    match ctx.trigger {
        Trigger::Tick => {
            if ctx.observe_fire_edge() == Some(FireEdge::Rising) {
                ctx.cause = TransitionCause::FireEdge;
                return Some(StateId::Alerting);
            }
            None
        }
        Trigger::Command(cmd) => {
            let mode = cmd.target_mode();
            if mode == AlertMode::Off {
                info!("IDLE: {} while silent, nothing to clear", cmd.name());
                return None;
            }
            ctx.pin_override(mode, revert_window(ctx, cmd));
            ctx.cause = TransitionCause::Command;
            Some(StateId::Alerting)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ALERTING state
// ═══════════════════════════════════════════════════════════════════════════

fn alerting_enter(ctx: &mut AlertContext) {
    match ctx.cause {
        TransitionCause::FireEdge => {
            ctx.raise_fire_alarm();
            let d = &ctx.detection;
            warn!(
                "ALERTING: fire detected (smoke={:.2} temp={:.2} flame={:.2} gas={:.2})",
                d.readings[0].normalized,
                d.readings[1].normalized,
                d.readings[2].normalized,
                d.readings[3].normalized
            );
        }
        TransitionCause::Command => info!(
            "ALERTING: override pinned to {}{}",
            ctx.session.current_mode.name(),
            if ctx.session.revert_deadline_ms.is_some() { " (test)" } else { "" }
        ),
        _ => {}
    }
}

fn alerting_exit(ctx: &mut AlertContext) {
    info!("ALERTING: buzzer released ({} -> off)", ctx.session.current_mode.name());
}

fn alerting_update(ctx: &mut AlertContext) -> Option<StateId> {
    match ctx.trigger {
        Trigger::Tick => alerting_tick(ctx),
        Trigger::Command(cmd) => {
            let mode = cmd.target_mode();
            if mode == AlertMode::Off {
                ctx.clear_override();
                ctx.cause = TransitionCause::Command;
                return Some(StateId::Idle);
            }
            let prev = ctx.session.current_mode;
            ctx.pin_override(mode, revert_window(ctx, cmd));
            info!(
                "ALERTING: {} pins {} (was {})",
                cmd.name(),
                mode.name(),
                prev.name()
            );
            None
        }
    }
}

fn alerting_tick(ctx: &mut AlertContext) -> Option<StateId> {
    let edge = ctx.observe_fire_edge();

    if ctx.session.override_active {
        if ctx.revert_due() {
            ctx.clear_override();
            if ctx.detection.fire_detected {
                ctx.raise_fire_alarm();
                warn!("ALERTING: test alarm expired with fire present, resuming alarm");
                return None;
            }
            ctx.cause = TransitionCause::AutoRevert;
            return Some(StateId::Idle);
        }
        match edge {
            Some(FireEdge::Rising) => warn!(
                "ALERTING: fire edge suppressed, override pinned to {}",
                ctx.session.current_mode.name()
            ),
            Some(FireEdge::Falling) => info!(
                "ALERTING: fire cleared, override still pinned to {}",
                ctx.session.current_mode.name()
            ),
            None => {}
        }
        return None;
    }

    if !ctx.detection.fire_detected {
        ctx.cause = TransitionCause::FireCleared;
        return Some(StateId::Idle);
    }
    None
}
