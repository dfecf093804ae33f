//! AlertService → FSM → actuator/event sink.
//!
//! Covers edge-only triggering, override stickiness, and the test-alarm
//! auto-revert timing.

use firesentry::app::commands::AlertCommand;
use firesentry::app::service::AlertService;
use firesentry::config::SystemConfig;
use firesentry::drivers::buzzer::AlertMode;
use firesentry::fsm::StateId;
use firesentry::state::DetectionState;

use crate::mock_hw::{MockBuzzer, RecordingSink};

fn make_service() -> (AlertService, MockBuzzer, RecordingSink) {
    let mut svc = AlertService::new(&SystemConfig::default());
    let mut buzzer = MockBuzzer::default();
    svc.start(&mut buzzer);
    (svc, buzzer, RecordingSink::default())
}

fn clear() -> DetectionState {
    DetectionState::new()
}

fn fire(since_ms: u64) -> DetectionState {
    let mut d = DetectionState::new();
    d.fire_detected = true;
    d.detected_at_ms = Some(since_ms);
    d
}

// ── Edge-only triggering ──────────────────────────────────────

#[test]
fn unchanged_snapshot_is_idempotent() {
    let (mut svc, mut buzzer, mut sink) = make_service();

    let first = svc.evaluate(fire(100), 100, &mut buzzer, &mut sink);
    assert_eq!(first, Some((StateId::Idle, StateId::Alerting)));
    for t in [200, 300, 400, 500] {
        assert_eq!(svc.evaluate(fire(100), t, &mut buzzer, &mut sink), None);
    }

    assert_eq!(buzzer.modes, [AlertMode::Off, AlertMode::Alarm]);
    assert_eq!(sink.fire_alert_ids(), [1]);
}

#[test]
fn fire_cleared_de_escalates_to_off() {
    let (mut svc, mut buzzer, mut sink) = make_service();
    svc.evaluate(fire(0), 0, &mut buzzer, &mut sink);
    let t = svc.evaluate(clear(), 500, &mut buzzer, &mut sink);
    assert_eq!(t, Some((StateId::Alerting, StateId::Idle)));
    assert_eq!(buzzer.current(), AlertMode::Off);
    assert_eq!(sink.fire_alert_ids(), [1], "clearing emits no alert");
}

#[test]
fn each_new_episode_gets_a_new_alert_id() {
    let (mut svc, mut buzzer, mut sink) = make_service();
    svc.evaluate(fire(0), 0, &mut buzzer, &mut sink);
    svc.evaluate(clear(), 500, &mut buzzer, &mut sink);
    svc.evaluate(fire(1000), 1000, &mut buzzer, &mut sink);
    assert_eq!(sink.fire_alert_ids(), [1, 2]);
}

// ── Override stickiness ──────────────────────────────────────

#[test]
fn pinned_override_suppresses_fire_edge() {
    let (mut svc, mut buzzer, mut sink) = make_service();

    svc.handle_command(AlertCommand::BuzzerOn, 0, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Normal);
    assert!(svc.session().override_active);

    svc.evaluate(fire(100), 100, &mut buzzer, &mut sink);
    svc.evaluate(fire(100), 200, &mut buzzer, &mut sink);

    assert_eq!(buzzer.modes, [AlertMode::Off, AlertMode::Normal], "no change while pinned");
    assert!(sink.fire_alert_ids().is_empty());
}

#[test]
fn buzzer_off_silences_until_fire_retriggers() {
    let (mut svc, mut buzzer, mut sink) = make_service();
    svc.evaluate(fire(0), 0, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Alarm);

    svc.handle_command(AlertCommand::BuzzerOff, 100, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Off);
    assert!(!svc.session().override_active);

    // Fire still present: no new edge, stays silent.
    svc.evaluate(fire(0), 200, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Off);

    // Clears, then comes back: a fresh edge.
    svc.evaluate(clear(), 300, &mut buzzer, &mut sink);
    svc.evaluate(fire(400), 400, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Alarm);
    assert_eq!(sink.fire_alert_ids(), [1, 2]);
}

#[test]
fn set_mode_reaches_every_mode() {
    let (mut svc, mut buzzer, mut sink) = make_service();
    for mode in [AlertMode::Urgent, AlertMode::Normal, AlertMode::Alarm] {
        svc.handle_command(AlertCommand::SetMode(mode), 0, &mut buzzer, &mut sink);
        assert_eq!(buzzer.current(), mode);
        assert_eq!(svc.state(), StateId::Alerting);
    }
    svc.handle_command(AlertCommand::SetMode(AlertMode::Off), 0, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Off);
    assert_eq!(svc.state(), StateId::Idle);
}

// ── Test alarm ────────────────────────────────────────────────

#[test]
fn test_alarm_reverts_after_duration() {
    let (mut svc, mut buzzer, mut sink) = make_service();

    svc.handle_command(AlertCommand::TestAlarm, 0, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Alarm);

    svc.evaluate(clear(), 2999, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Alarm);

    let t = svc.evaluate(clear(), 3000, &mut buzzer, &mut sink);
    assert_eq!(t, Some((StateId::Alerting, StateId::Idle)));
    assert_eq!(buzzer.current(), AlertMode::Off);
    assert!(!svc.session().override_active);
    assert!(sink.fire_alert_ids().is_empty(), "a test alarm is not a fire alert");
}

#[test]
fn second_test_alarm_resets_deadline() {
    let (mut svc, mut buzzer, mut sink) = make_service();

    svc.handle_command(AlertCommand::TestAlarm, 0, &mut buzzer, &mut sink);
    svc.handle_command(AlertCommand::TestAlarm, 1000, &mut buzzer, &mut sink);
    assert_eq!(svc.session().revert_deadline_ms, Some(4000));

    svc.evaluate(clear(), 3000, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Alarm, "first deadline no longer applies");

    svc.evaluate(clear(), 4000, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Off);
}

#[test]
fn test_alarm_expiring_into_real_fire_resumes_alarm() {
    let (mut svc, mut buzzer, mut sink) = make_service();

    svc.handle_command(AlertCommand::TestAlarm, 0, &mut buzzer, &mut sink);
    // Fire starts while the test alarm is pinned: suppressed, no alert yet.
    svc.evaluate(fire(1000), 1000, &mut buzzer, &mut sink);
    assert!(sink.fire_alert_ids().is_empty());

    let t = svc.evaluate(fire(1000), 3000, &mut buzzer, &mut sink);
    assert_eq!(t, None, "stays in Alerting");
    assert_eq!(buzzer.current(), AlertMode::Alarm);
    assert!(!svc.session().override_active);
    assert_eq!(sink.fire_alert_ids(), [1]);

    // Now tracking the fire: clearing de-escalates.
    svc.evaluate(clear(), 3500, &mut buzzer, &mut sink);
    assert_eq!(buzzer.current(), AlertMode::Off);
}
