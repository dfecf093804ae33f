//! MessagingGateway: inbound validation into the alert worker, outbound
//! routing and retry.

use std::time::Duration;

use firesentry::app::commands::AlertCommand;
use firesentry::app::events::{FireAlertData, OutboundEvent, StatusData, TelemetryData};
use firesentry::app::ports::DeliveryLevel;
use firesentry::app::service::AlertService;
use firesentry::config::{SystemConfig, TOPIC_ALERT, TOPIC_CONTROL, TOPIC_SENSOR_DATA};
use firesentry::drivers::buzzer::{AlertMode, BuzzerControl};
use firesentry::error::{CommandError, CommsError};
use firesentry::gateway::MessagingGateway;
use firesentry::gateway::channels::{CommandQueue, OutboundQueue};
use firesentry::state::{DetectionState, SharedDetection, SharedSession};
use firesentry::workers;

use crate::mock_hw::{MockLink, MockPublisher, ScriptedInbox};

const WAIT: Duration = Duration::from_millis(1);

fn fire_alert(id: u32) -> OutboundEvent {
    let mut d = DetectionState::new();
    d.fire_detected = true;
    d.detected_at_ms = Some(1000);
    OutboundEvent::FireAlert(FireAlertData { alert_id: id, timestamp_ms: 1234, detection: d })
}

fn telemetry() -> OutboundEvent {
    OutboundEvent::SensorSnapshot(TelemetryData::from_detection(&DetectionState::new(), 5000))
}

// ── Inbound ───────────────────────────────────────────────────

#[test]
fn remote_test_alarm_reaches_the_buzzer() {
    let mut gateway = MessagingGateway::new();
    let mut inbox = ScriptedInbox::default();
    let commands = CommandQueue::new();
    inbox.push(TOPIC_CONTROL, r#"{"command":"test_alarm"}"#);

    let routed = workers::inbound_cycle(&mut gateway, &mut inbox, &commands, WAIT);
    assert_eq!(routed, Some(Ok(AlertCommand::TestAlarm)));

    let mut service = AlertService::new(&SystemConfig::default());
    let buzzer = BuzzerControl::new();
    let detection = SharedDetection::new();
    let session = SharedSession::new();
    let outbound = OutboundQueue::new();
    let mut sink = &outbound;
    service.start(&mut &buzzer);

    workers::alert_cycle(&mut service, &commands, &detection, &session, &buzzer, &mut sink, 10);
    assert_eq!(buzzer.mode(), AlertMode::Alarm);
    assert_eq!(session.snapshot().revert_deadline_ms, Some(3010));

    workers::alert_cycle(&mut service, &commands, &detection, &session, &buzzer, &mut sink, 3010);
    assert_eq!(buzzer.mode(), AlertMode::Off);
}

#[test]
fn rejected_messages_never_reach_commands() {
    let mut gateway = MessagingGateway::new();
    let mut inbox = ScriptedInbox::default();
    let commands = CommandQueue::new();
    inbox.push("fire_system/status", r#"{"command":"buzzer_on"}"#);
    inbox.push(TOPIC_CONTROL, "not json at all");
    inbox.push(TOPIC_CONTROL, r#"{"command":"self_destruct"}"#);
    inbox.push(TOPIC_CONTROL, r#"{"command":"set_mode","mode":9}"#);
    inbox.push(TOPIC_CONTROL, r#"["set_mode","alarm"]"#);

    let results: Vec<_> = std::iter::from_fn(|| workers::inbound_cycle(&mut gateway, &mut inbox, &commands, WAIT))
        .collect();
    assert_eq!(
        results,
        [
            Err(CommandError::WrongTopic),
            Err(CommandError::Malformed),
            Err(CommandError::Unrecognized),
            Err(CommandError::InvalidMode),
            Err(CommandError::Malformed),
        ]
    );
    assert_eq!(commands.try_next(), None);
}

#[test]
fn empty_inbox_times_out_quietly() {
    let mut gateway = MessagingGateway::new();
    let commands = CommandQueue::new();
    let mut inbox = ScriptedInbox::default();
    assert_eq!(workers::inbound_cycle(&mut gateway, &mut inbox, &commands, WAIT), None);
}

// ── Outbound ──────────────────────────────────────────────────

#[test]
fn fire_alert_is_retained_exactly_once() {
    let mut gateway = MessagingGateway::new();
    let mut client = MockPublisher::default();
    gateway.publish_event(&fire_alert(7), &MockLink(true), &mut client).unwrap();

    let p = &client.published[0];
    assert_eq!(p.topic, TOPIC_ALERT);
    assert_eq!(p.level, DeliveryLevel::ExactlyOnce);
    assert!(p.retained);
    assert_eq!(p.payload["type"], "fire_alert");
    assert_eq!(p.payload["alert_id"], 7);
    assert_eq!(p.payload["timestamp"], 1000);
}

#[test]
fn fire_alert_is_retried_once() {
    let mut gateway = MessagingGateway::new();
    let mut client = MockPublisher { fail_next: 1, ..Default::default() };
    assert!(gateway.publish_event(&fire_alert(1), &MockLink(true), &mut client).is_ok());
    assert_eq!(client.attempts, 2);

    let mut client = MockPublisher { fail_next: 5, ..Default::default() };
    assert_eq!(
        gateway.publish_event(&fire_alert(2), &MockLink(true), &mut client),
        Err(CommsError::MqttPublishFailed)
    );
    assert_eq!(client.attempts, 2, "one retry only");
}

#[test]
fn telemetry_is_not_retried() {
    let mut gateway = MessagingGateway::new();
    let mut client = MockPublisher { fail_next: 1, ..Default::default() };
    assert!(gateway.publish_event(&telemetry(), &MockLink(true), &mut client).is_err());
    assert_eq!(client.attempts, 1);
    assert_eq!(gateway.dropped(), 1);
}

#[test]
fn publisher_drains_alerts_before_telemetry() {
    let mut gateway = MessagingGateway::new();
    let mut client = MockPublisher::default();
    let queue = OutboundQueue::new();
    queue.push(telemetry());
    queue.push(OutboundEvent::Heartbeat(StatusData { uptime_ms: 1, mode: AlertMode::Off, override_active: false }));
    queue.push(fire_alert(1));

    while gateway.poll_outbound(&queue, &MockLink(true), &mut client, WAIT).is_some() {}

    let topics: Vec<_> = client.published.iter().map(|p| p.topic.as_str()).collect();
    assert_eq!(topics, [TOPIC_ALERT, TOPIC_SENSOR_DATA, "fire_system/status"]);
    assert_eq!(gateway.published(), 3);
}

#[test]
fn queue_drains_while_client_is_missing() {
    let mut gateway = MessagingGateway::new();
    let mut client: Option<MockPublisher> = None;
    let queue = OutboundQueue::new();
    queue.push(fire_alert(1));
    queue.push(telemetry());

    // Link flags can read up before the client exists.
    let results: Vec<_> =
        std::iter::from_fn(|| gateway.poll_outbound(&queue, &MockLink(true), &mut client, WAIT)).collect();
    assert_eq!(results, [Err(CommsError::LinkDown), Err(CommsError::LinkDown)]);
    assert_eq!(gateway.dropped(), 2);
    assert_eq!(queue.try_next(), None);

    let mut client = Some(MockPublisher::default());
    queue.push(telemetry());
    assert!(gateway.poll_outbound(&queue, &MockLink(true), &mut client, WAIT).unwrap().is_ok());
    assert_eq!(client.map(|c| c.published.len()), Some(1));
}

#[test]
fn publish_cycle_emits_telemetry_and_heartbeat_on_schedule() {
    let mut gateway = MessagingGateway::new();
    let mut client = MockPublisher::default();
    let queue = OutboundQueue::new();
    let detection = SharedDetection::new();
    let session = SharedSession::new();
    let mut schedule = workers::PublishSchedule {
        telemetry: workers::Interval::new(5000, 0),
        heartbeat: workers::Interval::new(5000, 0),
    };

    let mut cycle = |now: u64, client: &mut MockPublisher| {
        workers::publish_cycle(
            &mut gateway, &mut schedule, &detection, &session, &queue, &MockLink(true), client, now, WAIT,
        )
    };

    assert!(cycle(1000, &mut client).is_none(), "nothing due yet");
    assert!(cycle(5000, &mut client).is_some());
    assert!(cycle(5100, &mut client).is_some());
    assert!(cycle(5200, &mut client).is_none());

    let topics: Vec<_> = client.published.iter().map(|p| p.topic.as_str()).collect();
    assert_eq!(topics, [TOPIC_SENSOR_DATA, "fire_system/status"]);
    assert_eq!(client.published[1].payload["status"], "online");
    assert_eq!(client.published[1].level, DeliveryLevel::AtMostOnce);
}
