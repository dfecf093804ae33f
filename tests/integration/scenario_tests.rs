//! End-to-end detection scenarios: sensors → fusion → alert → gateway.

use firesentry::app::events::OutboundEvent;
use firesentry::app::service::AlertService;
use firesentry::config::SystemConfig;
use firesentry::drivers::buzzer::AlertMode;
use firesentry::error::CommsError;
use firesentry::gateway::MessagingGateway;
use firesentry::gateway::channels::OutboundQueue;
use firesentry::sensors::{SensorKind, SensorReader};
use firesentry::state::DetectionState;

use crate::mock_hw::{MockBuzzer, MockLink, MockPublisher, MockSensors, RecordingSink};

struct Rig {
    reader: SensorReader,
    sensors: MockSensors,
    state: DetectionState,
    service: AlertService,
    buzzer: MockBuzzer,
}

impl Rig {
    fn new() -> Self {
        let config = SystemConfig::default();
        let mut service = AlertService::new(&config);
        let mut buzzer = MockBuzzer::default();
        service.start(&mut buzzer);
        Self {
            reader: SensorReader::new(&config),
            sensors: MockSensors::quiet(),
            state: DetectionState::new(),
            service,
            buzzer,
        }
    }

    /// One sensor cycle followed by one alert evaluation.
    fn step(&mut self, now_ms: u64, sink: &mut impl firesentry::app::ports::EventSink) {
        self.reader.sample_all(&mut self.sensors, now_ms, &mut self.state);
        self.service.evaluate(self.state, now_ms, &mut self.buzzer, sink);
    }
}

#[test]
fn smoke_then_gas_raises_one_alarm() {
    let mut rig = Rig::new();
    let mut sink = RecordingSink::default();

    rig.sensors.set(SensorKind::Smoke, 0.9);
    rig.sensors.set(SensorKind::Temperature, 0.2);
    rig.sensors.set(SensorKind::Gas, 0.1);
    rig.step(0, &mut sink);
    assert!(!rig.state.fire_detected, "one indirect sensor is not enough");
    assert_eq!(rig.buzzer.current(), AlertMode::Off);

    rig.sensors.set(SensorKind::Gas, 0.75);
    rig.step(500, &mut sink);
    assert!(rig.state.fire_detected);
    assert_eq!(rig.state.detected_at_ms, Some(500));
    assert_eq!(rig.buzzer.current(), AlertMode::Alarm);

    rig.step(1000, &mut sink);
    assert_eq!(rig.state.detected_at_ms, Some(500), "held for the episode");

    match &sink.events[..] {
        [OutboundEvent::FireAlert(a)] => {
            assert_eq!(a.alert_id, 1);
            assert_eq!(a.timestamp_ms, 500);
            assert!(a.detection.level(SensorKind::Smoke) > 0.7);
            assert!(a.detection.level(SensorKind::Gas) > 0.7);
        }
        other => panic!("expected exactly one fire alert, got {other:?}"),
    }
}

#[test]
fn flame_alone_is_sufficient() {
    let mut rig = Rig::new();
    let mut sink = RecordingSink::default();
    rig.sensors.set(SensorKind::InfraredFlame, 1.0);
    rig.step(0, &mut sink);
    assert!(rig.state.fire_detected);
    assert_eq!(rig.buzzer.current(), AlertMode::Alarm);
}

#[test]
fn failed_channel_carries_last_value_forward() {
    let mut rig = Rig::new();
    let mut sink = RecordingSink::default();
    rig.sensors.set(SensorKind::Smoke, 0.9);
    rig.sensors.set(SensorKind::Temperature, 0.9);
    rig.step(0, &mut sink);
    assert!(rig.state.fire_detected);

    rig.sensors.fail(SensorKind::Temperature);
    rig.step(500, &mut sink);
    let temp = rig.state.reading(SensorKind::Temperature);
    assert!(temp.triggered);
    assert_eq!(temp.sampled_at_ms, 0, "stale reading kept");
    assert!(rig.state.fire_detected);
    assert_eq!(sink.fire_alert_ids(), [1]);
}

#[test]
fn link_down_still_alarms_locally_and_drops_publish() {
    let mut rig = Rig::new();
    let queue = OutboundQueue::new();
    let mut sink = &queue;

    rig.sensors.set(SensorKind::InfraredFlame, 1.0);
    rig.step(0, &mut sink);
    assert_eq!(rig.buzzer.current(), AlertMode::Alarm);

    let mut gateway = MessagingGateway::new();
    let mut client = MockPublisher::default();
    let event = queue.try_next().expect("fire alert queued");
    assert_eq!(
        gateway.publish_event(&event, &MockLink(false), &mut client),
        Err(CommsError::LinkDown)
    );
    assert_eq!(client.attempts, 0, "no publish attempted with the link down");
    assert_eq!(gateway.dropped(), 1);
    assert_eq!(queue.try_next(), None, "dropped, not held");

    // Detection keeps running and stays in alarm.
    rig.step(500, &mut sink);
    assert_eq!(rig.buzzer.current(), AlertMode::Alarm);
}
