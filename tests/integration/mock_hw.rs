//! Mock ports for integration tests.
//!
//! Every mock records what the core asked of it, so tests can assert on the
//! full call history without touching ADC, PWM, or a broker.

use std::collections::VecDeque;
use std::time::Duration;

use firesentry::app::events::OutboundEvent;
use firesentry::app::ports::{
    ActuatorPort, DeliveryLevel, EventSink, InboxPort, LinkPort, MessageId, PeripheralPort,
    PublishPort,
};
use firesentry::drivers::buzzer::AlertMode;
use firesentry::error::{CommsError, SensorError};
use firesentry::gateway::commands::RemoteCommand;
use firesentry::sensors::SensorKind;

pub const FULL_SCALE: u16 = 4095;

/// Raw value for a normalized level at the default full scale.
pub fn raw(level: f32) -> u16 {
    (level * f32::from(FULL_SCALE)).round() as u16
}

// ── Sensors ───────────────────────────────────────────────────

/// Per-channel raw values; `None` makes that channel fail.
pub struct MockSensors {
    pub raw: [Option<u16>; 4],
}

#[allow(dead_code)]
impl MockSensors {
    pub fn quiet() -> Self {
        Self { raw: [Some(0); 4] }
    }

    pub fn set(&mut self, kind: SensorKind, level: f32) {
        self.raw[kind.index()] = Some(raw(level));
    }

    pub fn fail(&mut self, kind: SensorKind) {
        self.raw[kind.index()] = None;
    }
}

impl PeripheralPort for MockSensors {
    fn read_channel(&mut self, kind: SensorKind) -> Result<u16, SensorError> {
        self.raw[kind.index()].ok_or(SensorError::AdcReadFailed)
    }
}

// ── Actuator ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBuzzer {
    pub modes: Vec<AlertMode>,
}

#[allow(dead_code)]
impl MockBuzzer {
    pub fn current(&self) -> AlertMode {
        self.modes.last().copied().unwrap_or(AlertMode::Off)
    }
}

impl ActuatorPort for MockBuzzer {
    fn set_mode(&mut self, mode: AlertMode) {
        self.modes.push(mode);
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<OutboundEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn fire_alert_ids(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                OutboundEvent::FireAlert(a) => Some(a.alert_id),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: OutboundEvent) {
        self.events.push(event);
    }
}

// ── Messaging ─────────────────────────────────────────────────

pub struct MockLink(pub bool);

impl LinkPort for MockLink {
    fn is_link_up(&self) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: serde_json::Value,
    pub level: DeliveryLevel,
    pub retained: bool,
}

/// Records publishes; the first `fail_next` calls are refused.
#[derive(Default)]
pub struct MockPublisher {
    pub attempts: u32,
    pub fail_next: u32,
    pub published: Vec<Published>,
}

impl PublishPort for MockPublisher {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        level: DeliveryLevel,
        retained: bool,
    ) -> Result<MessageId, CommsError> {
        self.attempts += 1;
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(CommsError::MqttPublishFailed);
        }
        self.published.push(Published {
            topic: topic.into(),
            payload: serde_json::from_slice(payload).expect("payload is JSON"),
            level,
            retained,
        });
        Ok(self.published.len() as MessageId)
    }
}

#[derive(Default)]
pub struct ScriptedInbox {
    pub queue: VecDeque<RemoteCommand>,
}

#[allow(dead_code)]
impl ScriptedInbox {
    pub fn push(&mut self, topic: &str, payload: &str) {
        self.queue
            .push_back(RemoteCommand::new(topic, payload.as_bytes()).expect("fits buffers"));
    }
}

impl InboxPort for ScriptedInbox {
    fn try_receive(&mut self, _timeout: Duration) -> Option<RemoteCommand> {
        self.queue.pop_front()
    }
}
