//! JSON bodies for outbound topics.

use serde::Serialize;

use crate::app::events::{FireAlertData, OutboundEvent, StatusData, TelemetryData};
use crate::app::ports::DeliveryLevel;
use crate::config::{TOPIC_ALERT, TOPIC_SENSOR_DATA, TOPIC_STATUS};
use crate::error::CommsError;
use crate::sensors::SensorKind;

use super::commands::MAX_PAYLOAD_LEN;

/// Last-will body, published retained by the broker on an unclean drop.
pub const OFFLINE_STATUS: &str = r#"{"status":"offline"}"#;

#[derive(Serialize)]
struct TelemetryBody {
    timestamp: u64,
    smoke: f32,
    temperature: f32,
    ir_flame: bool,
    gas: f32,
    fire_detected: bool,
}

#[derive(Serialize)]
struct AlertBody {
    #[serde(rename = "type")]
    kind: &'static str,
    detected: bool,
    timestamp: u64,
    smoke: f32,
    temperature: f32,
    ir_flame: bool,
    gas: f32,
    triggered: TriggeredBody,
    alert_id: u32,
}

/// Per-channel verdicts at the moment of detection.
#[derive(Serialize)]
struct TriggeredBody {
    smoke: bool,
    temperature: bool,
    ir_flame: bool,
    gas: bool,
}

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
    uptime: u64,
    mode: &'static str,
    #[serde(rename = "override")]
    override_active: bool,
}

impl From<&TelemetryData> for TelemetryBody {
    fn from(t: &TelemetryData) -> Self {
        Self {
            timestamp: t.timestamp_ms,
            smoke: t.smoke,
            temperature: t.temperature,
            ir_flame: t.ir_flame,
            gas: t.gas,
            fire_detected: t.fire_detected,
        }
    }
}

impl From<&FireAlertData> for AlertBody {
    fn from(a: &FireAlertData) -> Self {
        let d = &a.detection;
        Self {
            kind: "fire_alert",
            detected: d.fire_detected,
            timestamp: a.detected_at_ms(),
            smoke: d.level(SensorKind::Smoke),
            temperature: d.level(SensorKind::Temperature),
            ir_flame: d.reading(SensorKind::InfraredFlame).triggered,
            gas: d.level(SensorKind::Gas),
            triggered: TriggeredBody {
                smoke: d.reading(SensorKind::Smoke).triggered,
                temperature: d.reading(SensorKind::Temperature).triggered,
                ir_flame: d.reading(SensorKind::InfraredFlame).triggered,
                gas: d.reading(SensorKind::Gas).triggered,
            },
            alert_id: a.alert_id,
        }
    }
}

impl From<&StatusData> for StatusBody {
    fn from(s: &StatusData) -> Self {
        Self {
            status: "online",
            uptime: s.uptime_ms,
            mode: s.mode.name(),
            override_active: s.override_active,
        }
    }
}

/// A serialized event with its routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub topic: &'static str,
    pub payload: Vec<u8>,
    pub level: DeliveryLevel,
    pub retained: bool,
}

/// Serialize an event and pick topic, delivery level, and retention.
pub fn encode(event: &OutboundEvent) -> Result<Encoded, CommsError> {
    let (topic, payload, level, retained) = match event {
        OutboundEvent::SensorSnapshot(t) => (
            TOPIC_SENSOR_DATA,
            serde_json::to_vec(&TelemetryBody::from(t)),
            DeliveryLevel::AtLeastOnce,
            false,
        ),
        OutboundEvent::FireAlert(a) => (
            TOPIC_ALERT,
            serde_json::to_vec(&AlertBody::from(a)),
            DeliveryLevel::ExactlyOnce,
            true,
        ),
        OutboundEvent::Heartbeat(s) => (
            TOPIC_STATUS,
            serde_json::to_vec(&StatusBody::from(s)),
            DeliveryLevel::AtMostOnce,
            false,
        ),
    };
    let payload = payload.map_err(|_| CommsError::PayloadTooLarge)?;
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(CommsError::PayloadTooLarge);
    }
    Ok(Encoded { topic, payload, level, retained })
}
