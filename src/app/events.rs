//! Outbound application events.
//!
//! The alert service and the periodic workers emit these through the
//! [`EventSink`](super::ports::EventSink) port.  The messaging gateway
//! serializes them and picks topic, delivery level, and retention.

use crate::drivers::buzzer::AlertMode;
use crate::sensors::SensorKind;
use crate::state::DetectionState;

/// Structured events leaving the detection core.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Periodic telemetry of all four readings.
    SensorSnapshot(TelemetryData),

    /// Rising edge of a fire detection.
    FireAlert(FireAlertData),

    /// Periodic liveness report.
    Heartbeat(StatusData),
}

impl OutboundEvent {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SensorSnapshot(_) => "telemetry",
            Self::FireAlert(_) => "fire_alert",
            Self::Heartbeat(_) => "heartbeat",
        }
    }
}

/// A point-in-time telemetry snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub timestamp_ms: u64,
    pub smoke: f32,
    pub temperature: f32,
    /// The flame channel is a digital detector; only its verdict is reported.
    pub ir_flame: bool,
    pub gas: f32,
    pub fire_detected: bool,
}

impl TelemetryData {
    pub fn from_detection(state: &DetectionState, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            smoke: state.level(SensorKind::Smoke),
            temperature: state.level(SensorKind::Temperature),
            ir_flame: state.reading(SensorKind::InfraredFlame).triggered,
            gas: state.level(SensorKind::Gas),
            fire_detected: state.fire_detected,
        }
    }
}

/// Full detection snapshot captured at the fire edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireAlertData {
    /// Monotonic per boot; lets subscribers drop a redelivered duplicate.
    pub alert_id: u32,
    /// When the alert worker raised the alert.
    pub timestamp_ms: u64,
    pub detection: DetectionState,
}

impl FireAlertData {
    /// Time the fire was first detected; falls back to the raise time for a
    /// snapshot that was never stamped.
    pub fn detected_at_ms(&self) -> u64 {
        self.detection.detected_at_ms.unwrap_or(self.timestamp_ms)
    }
}

/// Heartbeat body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusData {
    pub uptime_ms: u64,
    pub mode: AlertMode,
    pub override_active: bool,
}
