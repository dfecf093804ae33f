//! Port traits: the hexagonal boundary between the detection core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SensorReader / AlertService / MessagingGateway
//! ```
//!
//! Driven adapters (ADC/GPIO sampling, LEDC buzzer, MQTT client, Wi-Fi link)
//! implement these traits.  The core consumes them via generics, so the
//! domain never touches hardware or the network directly.
//!
//! All collaborator failures are typed and non-fatal: a failed sample is
//! carried forward, a failed publish drops the event.

use core::time::Duration;

use crate::drivers::buzzer::AlertMode;
use crate::error::{ActuatorError, CommsError, SensorError};
use crate::gateway::commands::RemoteCommand;
use crate::sensors::SensorKind;

use super::events::OutboundEvent;

// ───────────────────────────────────────────────────────────────
// Peripheral sampling (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw per-channel sampling.  Digital channels report `0` or full scale.
pub trait PeripheralPort {
    fn read_channel(&mut self, kind: SensorKind) -> Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Buzzer hardware (domain → PWM)
// ───────────────────────────────────────────────────────────────

/// Tone generation primitive used by the waveform loop.
pub trait BuzzerPort {
    /// Start (or retune) the tone at `frequency_hz` with `duty_percent` (0–100).
    fn set_waveform(&mut self, frequency_hz: u32, duty_percent: u8) -> Result<(), ActuatorError>;

    /// Silence the output.  Infallible: the duty register write is retried
    /// by the next call if it fails.
    fn waveform_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Actuator mode (state machine → waveform loop)
// ───────────────────────────────────────────────────────────────

/// Non-blocking mode hand-off to the buzzer's own execution context.
pub trait ActuatorPort {
    fn set_mode(&mut self, mode: AlertMode);
}

// ───────────────────────────────────────────────────────────────
// Event sink (state machine → messaging gateway)
// ───────────────────────────────────────────────────────────────

/// Outbound events leave the core through this port.  Implementations must
/// not block; the outbound channel drops new events when full.
pub trait EventSink {
    fn emit(&mut self, event: OutboundEvent);
}

// ───────────────────────────────────────────────────────────────
// Messaging collaborators
// ───────────────────────────────────────────────────────────────

/// Broker-assigned identifier for an accepted publish.
pub type MessageId = u32;

/// Assurance tier for an outbound publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryLevel {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Link manager view: is the network path usable right now.
pub trait LinkPort {
    fn is_link_up(&self) -> bool;
}

/// Pub/sub client, outbound half.
pub trait PublishPort {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        level: DeliveryLevel,
        retained: bool,
    ) -> Result<MessageId, CommsError>;
}

/// A client that has not been created yet reports the link down, so queued
/// events keep draining while the connection is retried.
impl<P: PublishPort> PublishPort for Option<P> {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        level: DeliveryLevel,
        retained: bool,
    ) -> Result<MessageId, CommsError> {
        match self {
            Some(client) => client.publish(topic, payload, level, retained),
            None => Err(CommsError::LinkDown),
        }
    }
}

/// Pub/sub client, inbound half.  Blocks for at most `timeout`.
pub trait InboxPort {
    fn try_receive(&mut self, timeout: Duration) -> Option<RemoteCommand>;
}

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic time source in milliseconds since boot.
pub trait TimePort {
    fn uptime_ms(&self) -> u64;
}
