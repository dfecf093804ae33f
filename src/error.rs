//! Unified error types for the FireSentry firmware.
//!
//! One `Copy` enum per subsystem, all convertible into the top-level
//! [`Error`].  None of these are fatal inside the detection core: sensor
//! errors are absorbed by carrying the last value forward, comms errors drop
//! the outbound event, and command errors leave the alert state untouched.

use core::fmt;

use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor channel could not be sampled.
    Sensor(SensorError),
    /// The buzzer PWM could not be driven.
    Actuator(ActuatorError),
    /// The messaging link or broker client failed.
    Comms(CommsError),
    /// An inbound control message was rejected.
    Command(CommandError),
    /// Peripheral initialisation failed.
    Init(HwInitError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC oneshot read returned an error.
    AdcReadFailed,
    /// The channel was never configured.
    NotConfigured,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::NotConfigured => write!(f, "channel not configured"),
        }
    }
}

impl std::error::Error for Error {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// LEDC frequency change was rejected (outside the timer's range).
    FrequencyRejected,
    /// LEDC duty write failed.
    PwmWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrequencyRejected => write!(f, "PWM frequency rejected"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiConnectFailed,
    LinkDown,
    MqttPublishFailed,
    MqttSubscribeFailed,
    PayloadTooLarge,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::LinkDown => write!(f, "link down"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Inbound command errors
// ---------------------------------------------------------------------------

/// Why an inbound control message did not produce an alert command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Topic or payload exceeds the fixed message buffers.
    TooLarge,
    /// Payload is not UTF-8 or not a JSON object.
    Malformed,
    /// JSON object has no string `command` field.
    MissingCommand,
    /// `command` is a string we do not act on.
    Unrecognized,
    /// Requested alert mode is outside the known set.
    InvalidMode,
    /// Message arrived on a topic other than the control channel.
    WrongTopic,
    /// Too many commands in a short window.
    RateLimited,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge => write!(f, "message too large"),
            Self::Malformed => write!(f, "malformed payload"),
            Self::MissingCommand => write!(f, "missing command field"),
            Self::Unrecognized => write!(f, "unrecognized command"),
            Self::InvalidMode => write!(f, "invalid alert mode"),
            Self::WrongTopic => write!(f, "not a control topic"),
            Self::RateLimited => write!(f, "rate limited"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsystem_errors_convert_and_display() {
        let e: Error = CommandError::InvalidMode.into();
        assert_eq!(e, Error::Command(CommandError::InvalidMode));
        assert_eq!(e.to_string(), "command: invalid alert mode");

        let e: Error = SensorError::AdcReadFailed.into();
        assert_eq!(e.to_string(), "sensor: ADC read failed");

        let e: Error = HwInitError::LedcInitFailed(-1).into();
        assert_eq!(e.to_string(), "init: LEDC timer/channel config failed (rc=-1)");
    }
}
