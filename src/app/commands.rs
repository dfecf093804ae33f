//! Inbound commands to the alert service.
//!
//! These are the validated form of remote control messages; parsing and
//! rejection happen in the messaging gateway before anything reaches the
//! [`AlertService`](super::service::AlertService).

use crate::drivers::buzzer::AlertMode;

/// Commands that can pin or clear the alert override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCommand {
    /// Pin the override to `Normal`.
    BuzzerOn,
    /// Clear the override and silence the buzzer.
    BuzzerOff,
    /// Pin `Alarm` for the configured test duration, then auto-revert.
    TestAlarm,
    /// Pin an explicit mode; `Off` behaves like `BuzzerOff`.
    SetMode(AlertMode),
}

impl AlertCommand {
    /// Mode this command asks for.
    pub const fn target_mode(self) -> AlertMode {
        match self {
            Self::BuzzerOn => AlertMode::Normal,
            Self::BuzzerOff => AlertMode::Off,
            Self::TestAlarm => AlertMode::Alarm,
            Self::SetMode(mode) => mode,
        }
    }

    /// Wire name, used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BuzzerOn => "buzzer_on",
            Self::BuzzerOff => "buzzer_off",
            Self::TestAlarm => "test_alarm",
            Self::SetMode(_) => "set_mode",
        }
    }
}
