//! Inbound control messages and their parsing.
//!
//! Payloads are JSON objects with a `command` field:
//!
//! | command      | extra field            | result                         |
//! |--------------|------------------------|--------------------------------|
//! | `buzzer_on`  | -                      | pin `Normal`                   |
//! | `buzzer_off` | -                      | clear override, silence        |
//! | `test_alarm` | -                      | pin `Alarm`, auto-revert       |
//! | `set_mode`   | `mode`: name or 0..=3  | pin that mode (`off` clears)   |

use heapless::String;
use serde_json::Value;

use crate::app::commands::AlertCommand;
use crate::drivers::buzzer::AlertMode;
use crate::error::CommandError;

/// Topic buffer capacity, bytes.
pub const MAX_TOPIC_LEN: usize = 128;
/// Payload buffer capacity, bytes.
pub const MAX_PAYLOAD_LEN: usize = 512;

/// One message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: String<MAX_PAYLOAD_LEN>,
}

impl RemoteCommand {
    /// Copy a raw broker message into fixed buffers.
    pub fn new(topic: &str, payload: &[u8]) -> Result<Self, CommandError> {
        let payload = core::str::from_utf8(payload).map_err(|_| CommandError::Malformed)?;
        let mut t = String::new();
        let mut p = String::new();
        t.push_str(topic).map_err(|_| CommandError::TooLarge)?;
        p.push_str(payload).map_err(|_| CommandError::TooLarge)?;
        Ok(Self { topic: t, payload: p })
    }

    /// Validate the payload into an [`AlertCommand`].
    pub fn parse(&self) -> Result<AlertCommand, CommandError> {
        parse_command(&self.payload)
    }
}

/// Resolve a `mode` field given by name or by index.
fn resolve_mode(field: Option<&Value>) -> Result<AlertMode, CommandError> {
    match field {
        Some(Value::String(name)) => AlertMode::from_name(name).ok_or(CommandError::InvalidMode),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|i| u8::try_from(i).ok())
            .ok_or(CommandError::InvalidMode)
            .and_then(AlertMode::try_from),
        _ => Err(CommandError::InvalidMode),
    }
}

/// Parse a JSON control payload.  Anything but a JSON object is malformed.
pub fn parse_command(payload: &str) -> Result<AlertCommand, CommandError> {
    let doc: Value = serde_json::from_str(payload).map_err(|_| CommandError::Malformed)?;
    let body = doc.as_object().ok_or(CommandError::Malformed)?;
    let command = body
        .get("command")
        .and_then(Value::as_str)
        .ok_or(CommandError::MissingCommand)?;

    match command {
        "buzzer_on" => Ok(AlertCommand::BuzzerOn),
        "buzzer_off" => Ok(AlertCommand::BuzzerOff),
        "test_alarm" => Ok(AlertCommand::TestAlarm),
        "set_mode" => resolve_mode(body.get("mode")).map(AlertCommand::SetMode),
        _ => Err(CommandError::Unrecognized),
    }
}
