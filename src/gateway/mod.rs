//! Messaging gateway: bridges the detection core and the pub/sub link.
//!
//! ```text
//!  ┌──────────────┐  RemoteCommand  ┌──────────────────┐  AlertCommand  ┌──────────────┐
//!  │ broker client│────────────────▶│ MessagingGateway │───────────────▶│ alert worker │
//!  │  (callback)  │                 │  topic · rate ·  │                └──────────────┘
//!  └──────────────┘                 │  parse           │
//!         ▲                         │                  │  OutboundEvent ┌──────────────┐
//!         └──publish()──────────────│  encode · route  │◀───────────────│ OUTBOUND     │
//!                                   └──────────────────┘                └──────────────┘
//! ```
//!
//! Neither direction can stall detection: inbound commands are queued for
//! the alert worker, and outbound events are dropped, never held, while the
//! link is down.

pub mod channels;
pub mod commands;
pub mod payload;

use core::time::Duration;

use burster::Limiter;
use log::{debug, info, warn};

use crate::app::commands::AlertCommand;
use crate::app::events::OutboundEvent;
use crate::app::ports::{InboxPort, LinkPort, MessageId, PublishPort};
use crate::config::TOPIC_CONTROL;
use crate::error::{CommandError, CommsError};

use channels::{CommandQueue, OutboundQueue};
use commands::RemoteCommand;

/// Inbound commands accepted per second (and burst size).
pub const COMMAND_RATE_PER_SEC: u64 = 5;

pub struct MessagingGateway {
    rate_limiter: burster::TokenBucket<fn() -> Duration>,
    published: u32,
    dropped: u32,
}

impl MessagingGateway {
    pub fn new() -> Self {
        Self::with_clock(platform_now)
    }

    /// Use an explicit monotonic clock for the rate limiter.
    pub fn with_clock(now: fn() -> Duration) -> Self {
        Self {
            rate_limiter: burster::TokenBucket::new_with_time_provider(
                COMMAND_RATE_PER_SEC,
                COMMAND_RATE_PER_SEC,
                now,
            ),
            published: 0,
            dropped: 0,
        }
    }

    // ── Inbound ──────────────────────────────────────────────

    /// Validate one inbound message and forward the command.  Rejections are
    /// logged here and returned for the caller's bookkeeping only.
    pub fn handle_inbound(
        &mut self,
        msg: &RemoteCommand,
        commands: &CommandQueue,
    ) -> Result<AlertCommand, CommandError> {
        let result = self.validate(msg);
        match result {
            Ok(cmd) => {
                info!("Gateway: command {} accepted", cmd.name());
                commands.push(cmd);
            }
            Err(CommandError::WrongTopic) => debug!("Gateway: ignoring message on '{}'", msg.topic),
            Err(CommandError::Unrecognized) => {
                info!("Gateway: unrecognized command ignored: {}", msg.payload);
            }
            Err(CommandError::RateLimited) => warn!("Gateway: command rate limited, dropped"),
            Err(e) => warn!("Gateway: dropping control message ({}): {}", e, msg.payload),
        }
        result
    }

    fn validate(&mut self, msg: &RemoteCommand) -> Result<AlertCommand, CommandError> {
        if msg.topic.as_str() != TOPIC_CONTROL {
            return Err(CommandError::WrongTopic);
        }
        if self.rate_limiter.try_consume(1).is_err() {
            return Err(CommandError::RateLimited);
        }
        msg.parse()
    }

    /// Wait up to `timeout` for one inbound message and handle it.
    pub fn poll_inbound(
        &mut self,
        inbox: &mut impl InboxPort,
        commands: &CommandQueue,
        timeout: Duration,
    ) -> Option<Result<AlertCommand, CommandError>> {
        let msg = inbox.try_receive(timeout)?;
        Some(self.handle_inbound(&msg, commands))
    }

    // ── Outbound ─────────────────────────────────────────────

    /// Publish one event.  With the link down the event is dropped without
    /// a publish attempt.  A failed fire alert is retried once.
    pub fn publish_event(
        &mut self,
        event: &OutboundEvent,
        link: &impl LinkPort,
        client: &mut impl PublishPort,
    ) -> Result<MessageId, CommsError> {
        if !link.is_link_up() {
            self.dropped += 1;
            warn!("Gateway: link down, dropping {}", event.kind());
            return Err(CommsError::LinkDown);
        }

        let encoded = payload::encode(event).inspect_err(|e| {
            self.dropped += 1;
            warn!("Gateway: cannot encode {}: {}", event.kind(), e);
        })?;

        let attempts = if matches!(event, OutboundEvent::FireAlert(_)) { 2 } else { 1 };
        let mut last_err = CommsError::MqttPublishFailed;
        for attempt in 1..=attempts {
            match client.publish(encoded.topic, &encoded.payload, encoded.level, encoded.retained) {
                Ok(id) => {
                    self.published += 1;
                    debug!("Gateway: {} published (id={}, attempt {})", event.kind(), id, attempt);
                    return Ok(id);
                }
                Err(e) => {
                    warn!("Gateway: {} publish attempt {} failed: {}", event.kind(), attempt, e);
                    last_err = e;
                }
            }
        }
        self.dropped += 1;
        warn!("Gateway: dropping {} after {} attempt(s)", event.kind(), attempts);
        Err(last_err)
    }

    /// Wait up to `timeout` for the next queued event and publish it.
    pub fn poll_outbound(
        &mut self,
        queue: &OutboundQueue,
        link: &impl LinkPort,
        client: &mut impl PublishPort,
        timeout: Duration,
    ) -> Option<Result<MessageId, CommsError>> {
        let event = queue.next_timeout(timeout)?;
        Some(self.publish_event(&event, link, client))
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl Default for MessagingGateway {
    fn default() -> Self {
        Self::new()
    }
}

// ── Platform time for rate limiter ───────────────────────────

#[cfg(target_os = "espidf")]
fn platform_now() -> Duration {
    // SAFETY: esp_timer_get_time reads the monotonic high-resolution timer.
    let us = unsafe { esp_idf_sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(target_os = "espidf"))]
fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
