//! Inter-worker channels and link flags.
//!
//! Bounded `embassy-sync` channels in statics bridge the periodic workers
//! without heap allocation.  Every producer uses `try_send`, so a full
//! channel drops the **new** item instead of blocking the producer.
//!
//! ```text
//!  MQTT callback ──RemoteCommand──▶ INBOUND ──▶ inbound worker
//!  inbound worker ──AlertCommand──▶ COMMANDS ──▶ alert worker
//!  alert / telemetry workers ──OutboundEvent──▶ OUTBOUND ──▶ publisher
//!                                   (alerts lane drained first)
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future;
use log::warn;

use crate::app::commands::AlertCommand;
use crate::app::events::OutboundEvent;
use crate::app::ports::{EventSink, InboxPort, LinkPort};

use super::commands::RemoteCommand;

/// Fire alerts waiting for the publisher.
pub const ALERT_QUEUE_DEPTH: usize = 4;
/// Telemetry and heartbeats waiting for the publisher.
pub const TELEMETRY_QUEUE_DEPTH: usize = 8;
/// Raw inbound messages waiting for validation.
pub const INBOUND_QUEUE_DEPTH: usize = 10;
/// Validated commands waiting for the alert worker.
pub const COMMAND_QUEUE_DEPTH: usize = 8;

/// Wait on `fut` for at most `timeout`.
fn block_on_timeout<T>(fut: impl Future<Output = T>, timeout: Duration) -> Option<T> {
    future::block_on(future::or(async { Some(fut.await) }, async {
        async_io_mini::Timer::after(timeout).await;
        None
    }))
}

// ── Outbound ─────────────────────────────────────────────────

/// Two-lane outbound queue: fire alerts never wait behind telemetry.
pub struct OutboundQueue {
    alerts: Channel<CriticalSectionRawMutex, OutboundEvent, ALERT_QUEUE_DEPTH>,
    telemetry: Channel<CriticalSectionRawMutex, OutboundEvent, TELEMETRY_QUEUE_DEPTH>,
    dropped: AtomicU32,
}

impl OutboundQueue {
    pub const fn new() -> Self {
        Self {
            alerts: Channel::new(),
            telemetry: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue without blocking.  Returns `false` if the lane was full and
    /// the event was dropped.
    pub fn push(&self, event: OutboundEvent) -> bool {
        let kind = event.kind();
        let sent = if matches!(event, OutboundEvent::FireAlert(_)) {
            self.alerts.try_send(event).is_ok()
        } else {
            self.telemetry.try_send(event).is_ok()
        };
        if !sent {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Outbound: {} queue full, dropping new event", kind);
        }
        sent
    }

    /// Next event without waiting, alerts first.
    pub fn try_next(&self) -> Option<OutboundEvent> {
        self.alerts
            .try_receive()
            .ok()
            .or_else(|| self.telemetry.try_receive().ok())
    }

    /// Next event, waiting up to `timeout`.  Alerts win ties.
    pub fn next_timeout(&self, timeout: Duration) -> Option<OutboundEvent> {
        if let Some(event) = self.try_next() {
            return Some(event);
        }
        block_on_timeout(future::or(self.alerts.receive(), self.telemetry.receive()), timeout)
    }

    /// Events dropped because a lane was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for &OutboundQueue {
    fn emit(&mut self, event: OutboundEvent) {
        self.push(event);
    }
}

// ── Commands ─────────────────────────────────────────────────

/// Validated commands for the alert worker.
pub struct CommandQueue {
    inner: Channel<CriticalSectionRawMutex, AlertCommand, COMMAND_QUEUE_DEPTH>,
}

impl CommandQueue {
    pub const fn new() -> Self {
        Self { inner: Channel::new() }
    }

    pub fn push(&self, cmd: AlertCommand) -> bool {
        let sent = self.inner.try_send(cmd).is_ok();
        if !sent {
            warn!("Commands: queue full, dropping {}", cmd.name());
        }
        sent
    }

    pub fn try_next(&self) -> Option<AlertCommand> {
        self.inner.try_receive().ok()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ── Inbound ──────────────────────────────────────────────────

/// Raw messages from the broker client callback.
pub struct InboundQueue {
    inner: Channel<CriticalSectionRawMutex, RemoteCommand, INBOUND_QUEUE_DEPTH>,
}

impl InboundQueue {
    pub const fn new() -> Self {
        Self { inner: Channel::new() }
    }

    /// Called from the client callback; never blocks.
    pub fn push(&self, msg: RemoteCommand) -> bool {
        let sent = self.inner.try_send(msg).is_ok();
        if !sent {
            warn!("Inbound: queue full, dropping message");
        }
        sent
    }

    pub fn receive_timeout(&self, timeout: Duration) -> Option<RemoteCommand> {
        if let Ok(msg) = self.inner.try_receive() {
            return Some(msg);
        }
        block_on_timeout(self.inner.receive(), timeout)
    }
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// [`InboxPort`] over an [`InboundQueue`].
pub struct ChannelInbox<'a>(pub &'a InboundQueue);

impl InboxPort for ChannelInbox<'_> {
    fn try_receive(&mut self, timeout: Duration) -> Option<RemoteCommand> {
        self.0.receive_timeout(timeout)
    }
}

// ── Link flags ───────────────────────────────────────────────

/// Connectivity as reported by the link manager and the broker client.
pub struct LinkStatus {
    wifi_up: AtomicBool,
    broker_up: AtomicBool,
    subscribe_pending: AtomicBool,
}

impl LinkStatus {
    pub const fn new() -> Self {
        Self {
            wifi_up: AtomicBool::new(false),
            broker_up: AtomicBool::new(false),
            subscribe_pending: AtomicBool::new(false),
        }
    }

    pub fn set_wifi(&self, up: bool) {
        self.wifi_up.store(up, Ordering::Release);
    }

    /// A fresh broker session also needs the control subscription renewed.
    pub fn set_broker(&self, up: bool) {
        self.broker_up.store(up, Ordering::Release);
        self.subscribe_pending.store(up, Ordering::Release);
    }

    pub fn wifi_up(&self) -> bool {
        self.wifi_up.load(Ordering::Acquire)
    }

    pub fn broker_up(&self) -> bool {
        self.broker_up.load(Ordering::Acquire)
    }

    /// Returns `true` once per broker (re)connection.
    pub fn take_subscribe_request(&self) -> bool {
        self.subscribe_pending.swap(false, Ordering::AcqRel)
    }
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkPort for LinkStatus {
    fn is_link_up(&self) -> bool {
        self.wifi_up() && self.broker_up()
    }
}

// ── Process-wide instances ───────────────────────────────────

pub static OUTBOUND: OutboundQueue = OutboundQueue::new();
pub static COMMANDS: CommandQueue = CommandQueue::new();
pub static INBOUND: InboundQueue = InboundQueue::new();
pub static LINK: LinkStatus = LinkStatus::new();

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::{FireAlertData, StatusData};
    use crate::drivers::buzzer::AlertMode;
    use crate::state::DetectionState;

    fn heartbeat(uptime_ms: u64) -> OutboundEvent {
        OutboundEvent::Heartbeat(StatusData { uptime_ms, mode: AlertMode::Off, override_active: false })
    }

    fn alert(alert_id: u32) -> OutboundEvent {
        OutboundEvent::FireAlert(FireAlertData { alert_id, timestamp_ms: 0, detection: DetectionState::new() })
    }

    #[test]
    fn alerts_drain_before_telemetry() {
        let q = OutboundQueue::new();
        assert!(q.push(heartbeat(1)));
        assert!(q.push(alert(1)));
        assert_eq!(q.try_next(), Some(alert(1)));
        assert_eq!(q.try_next(), Some(heartbeat(1)));
        assert_eq!(q.try_next(), None);
    }

    #[test]
    fn full_lane_drops_new_and_counts() {
        let q = OutboundQueue::new();
        for i in 0..TELEMETRY_QUEUE_DEPTH as u64 {
            assert!(q.push(heartbeat(i)));
        }
        assert!(!q.push(heartbeat(99)));
        assert_eq!(q.dropped(), 1);
        // The alert lane is unaffected.
        assert!(q.push(alert(7)));
        assert_eq!(q.try_next(), Some(alert(7)));
        assert_eq!(q.try_next(), Some(heartbeat(0)), "oldest retained");
    }

    #[test]
    fn inbound_queue_holds_ten() {
        let q = InboundQueue::new();
        let msg = RemoteCommand::new("fire_system/control", br#"{"command":"buzzer_on"}"#).unwrap();
        for _ in 0..INBOUND_QUEUE_DEPTH {
            assert!(q.push(msg.clone()));
        }
        assert!(!q.push(msg.clone()));
        assert_eq!(q.receive_timeout(Duration::from_millis(1)), Some(msg));
    }

    #[test]
    fn empty_receive_waits_out_its_bound() {
        let q = InboundQueue::new();
        let started = std::time::Instant::now();
        assert_eq!(q.receive_timeout(Duration::from_millis(30)), None);
        assert!(started.elapsed() >= Duration::from_millis(25), "returned before the bound");

        let out = OutboundQueue::new();
        assert_eq!(out.next_timeout(Duration::from_millis(5)), None);
    }

    #[test]
    fn receive_wakes_on_message_before_deadline() {
        static Q: InboundQueue = InboundQueue::new();
        let sender = std::thread::spawn(|| {
            std::thread::sleep(Duration::from_millis(20));
            Q.push(RemoteCommand::new("fire_system/control", br#"{"command":"test_alarm"}"#).unwrap())
        });
        let started = std::time::Instant::now();
        let got = Q.receive_timeout(Duration::from_secs(5));
        assert!(sender.join().unwrap());
        assert!(got.is_some());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn link_requires_wifi_and_broker() {
        let link = LinkStatus::new();
        assert!(!link.is_link_up());
        link.set_wifi(true);
        assert!(!link.is_link_up());
        link.set_broker(true);
        assert!(link.is_link_up());
        assert!(link.take_subscribe_request());
        assert!(!link.take_subscribe_request());
    }
}
