//! Periodic worker bodies.
//!
//! Each `*_cycle` function is one iteration of a worker thread spawned by
//! `main`.  They take their collaborators explicitly so the same bodies run
//! against the process statics on target and against local fixtures in
//! tests.
//!
//! ```text
//!  sensor  (500 ms) ── sample + fuse ──▶ DETECTION
//!  alert   (100 ms) ── COMMANDS, DETECTION ──▶ AlertService ──▶ BUZZER, OUTBOUND, SESSION
//!  inbound (≤1 s)   ── INBOUND ──▶ MessagingGateway ──▶ COMMANDS
//!  publish (≤100 ms)── telemetry/heartbeat schedule, OUTBOUND ──▶ broker
//!  status  (30 s)   ── one log line
//! ```

use core::time::Duration;

use log::{debug, info};

use crate::app::commands::AlertCommand;
use crate::app::events::{OutboundEvent, StatusData, TelemetryData};
use crate::app::ports::{EventSink, InboxPort, LinkPort, MessageId, PeripheralPort, PublishPort, TimePort};
use crate::app::service::AlertService;
use crate::drivers::buzzer::{AlertMode, BeepOutcome, BeepRequest, BuzzerControl};
use crate::error::{CommandError, CommsError};
use crate::gateway::MessagingGateway;
use crate::gateway::channels::{CommandQueue, LinkStatus, OutboundQueue};
use crate::sensors::SensorReader;
use crate::state::{DetectionState, SharedDetection, SharedSession};

// ── Scheduling ───────────────────────────────────────────────

/// Drift-free fixed-rate schedule.  Missed periods are skipped, not
/// replayed in a burst.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period_ms: u64,
    next_ms: u64,
}

impl Interval {
    /// First deadline is one period after `now_ms`.
    pub fn new(period_ms: u32, now_ms: u64) -> Self {
        let period_ms = u64::from(period_ms.max(1));
        Self { period_ms, next_ms: now_ms + period_ms }
    }

    /// `true` at most once per period; advances the deadline when it fires.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_ms {
            return false;
        }
        self.next_ms += self.period_ms;
        if self.next_ms <= now_ms {
            self.next_ms = now_ms + self.period_ms;
        }
        true
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.next_ms.saturating_sub(now_ms)
    }

    /// Sleep until the next deadline and return the time it fired at.
    pub fn wait(&mut self, clock: &impl TimePort) -> u64 {
        loop {
            let now = clock.uptime_ms();
            if self.due(now) {
                return now;
            }
            std::thread::sleep(Duration::from_millis(self.remaining_ms(now)));
        }
    }
}

// ── Sensor worker ────────────────────────────────────────────

/// Sample, fuse, and commit one detection snapshot.  `state` is the
/// worker's private working copy.
pub fn sensor_cycle(
    reader: &SensorReader,
    port: &mut impl PeripheralPort,
    state: &mut DetectionState,
    shared: &SharedDetection,
    now_ms: u64,
) {
    reader.sample_all(port, now_ms, state);
    shared.publish(*state);
}

// ── Alert worker ─────────────────────────────────────────────

/// Collect beep outcomes, apply queued commands, then evaluate the latest
/// detection snapshot.
pub fn alert_cycle(
    service: &mut AlertService,
    commands: &CommandQueue,
    detection: &SharedDetection,
    session: &SharedSession,
    buzzer: &BuzzerControl,
    sink: &mut impl EventSink,
    now_ms: u64,
) {
    let mut actuator = buzzer;
    while let Some(outcome) = buzzer.take_outcome() {
        match outcome {
            BeepOutcome::Completed => debug!("Alert: beep pattern completed"),
            BeepOutcome::Cancelled => info!("Alert: beep pattern cancelled by active mode"),
        }
    }
    while let Some(cmd) = commands.try_next() {
        let before = service.mode();
        service.handle_command(cmd, now_ms, &mut actuator, sink);
        if silences(cmd) && before != AlertMode::Off && service.mode() == AlertMode::Off {
            // Chirp once the waveform loop has gone quiet.
            if !buzzer.request_beep(BeepRequest::ACK) {
                debug!("Alert: ack beep dropped, queue full");
            }
        }
    }

    service.evaluate(detection.snapshot(), now_ms, &mut actuator, sink);
    session.publish(service.session());
}

const fn silences(cmd: AlertCommand) -> bool {
    matches!(cmd, AlertCommand::BuzzerOff | AlertCommand::SetMode(AlertMode::Off))
}

// ── Telemetry ────────────────────────────────────────────────

pub fn telemetry_cycle(detection: &SharedDetection, sink: &mut impl EventSink, now_ms: u64) {
    let snapshot = detection.snapshot();
    sink.emit(OutboundEvent::SensorSnapshot(TelemetryData::from_detection(&snapshot, now_ms)));
}

pub fn heartbeat_cycle(session: &SharedSession, sink: &mut impl EventSink, now_ms: u64) {
    let s = session.snapshot();
    sink.emit(OutboundEvent::Heartbeat(StatusData {
        uptime_ms: now_ms,
        mode: s.current_mode,
        override_active: s.override_active,
    }));
}

// ── Messaging ────────────────────────────────────────────────

/// Wait up to `timeout` for one inbound message and route it.
pub fn inbound_cycle(
    gateway: &mut MessagingGateway,
    inbox: &mut impl InboxPort,
    commands: &CommandQueue,
    timeout: Duration,
) -> Option<Result<AlertCommand, CommandError>> {
    gateway.poll_inbound(inbox, commands, timeout)
}

/// Outbound schedule for the publisher thread.
pub struct PublishSchedule {
    pub telemetry: Interval,
    pub heartbeat: Interval,
}

/// Queue any due periodic events, then publish at most one queued event.
#[allow(clippy::too_many_arguments)]
pub fn publish_cycle(
    gateway: &mut MessagingGateway,
    schedule: &mut PublishSchedule,
    detection: &SharedDetection,
    session: &SharedSession,
    queue: &OutboundQueue,
    link: &impl LinkPort,
    client: &mut impl PublishPort,
    now_ms: u64,
    timeout: Duration,
) -> Option<Result<MessageId, CommsError>> {
    let mut sink = queue;
    if schedule.telemetry.due(now_ms) {
        telemetry_cycle(detection, &mut sink, now_ms);
    }
    if schedule.heartbeat.due(now_ms) {
        heartbeat_cycle(session, &mut sink, now_ms);
    }
    gateway.poll_outbound(queue, link, client, timeout)
}

// ── Status ───────────────────────────────────────────────────

/// One-line health report.
pub fn status_line(link: &LinkStatus, detection: &SharedDetection, session: &SharedSession) -> String {
    let d = detection.snapshot();
    let s = session.snapshot();
    format!(
        "Status: wifi={} broker={} fire={} mode={}{}",
        if link.wifi_up() { "up" } else { "down" },
        if link.broker_up() { "up" } else { "down" },
        if d.fire_detected { "YES" } else { "no" },
        s.current_mode.name(),
        if s.override_active { " (override)" } else { "" },
    )
}

pub fn status_cycle(link: &LinkStatus, detection: &SharedDetection, session: &SharedSession) {
    info!("{}", status_line(link, detection, session));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use crate::error::SensorError;
    use crate::sensors::SensorKind;

    struct Levels([u16; 4]);
    impl PeripheralPort for Levels {
        fn read_channel(&mut self, kind: SensorKind) -> Result<u16, SensorError> {
            Ok(self.0[kind.index()])
        }
    }

    #[test]
    fn interval_fires_once_per_period_and_skips_missed() {
        let mut iv = Interval::new(100, 0);
        assert!(!iv.due(99));
        assert!(iv.due(100));
        assert!(!iv.due(150));
        assert!(iv.due(200));
        // Stalled for several periods: fires once, then realigns.
        assert!(iv.due(750));
        assert!(!iv.due(800));
        assert!(iv.due(850));
        assert_eq!(iv.remaining_ms(860), 90);
    }

    #[test]
    fn sensor_cycle_commits_snapshot() {
        let shared = SharedDetection::new();
        let reader = SensorReader::new(&SystemConfig::default());
        let mut state = DetectionState::new();
        // Smoke and gas over threshold, flame clear.
        let mut port = Levels([4000, 100, 0, 3500]);
        sensor_cycle(&reader, &mut port, &mut state, &shared, 500);
        let committed = shared.snapshot();
        assert!(committed.fire_detected);
        assert_eq!(committed.detected_at_ms, Some(500));
    }

    #[test]
    fn buzzer_off_during_alarm_requests_ack_chirp() {
        let config = SystemConfig::default();
        let mut svc = AlertService::new(&config);
        let buzzer = BuzzerControl::new();
        let commands = CommandQueue::new();
        let detection = SharedDetection::new();
        let session = SharedSession::new();
        let queue = OutboundQueue::new();
        let mut sink = &queue;
        svc.start(&mut &buzzer);

        commands.push(AlertCommand::TestAlarm);
        alert_cycle(&mut svc, &commands, &detection, &session, &buzzer, &mut sink, 0);
        assert_eq!(buzzer.mode(), AlertMode::Alarm);
        assert!(session.snapshot().override_active);

        commands.push(AlertCommand::BuzzerOff);
        alert_cycle(&mut svc, &commands, &detection, &session, &buzzer, &mut sink, 500);
        assert_eq!(buzzer.mode(), AlertMode::Off);
        // The ack holds one of the two beep slots.
        assert!(buzzer.request_beep(BeepRequest::ACK));
        assert!(!buzzer.request_beep(BeepRequest::ACK));
    }

    struct Mute;
    impl crate::app::ports::BuzzerPort for Mute {
        fn set_waveform(&mut self, _: u32, _: u8) -> Result<(), crate::error::ActuatorError> {
            Ok(())
        }
        fn waveform_off(&mut self) {}
    }

    struct NoDelay;
    impl embedded_hal::delay::DelayNs for NoDelay {
        fn delay_ns(&mut self, _: u32) {}
    }

    #[test]
    fn alert_cycle_drains_beep_outcomes() {
        let mut svc = AlertService::new(&SystemConfig::default());
        let buzzer = BuzzerControl::new();
        let commands = CommandQueue::new();
        let detection = SharedDetection::new();
        let session = SharedSession::new();
        let queue = OutboundQueue::new();
        let mut sink = &queue;
        svc.start(&mut &buzzer);

        // Beeps queued during an alarm are reported cancelled.
        buzzer.set_mode(AlertMode::Alarm);
        let mut driver = crate::drivers::buzzer::BuzzerDriver::new(Mute, NoDelay, &buzzer, 100);
        for _ in 0..2 {
            assert!(buzzer.request_beep(BeepRequest::ACK));
            driver.run_cycle();
        }

        alert_cycle(&mut svc, &commands, &detection, &session, &buzzer, &mut sink, 0);
        assert_eq!(buzzer.take_outcome(), None, "outcomes consumed");

        // Room again for the next report.
        assert!(buzzer.request_beep(BeepRequest::ACK));
        driver.run_cycle();
        assert_eq!(buzzer.take_outcome(), Some(BeepOutcome::Cancelled));
    }

    #[test]
    fn status_line_reports_flags() {
        let link = LinkStatus::new();
        link.set_wifi(true);
        let line = status_line(&link, &SharedDetection::new(), &SharedSession::new());
        assert_eq!(line, "Status: wifi=up broker=down fire=no mode=off");
    }
}
