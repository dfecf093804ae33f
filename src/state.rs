//! Shared detection and session state.
//!
//! Every cross-worker value lives behind one of the cells below.  Access is
//! closure-scoped through an `embassy-sync` blocking mutex, so a lock can
//! never be held across a peripheral read or a publish; callers copy the
//! whole value out, work on the copy, and commit it back in one step.
//!
//! ```text
//!  sensor worker ──publish()──▶ SharedDetection ◀──snapshot()── alert / telemetry
//!  alert worker  ──publish()──▶ SharedSession   ◀──snapshot()── telemetry / status
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::fsm::context::AlertSession;
use crate::sensors::{SensorKind, SensorReading};

// ---------------------------------------------------------------------------
// DetectionState
// ---------------------------------------------------------------------------

/// The four latest readings plus the fused fire decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionState {
    /// Indexed by [`SensorKind::index`].
    pub readings: [SensorReading; 4],
    pub fire_detected: bool,
    /// Time of the rising edge that started the current detection.
    /// `None` whenever `fire_detected` is false.
    pub detected_at_ms: Option<u64>,
}

impl DetectionState {
    pub const fn new() -> Self {
        Self {
            readings: [
                SensorReading::idle(SensorKind::Smoke),
                SensorReading::idle(SensorKind::Temperature),
                SensorReading::idle(SensorKind::InfraredFlame),
                SensorReading::idle(SensorKind::Gas),
            ],
            fire_detected: false,
            detected_at_ms: None,
        }
    }

    pub fn reading(&self, kind: SensorKind) -> &SensorReading {
        &self.readings[kind.index()]
    }

    /// Normalized value of one channel.
    pub fn level(&self, kind: SensorKind) -> f32 {
        self.readings[kind.index()].normalized
    }
}

impl Default for DetectionState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Shared cells
// ---------------------------------------------------------------------------

/// Whole-snapshot cell for [`DetectionState`].  Single writer (the sensor
/// worker), any number of readers.
pub struct SharedDetection {
    inner: Mutex<CriticalSectionRawMutex, Cell<DetectionState>>,
}

impl SharedDetection {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(DetectionState::new())),
        }
    }

    /// Copy of the most recently committed state.
    pub fn snapshot(&self) -> DetectionState {
        self.inner.lock(Cell::get)
    }

    /// Replace the committed state in one step.
    pub fn publish(&self, state: DetectionState) {
        self.inner.lock(|cell| cell.set(state));
    }
}

impl Default for SharedDetection {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only mirror of the alert session for telemetry and status logging.
/// Written only by the alert worker after each evaluation.
pub struct SharedSession {
    inner: Mutex<CriticalSectionRawMutex, Cell<AlertSession>>,
}

impl SharedSession {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(AlertSession::new())),
        }
    }

    pub fn snapshot(&self) -> AlertSession {
        self.inner.lock(Cell::get)
    }

    pub fn publish(&self, session: AlertSession) {
        self.inner.lock(|cell| cell.set(session));
    }
}

impl Default for SharedSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide detection state.
pub static DETECTION: SharedDetection = SharedDetection::new();

/// Process-wide alert session mirror.
pub static SESSION: SharedSession = SharedSession::new();

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::buzzer::AlertMode;

    fn triggered_state(seq: u16) -> DetectionState {
        let mut s = DetectionState::new();
        for r in &mut s.readings {
            r.raw = seq;
            r.sampled_at_ms = u64::from(seq);
        }
        s.fire_detected = seq % 2 == 1;
        s.detected_at_ms = s.fire_detected.then_some(u64::from(seq));
        s
    }

    #[test]
    fn new_state_is_quiet() {
        let s = DetectionState::new();
        assert!(!s.fire_detected);
        assert!(s.detected_at_ms.is_none());
        assert_eq!(s.reading(SensorKind::Gas).kind, SensorKind::Gas);
    }

    #[test]
    fn publish_then_snapshot_returns_same_value() {
        let shared = SharedDetection::new();
        let s = triggered_state(3);
        shared.publish(s);
        assert_eq!(shared.snapshot(), s);
    }

    #[test]
    fn readers_never_see_mixed_snapshots() {
        let shared = SharedDetection::new();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for seq in 1..2000u16 {
                    shared.publish(triggered_state(seq));
                }
            });
            scope.spawn(|| {
                for _ in 0..2000 {
                    let snap = shared.snapshot();
                    let raw = snap.readings[0].raw;
                    assert!(snap.readings.iter().all(|r| r.raw == raw));
                    assert_eq!(snap.fire_detected, raw % 2 == 1);
                }
            });
        });
    }

    #[test]
    fn session_mirror_roundtrip() {
        let shared = SharedSession::new();
        let mut session = AlertSession::new();
        session.current_mode = AlertMode::Urgent;
        session.override_active = true;
        shared.publish(session);
        assert_eq!(shared.snapshot(), session);
    }
}
