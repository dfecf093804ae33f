//! Sensor subsystem: channel identities, normalized readings, and the
//! periodic [`SensorReader`] that produces a fused [`DetectionState`].
//!
//! ```text
//!  PeripheralPort ──raw──▶ normalize ──▶ SensorReading ×4 ──▶ detect_fire
//!                                                    │
//!                                                    ▼
//!                                         DetectionState (one commit)
//! ```
//!
//! [`DetectionState`]: crate::state::DetectionState

pub mod reader;

pub use reader::SensorReader;

// ---------------------------------------------------------------------------
// Channel identity
// ---------------------------------------------------------------------------

/// The four physical channels on the detector board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SensorKind {
    Smoke = 0,
    Temperature = 1,
    InfraredFlame = 2,
    Gas = 3,
}

impl SensorKind {
    /// Every channel, in snapshot order.
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Smoke,
        SensorKind::Temperature,
        SensorKind::InfraredFlame,
        SensorKind::Gas,
    ];

    /// Slot of this channel inside a `[SensorReading; 4]` snapshot.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Temperature => "temperature",
            Self::InfraredFlame => "ir_flame",
            Self::Gas => "gas",
        }
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One normalized sample from one channel.
///
/// `normalized` is always within `[0.0, 1.0]`; `triggered` is
/// `normalized >= threshold(kind)` at the time of sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub kind: SensorKind,
    pub raw: u16,
    pub normalized: f32,
    pub triggered: bool,
    /// Monotonic milliseconds since boot.
    pub sampled_at_ms: u64,
}

impl SensorReading {
    /// Zeroed, untriggered reading used before the first sample.
    pub const fn idle(kind: SensorKind) -> Self {
        Self {
            kind,
            raw: 0,
            normalized: 0.0,
            triggered: false,
            sampled_at_ms: 0,
        }
    }

    /// Build a reading from a raw value, clamping into `[0, 1]`.
    pub fn from_raw(kind: SensorKind, raw: u16, full_scale: u16, threshold: f32, now_ms: u64) -> Self {
        let normalized = normalize(raw, full_scale);
        Self {
            kind,
            raw,
            normalized,
            triggered: normalized >= threshold,
            sampled_at_ms: now_ms,
        }
    }
}

/// `raw / full_scale`, clamped.  A zero full scale yields 0.0.
pub fn normalize(raw: u16, full_scale: u16) -> f32 {
    if full_scale == 0 {
        return 0.0;
    }
    (raw as f32 / full_scale as f32).clamp(0.0, 1.0)
}

/// Snapshot of all four channels in [`SensorKind::ALL`] order.
pub fn idle_readings() -> [SensorReading; 4] {
    SensorKind::ALL.map(SensorReading::idle)
}
