//! Periodic read-and-fuse cycle.

use log::{debug, warn};

use crate::app::ports::PeripheralPort;
use crate::config::SystemConfig;
use crate::fusion::detect_fire;
use crate::state::DetectionState;

use super::{SensorKind, SensorReading};

/// Samples every channel and recomputes the fire decision.
///
/// Holds only the thresholds and full scale; the readings themselves live
/// in the [`DetectionState`] the caller passes in, so the reader can be
/// driven against the shared cell or a test fixture alike.
pub struct SensorReader {
    thresholds: [f32; 4],
    full_scale: u16,
}

impl SensorReader {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            thresholds: SensorKind::ALL.map(|k| config.threshold(k)),
            full_scale: config.adc_full_scale,
        }
    }

    /// Read all four channels into `state`, then fuse.
    ///
    /// A failed channel keeps its previous reading.  `state` is a private
    /// copy; the caller commits it to the shared cell in one step.
    pub fn sample_all(
        &self,
        port: &mut impl PeripheralPort,
        now_ms: u64,
        state: &mut DetectionState,
    ) {
        for kind in SensorKind::ALL {
            match port.read_channel(kind) {
                Ok(raw) => {
                    state.readings[kind.index()] = SensorReading::from_raw(
                        kind,
                        raw,
                        self.full_scale,
                        self.thresholds[kind.index()],
                        now_ms,
                    );
                }
                Err(e) => {
                    warn!(
                        "Sensor {}: {}, holding last value {:.2}",
                        kind.name(),
                        e,
                        state.readings[kind.index()].normalized
                    );
                }
            }
        }

        let fire = detect_fire(&state.readings);
        state.detected_at_ms = match (fire, state.fire_detected) {
            (true, false) => Some(now_ms),
            (true, true) => state.detected_at_ms.or(Some(now_ms)),
            (false, _) => None,
        };
        state.fire_detected = fire;

        debug!(
            "Sensors: smoke={:.2} temp={:.2} flame={:.2} gas={:.2} fire={}",
            state.readings[0].normalized,
            state.readings[1].normalized,
            state.readings[2].normalized,
            state.readings[3].normalized,
            fire
        );
    }
}
