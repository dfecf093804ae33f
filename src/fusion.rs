//! Fire decision from the four latest readings.
//!
//! The infrared flame channel has override authority.  Without it, at least
//! two of the three indirect channels (smoke, temperature, gas) must agree.

use crate::sensors::{SensorKind, SensorReading};

/// Number of indirect channels that must be triggered to declare a fire.
pub const INDIRECT_VOTES_REQUIRED: usize = 2;

const INDIRECT: [SensorKind; 3] = [SensorKind::Smoke, SensorKind::Temperature, SensorKind::Gas];

/// Pure fusion rule.  Reads `triggered` only; the caller commits the result.
pub fn detect_fire(readings: &[SensorReading; 4]) -> bool {
    if readings[SensorKind::InfraredFlame.index()].triggered {
        return true;
    }
    let votes = INDIRECT
        .iter()
        .filter(|kind| readings[kind.index()].triggered)
        .count();
    votes >= INDIRECT_VOTES_REQUIRED
}
