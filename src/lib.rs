//! FireSentry firmware library.
//!
//! Exposes the detection core (sampling, fusion, alert state machine,
//! messaging gateway) for integration testing and host simulation. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod fusion;
pub mod gateway;
pub mod pins;
pub mod sensors;
pub mod state;
pub mod workers;

#[cfg(target_os = "espidf")]
mod esp_link_shims;

// Host time driver behind the bounded channel waits.
#[cfg(all(test, not(target_os = "espidf")))]
use embassy_time as _;
