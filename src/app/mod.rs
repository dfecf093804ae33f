//! Application core: alerting rules with zero direct I/O.
//!
//! The [`service::AlertService`] owns the alert state machine and talks to
//! the buzzer and the messaging gateway only through the **port traits** in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
