//! ESP32 time adapter.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses a process-wide
//!   `std::time::Instant` so every worker shares one epoch.

use crate::app::ports::TimePort;

/// Milliseconds since boot.
#[cfg(target_os = "espidf")]
pub fn monotonic_ms() -> u64 {
    // SAFETY: read-only access to the free-running system timer.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
}

/// Milliseconds since first use.
#[cfg(not(target_os = "espidf"))]
pub fn monotonic_ms() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static BOOT: OnceLock<Instant> = OnceLock::new();
    BOOT.get_or_init(Instant::now).elapsed().as_millis() as u64
}

/// [`TimePort`] over the system timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Esp32TimeAdapter;

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Seconds since boot.
    pub fn uptime_secs(&self) -> u64 {
        monotonic_ms() / 1_000
    }
}

impl TimePort for Esp32TimeAdapter {
    fn uptime_ms(&self) -> u64 {
        monotonic_ms()
    }
}
