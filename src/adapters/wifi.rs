//! Wi-Fi station link manager.
//!
//! Brings the station up with a bounded number of attempts and keeps the
//! shared [`LinkStatus`] flag current.  Nothing in the detection path waits
//! on this adapter: the gateway only reads the flag.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` over `EspWifi`.
//! - **all other targets**: a scripted simulation for host-side tests.
//!
//! ## Retry policy
//!
//! Up to [`MAX_CONNECT_ATTEMPTS`] per `connect`, waiting an exponential
//! backoff (base → 2× → 4× … capped at [`MAX_BACKOFF`]) between attempts.
//! A dropped link is retried by the next [`WifiLink::poll`].

use core::time::Duration;

use log::{error, info, warn};

use crate::config::NetworkCredentials;
use crate::error::CommsError;
use crate::gateway::channels::LinkStatus;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

pub const MAX_CONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    /// Last `connect` exhausted its attempts; `poll` will try again.
    Failed,
}

/// Delay before retry number `attempt` (1-based).
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

pub struct WifiLink {
    state: WifiState,
    retry_delay: Duration,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: attempts that fail before one succeeds.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_up: bool,
}

impl WifiLink {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self { state: WifiState::Disconnected, retry_delay: DEFAULT_RETRY_DELAY, wifi }
    }

    /// Simulated station whose first `failures` attempts are refused.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated(failures: u32) -> Self {
        Self {
            state: WifiState::Disconnected,
            retry_delay: DEFAULT_RETRY_DELAY,
            sim_failures: failures,
            sim_up: false,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Connect with bounded retries and publish the result to `link`.
    pub fn connect(&mut self, creds: &NetworkCredentials, link: &LinkStatus) -> Result<(), CommsError> {
        info!("WiFi: connecting to '{}'", creds.wifi_ssid);
        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            match self.platform_connect(creds) {
                Ok(()) => {
                    self.state = WifiState::Connected;
                    link.set_wifi(true);
                    info!("WiFi: connected (attempt {})", attempt);
                    return Ok(());
                }
                Err(e) if attempt < MAX_CONNECT_ATTEMPTS => {
                    let wait = backoff(self.retry_delay, attempt);
                    warn!("WiFi: attempt {} failed ({}), retrying in {:?}", attempt, e, wait);
                    std::thread::sleep(wait);
                }
                Err(e) => {
                    error!("WiFi: giving up after {} attempts: {}", attempt, e);
                }
            }
        }
        self.state = WifiState::Failed;
        link.set_wifi(false);
        Err(CommsError::WifiConnectFailed)
    }

    /// Refresh the link flag; reconnect if the station dropped or never came up.
    pub fn poll(&mut self, creds: &NetworkCredentials, link: &LinkStatus) {
        let up = self.platform_is_connected();
        link.set_wifi(up);
        if up {
            return;
        }
        if self.state == WifiState::Connected {
            warn!("WiFi: connection lost");
            self.state = WifiState::Disconnected;
        }
        // Failure is already logged and flagged.
        let _ = self.connect(creds, link);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, creds: &NetworkCredentials) -> Result<(), CommsError> {
        let auth_method = if creds.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: creds.wifi_ssid.try_into().map_err(|_| CommsError::WifiConnectFailed)?,
            password: creds
                .wifi_password
                .try_into()
                .map_err(|_| CommsError::WifiConnectFailed)?,
            auth_method,
            ..Default::default()
        });

        let esp = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi: driver error {}", e);
            CommsError::WifiConnectFailed
        };
        self.wifi.set_configuration(&config).map_err(esp)?;
        if !self.wifi.is_started().map_err(esp)? {
            self.wifi.start().map_err(esp)?;
            info!("WiFi: started");
        }
        self.wifi.connect().map_err(esp)?;
        self.wifi.wait_netif_up().map_err(esp)?;
        info!("WiFi: netif up");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, _creds: &NetworkCredentials) -> Result<(), CommsError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            return Err(CommsError::WifiConnectFailed);
        }
        self.sim_up = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_up
    }

    /// Simulation: drop the station as if the AP vanished.  The next
    /// `sim_failures` reconnect attempts are refused.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop(&mut self, failures: u32) {
        self.sim_up = false;
        self.sim_failures = failures;
    }
}
