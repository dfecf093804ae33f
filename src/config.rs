//! System configuration parameters
//!
//! All tunable parameters for the FireSentry controller.  Defaults match the
//! field-tested timing of the detector; a JSON override document can be
//! baked in at build time and is validated before use.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::sensors::SensorKind;

/// Outbound topic for periodic sensor telemetry.
pub const TOPIC_SENSOR_DATA: &str = "fire_system/sensor/data";
/// Outbound topic for fire alerts (retained).
pub const TOPIC_ALERT: &str = "fire_system/alert";
/// Outbound topic for the online/offline heartbeat.
pub const TOPIC_STATUS: &str = "fire_system/status";
/// Inbound topic for remote control commands.
pub const TOPIC_CONTROL: &str = "fire_system/control";

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Thresholds (normalized 0.0-1.0) ---
    pub smoke_threshold: f32,
    pub temperature_threshold: f32,
    pub flame_threshold: f32,
    pub gas_threshold: f32,

    // --- Sampling ---
    /// ADC full-scale raw value (12-bit ADC = 4095)
    pub adc_full_scale: u16,

    // --- Timing ---
    /// Sensor read-and-fuse period (milliseconds)
    pub sensor_period_ms: u32,
    /// Alert state machine evaluation period (milliseconds)
    pub alert_period_ms: u32,
    /// Sensor telemetry publish period (milliseconds)
    pub telemetry_period_ms: u32,
    /// Status heartbeat publish period (milliseconds)
    pub heartbeat_period_ms: u32,
    /// Console status line period (milliseconds)
    pub status_log_period_ms: u32,
    /// Bounded wait for an inbound command (milliseconds)
    pub inbound_timeout_ms: u32,
    /// Buzzer poll interval while silent (milliseconds)
    pub actuator_idle_poll_ms: u32,
    /// Duration of a remote `test_alarm` before auto-revert (milliseconds)
    pub test_alarm_duration_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Thresholds
            smoke_threshold: 0.7,
            temperature_threshold: 0.8,
            flame_threshold: 0.6,
            gas_threshold: 0.7,

            // Sampling
            adc_full_scale: 4095,

            // Timing
            sensor_period_ms: 500,
            alert_period_ms: 100,
            telemetry_period_ms: 5000,
            heartbeat_period_ms: 5000,
            status_log_period_ms: 30_000,
            inbound_timeout_ms: 1000,
            actuator_idle_poll_ms: 100,
            test_alarm_duration_ms: 3000,
        }
    }
}

impl SystemConfig {
    /// Trigger threshold for one sensor kind.
    pub fn threshold(&self, kind: SensorKind) -> f32 {
        match kind {
            SensorKind::Smoke => self.smoke_threshold,
            SensorKind::Temperature => self.temperature_threshold,
            SensorKind::InfraredFlame => self.flame_threshold,
            SensorKind::Gas => self.gas_threshold,
        }
    }

    /// Configuration baked in at build time: the JSON document in
    /// `FIRESENTRY_CONFIG` if set, otherwise the defaults.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::with_override(option_env!("FIRESENTRY_CONFIG"))
    }

    pub fn with_override(doc: Option<&str>) -> Result<Self, ConfigError> {
        match doc {
            Some(doc) => Self::from_json(doc),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse and validate a JSON override document.  Missing fields take
    /// their default values.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(doc).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would disable detection or stall a worker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in SensorKind::ALL {
            let t = self.threshold(kind);
            if !(t > 0.0 && t <= 1.0) {
                return Err(ConfigError::ValidationFailed("threshold must be in (0, 1]"));
            }
        }
        if self.adc_full_scale == 0 {
            return Err(ConfigError::ValidationFailed("adc_full_scale must be > 0"));
        }
        let periods = [
            self.sensor_period_ms,
            self.alert_period_ms,
            self.telemetry_period_ms,
            self.heartbeat_period_ms,
            self.status_log_period_ms,
            self.inbound_timeout_ms,
            self.actuator_idle_poll_ms,
            self.test_alarm_duration_ms,
        ];
        if periods.contains(&0) {
            return Err(ConfigError::ValidationFailed("periods must be > 0"));
        }
        Ok(())
    }
}

/// Errors from loading or validating a [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Override document failed to deserialize.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Corrupted => Self::Config("override document corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Network credentials (baked in at build time)
// ---------------------------------------------------------------------------

/// Wi-Fi and broker settings.  Read from `FIRESENTRY_*` environment
/// variables at compile time; unset values fall back to the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkCredentials {
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    pub broker_uri: &'static str,
    pub broker_user: Option<&'static str>,
    pub broker_password: Option<&'static str>,
    /// PEM CA certificate pinned for an `mqtts://` broker.  Without one the
    /// ESP-IDF certificate bundle is used.
    pub broker_ca_pem: Option<&'static str>,
    pub client_id: &'static str,
}

pub const DEFAULT_BROKER_URI: &str = "mqtt://192.168.1.100:1883";
pub const DEFAULT_CLIENT_ID: &str = "firesentry";
/// Broker keep-alive interval (seconds).
pub const BROKER_KEEP_ALIVE_SECS: u64 = 60;

impl NetworkCredentials {
    pub const fn from_build_env() -> Self {
        Self {
            wifi_ssid: match option_env!("FIRESENTRY_WIFI_SSID") {
                Some(s) => s,
                None => "",
            },
            wifi_password: match option_env!("FIRESENTRY_WIFI_PASS") {
                Some(s) => s,
                None => "",
            },
            broker_uri: match option_env!("FIRESENTRY_MQTT_URI") {
                Some(s) => s,
                None => DEFAULT_BROKER_URI,
            },
            broker_user: option_env!("FIRESENTRY_MQTT_USER"),
            broker_password: option_env!("FIRESENTRY_MQTT_PASS"),
            broker_ca_pem: option_env!("FIRESENTRY_MQTT_CA"),
            client_id: match option_env!("FIRESENTRY_CLIENT_ID") {
                Some(s) => s,
                None => DEFAULT_CLIENT_ID,
            },
        }
    }

    pub fn uses_tls(&self) -> bool {
        self.broker_uri.starts_with("mqtts://")
    }

    /// SSID must be 1-32 bytes; a WPA2 password 8-64 bytes or empty (open).
    /// A pinned CA only makes sense on a TLS broker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi_ssid.is_empty() || self.wifi_ssid.len() > 32 {
            return Err(ConfigError::ValidationFailed("wifi ssid must be 1-32 bytes"));
        }
        let pw = self.wifi_password.len();
        if pw != 0 && !(8..=64).contains(&pw) {
            return Err(ConfigError::ValidationFailed("wifi password must be 8-64 bytes"));
        }
        if !self.broker_uri.starts_with("mqtt://") && !self.broker_uri.starts_with("mqtts://") {
            return Err(ConfigError::ValidationFailed("broker uri must be mqtt:// or mqtts://"));
        }
        if let Some(pem) = self.broker_ca_pem {
            if !self.uses_tls() {
                return Err(ConfigError::ValidationFailed("broker ca requires an mqtts:// uri"));
            }
            if !pem.trim_start().starts_with("-----BEGIN CERTIFICATE-----") {
                return Err(ConfigError::ValidationFailed("broker ca must be a PEM certificate"));
            }
        }
        Ok(())
    }
}
