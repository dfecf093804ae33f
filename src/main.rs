//! FireSentry Firmware: Main Entry Point
//!
//! Hexagonal core on pinned periodic workers.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorInputs      BuzzerOutput     MqttLink      WifiLink     │
//! │  (PeripheralPort)  (BuzzerPort)     (PublishPort) (LINK flags) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  SensorReader · fusion · AlertService · Gateway        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  sensor(24) alert(24) buzzer(23) publish(22) inbound(22)       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Detection workers start before the network, so a dead link never
//! delays the first alarm.
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::{Context, Result};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, info, warn};

use firesentry::adapters::hardware::{BuzzerOutput, SensorInputs};
use firesentry::adapters::mqtt::MqttLink;
use firesentry::adapters::time::Esp32TimeAdapter;
use firesentry::adapters::wifi::WifiLink;
use firesentry::app::ports::TimePort;
use firesentry::app::service::AlertService;
use firesentry::config::{NetworkCredentials, SystemConfig};
use firesentry::drivers::buzzer::{BUZZER, BeepRequest, BuzzerDriver};
use firesentry::drivers::hw_init;
use firesentry::drivers::task_pin::{Core, WorkerSpec, spawn_worker};
use firesentry::error::Error;
use firesentry::gateway::MessagingGateway;
use firesentry::gateway::channels::{COMMANDS, ChannelInbox, INBOUND, LINK, OUTBOUND};
use firesentry::sensors::SensorReader;
use firesentry::state::{DETECTION, DetectionState, SESSION};
use firesentry::workers::{self, Interval, PublishSchedule};

// ── Worker layout ─────────────────────────────────────────────

const SENSOR: WorkerSpec = WorkerSpec { name: "sensor\0", core: Core::App, priority: 24, stack_kb: 4 };
const ALERT: WorkerSpec = WorkerSpec { name: "alert\0", core: Core::App, priority: 24, stack_kb: 6 };
const BUZZ: WorkerSpec = WorkerSpec { name: "buzzer\0", core: Core::App, priority: 23, stack_kb: 3 };
const PUBLISH: WorkerSpec = WorkerSpec { name: "mqtt_pub\0", core: Core::Pro, priority: 22, stack_kb: 8 };
const INBOX: WorkerSpec = WorkerSpec { name: "mqtt_in\0", core: Core::Pro, priority: 22, stack_kb: 6 };

/// Upper bound on one publisher wait, so the telemetry schedule stays on time.
const PUBLISH_POLL: Duration = Duration::from_millis(100);
/// Delay between attempts to create the broker client.
const MQTT_RETRY_MS: u32 = 10_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  FireSentry v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::from_build_env().unwrap_or_else(|e| {
        error!("{}; using defaults", Error::from(e));
        SystemConfig::default()
    });

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(Error::from)?;

    // ── 3. Detection path (never waits on the network) ────────
    let cfg = config.clone();
    spawn_worker(SENSOR, move || {
        let clock = Esp32TimeAdapter::new();
        let reader = SensorReader::new(&cfg);
        let mut inputs = SensorInputs::new(cfg.adc_full_scale);
        let mut state = DetectionState::new();
        let mut tick = Interval::new(cfg.sensor_period_ms, clock.uptime_ms());
        loop {
            let now = tick.wait(&clock);
            workers::sensor_cycle(&reader, &mut inputs, &mut state, &DETECTION, now);
        }
    })
    .context("spawn sensor worker")?;

    let cfg = config.clone();
    spawn_worker(ALERT, move || {
        let clock = Esp32TimeAdapter::new();
        let mut service = AlertService::new(&cfg);
        service.start(&mut &BUZZER);
        let mut sink = &OUTBOUND;
        let mut tick = Interval::new(cfg.alert_period_ms, clock.uptime_ms());
        loop {
            let now = tick.wait(&clock);
            workers::alert_cycle(&mut service, &COMMANDS, &DETECTION, &SESSION, &BUZZER, &mut sink, now);
        }
    })
    .context("spawn alert worker")?;

    let idle_poll_ms = config.actuator_idle_poll_ms;
    spawn_worker(BUZZ, move || {
        BuzzerDriver::new(BuzzerOutput, FreeRtos, &BUZZER, idle_poll_ms).run();
    })
    .context("spawn buzzer worker")?;

    if !BUZZER.request_beep(BeepRequest::SELF_TEST) {
        warn!("Boot: self-test beep not queued");
    }

    // ── 4. Network (best effort) ──────────────────────────────
    let creds = NetworkCredentials::from_build_env();
    if let Err(e) = creds.validate() {
        warn!("Network credentials invalid ({}), link stays down", e);
    }

    let mut wifi = match start_wifi() {
        Ok(w) => Some(w),
        Err(e) => {
            error!("WiFi: driver unavailable ({:#}); detection continues offline", e);
            None
        }
    };
    if let Some(w) = wifi.as_mut() {
        if let Err(e) = w.connect(&creds, &LINK) {
            error!("WiFi: {}; detection continues offline", e);
        }
    }

    let cfg = config.clone();
    if let Err(e) = spawn_worker(PUBLISH, move || run_publisher(&cfg, &creds)) {
        error!("MQTT: publisher not started ({}); outbound events stay queued", e);
    }

    let inbound_timeout = Duration::from_millis(u64::from(config.inbound_timeout_ms));
    let inbox = spawn_worker(INBOX, move || {
        let mut gateway = MessagingGateway::new();
        let mut inbox = ChannelInbox(&INBOUND);
        loop {
            workers::inbound_cycle(&mut gateway, &mut inbox, &COMMANDS, inbound_timeout);
        }
    });
    if let Err(e) = inbox {
        error!("MQTT: inbound worker not started ({}); remote commands ignored", e);
    }

    info!("System ready.");

    // ── 5. Link supervision + status line (lowest priority) ───
    let clock = Esp32TimeAdapter::new();
    let now = clock.uptime_ms();
    let mut link_check = Interval::new(config.heartbeat_period_ms, now);
    let mut status = Interval::new(config.status_log_period_ms, now);
    loop {
        let now = link_check.wait(&clock);
        if let Some(w) = wifi.as_mut() {
            w.poll(&creds, &LINK);
        }
        if status.due(now) {
            workers::status_cycle(&LINK, &DETECTION, &SESSION);
        }
    }
}

fn start_wifi() -> Result<WifiLink> {
    let peripherals = Peripherals::take().context("take peripherals")?;
    let sysloop = EspSystemEventLoop::take().context("system event loop")?;
    let nvs = EspDefaultNvsPartition::take().context("nvs partition")?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs)).context("wifi driver")?;
    Ok(WifiLink::new(BlockingWifi::wrap(esp_wifi, sysloop).context("wifi wrap")?))
}

fn connect_broker(creds: &NetworkCredentials) -> Option<MqttLink> {
    MqttLink::connect(creds, &LINK, &INBOUND)
        .inspect_err(|e| error!("MQTT: {}; retrying in {} ms", e, MQTT_RETRY_MS))
        .ok()
}

/// Publisher worker.  Owns the broker client and keeps draining the
/// outbound queue even while no client exists, so events are dropped
/// rather than left to fill the queue.
fn run_publisher(cfg: &SystemConfig, creds: &NetworkCredentials) -> ! {
    let clock = Esp32TimeAdapter::new();
    let mut gateway = MessagingGateway::new();
    let now = clock.uptime_ms();
    let mut schedule = PublishSchedule {
        telemetry: Interval::new(cfg.telemetry_period_ms, now),
        heartbeat: Interval::new(cfg.heartbeat_period_ms, now),
    };
    let mut retry = Interval::new(MQTT_RETRY_MS, now);
    let mut mqtt = connect_broker(creds);
    loop {
        let now = clock.uptime_ms();
        if mqtt.is_none() && retry.due(now) {
            mqtt = connect_broker(creds);
        }
        if let Some(m) = mqtt.as_mut() {
            // Failures are logged and retried next cycle.
            let _ = m.ensure_subscribed(&LINK);
        }
        workers::publish_cycle(
            &mut gateway,
            &mut schedule,
            &DETECTION,
            &SESSION,
            &OUTBOUND,
            &LINK,
            &mut mqtt,
            now,
            PUBLISH_POLL,
        );
    }
}
