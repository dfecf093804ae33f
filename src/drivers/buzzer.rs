//! Piezo buzzer: alert modes, waveform profiles, and the waveform loop.
//!
//! ```text
//!   AlertService ──set_mode()──▶ BuzzerControl.mode (AtomicU8)
//!   Gateway ──request_beep()──▶ BuzzerControl.beeps ──┐
//!                                                     ▼
//!                         BuzzerDriver::run_cycle() (own thread)
//!                           mode != Off : tone on_ms, silence off_ms
//!                           mode == Off : play queued beep, else idle poll
//!                                                     │
//!                       BuzzerControl.outcomes ◀──────┘ Completed / Cancelled
//!                                 │
//!                                 ▼ drained and logged by the alert worker
//! ```
//!
//! The mode is a single byte, so one atomic load yields a consistent
//! frequency/duty/timing tuple through [`AlertMode::profile`].

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{ActuatorPort, BuzzerPort};
use crate::error::CommandError;

// ---------------------------------------------------------------------------
// Alert modes and profiles
// ---------------------------------------------------------------------------

/// Discrete alert intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AlertMode {
    #[default]
    Off = 0,
    Normal = 1,
    Urgent = 2,
    Alarm = 3,
}

/// One mode's tone and cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformProfile {
    pub frequency_hz: u32,
    pub duty_percent: u8,
    pub on_ms: u32,
    pub off_ms: u32,
}

impl AlertMode {
    pub const ALL: [AlertMode; 4] = [Self::Off, Self::Normal, Self::Urgent, Self::Alarm];

    /// Static profile table.  Exhaustive, so a new variant cannot compile
    /// without an entry.
    pub const fn profile(self) -> WaveformProfile {
        match self {
            Self::Off => WaveformProfile { frequency_hz: 0, duty_percent: 0, on_ms: 0, off_ms: 0 },
            Self::Normal => WaveformProfile { frequency_hz: 1000, duty_percent: 50, on_ms: 200, off_ms: 300 },
            Self::Urgent => WaveformProfile { frequency_hz: 2000, duty_percent: 70, on_ms: 150, off_ms: 150 },
            Self::Alarm => WaveformProfile { frequency_hz: 3000, duty_percent: 80, on_ms: 100, off_ms: 50 },
        }
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Off),
            1 => Some(Self::Normal),
            2 => Some(Self::Urgent),
            3 => Some(Self::Alarm),
            _ => None,
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name().eq_ignore_ascii_case(name))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Alarm => "alarm",
        }
    }
}

impl TryFrom<u8> for AlertMode {
    type Error = CommandError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::from_u8(v).ok_or(CommandError::InvalidMode)
    }
}

// ---------------------------------------------------------------------------
// One-shot beeps
// ---------------------------------------------------------------------------

/// Tone used by one-shot beep patterns.
pub const BEEP_FREQUENCY_HZ: u32 = 2000;
pub const BEEP_DUTY_PERCENT: u8 = 50;

/// A queued `beep_pattern` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepRequest {
    pub count: u8,
    pub on_ms: u32,
    pub pause_ms: u32,
}

impl BeepRequest {
    /// Two short beeps at boot.
    pub const SELF_TEST: Self = Self { count: 2, on_ms: 100, pause_ms: 100 };
    /// Single chirp acknowledging a remote silence.
    pub const ACK: Self = Self { count: 1, on_ms: 100, pause_ms: 0 };

    /// Upper bound on how long the pattern can occupy the buzzer.
    pub fn max_duration_ms(&self) -> u32 {
        u32::from(self.count).saturating_mul(self.on_ms.saturating_add(self.pause_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeepOutcome {
    Completed,
    /// An alert mode became active before the pattern finished.
    Cancelled,
}

/// Play `count` beeps at the default tone.  No pause follows the last beep.
///
/// `cancel` is polled before every beep and after every tone; once it
/// returns `true` the output is silenced and the pattern stops.
pub fn beep_pattern(
    out: &mut impl BuzzerPort,
    delay: &mut impl DelayNs,
    request: BeepRequest,
    mut cancel: impl FnMut() -> bool,
) -> BeepOutcome {
    for i in 0..request.count {
        if cancel() {
            out.waveform_off();
            return BeepOutcome::Cancelled;
        }
        if let Err(e) = out.set_waveform(BEEP_FREQUENCY_HZ, BEEP_DUTY_PERCENT) {
            warn!("Buzzer: beep {} tone failed: {}", i + 1, e);
        }
        delay.delay_ms(request.on_ms);
        out.waveform_off();
        if cancel() {
            return BeepOutcome::Cancelled;
        }
        if i + 1 < request.count {
            delay.delay_ms(request.pause_ms);
        }
    }
    BeepOutcome::Completed
}

// ---------------------------------------------------------------------------
// Cross-thread control block
// ---------------------------------------------------------------------------

const BEEP_QUEUE_DEPTH: usize = 2;

/// State shared between the alert worker and the waveform loop.
pub struct BuzzerControl {
    mode: AtomicU8,
    beeps: Channel<CriticalSectionRawMutex, BeepRequest, BEEP_QUEUE_DEPTH>,
    outcomes: Channel<CriticalSectionRawMutex, BeepOutcome, BEEP_QUEUE_DEPTH>,
}

impl BuzzerControl {
    pub const fn new() -> Self {
        Self {
            mode: AtomicU8::new(AlertMode::Off as u8),
            beeps: Channel::new(),
            outcomes: Channel::new(),
        }
    }

    /// Publish the active mode.  Never blocks.
    pub fn set_mode(&self, mode: AlertMode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// Active mode as one atomic load.
    pub fn mode(&self) -> AlertMode {
        AlertMode::from_u8(self.mode.load(Ordering::Acquire)).unwrap_or(AlertMode::Off)
    }

    /// Queue a one-shot pattern for the waveform loop.  Returns `false`
    /// when the queue is full and the request was dropped.
    pub fn request_beep(&self, request: BeepRequest) -> bool {
        self.beeps.try_send(request).is_ok()
    }

    /// Next reported pattern outcome, if any.
    pub fn take_outcome(&self) -> Option<BeepOutcome> {
        self.outcomes.try_receive().ok()
    }

    fn next_request(&self) -> Option<BeepRequest> {
        self.beeps.try_receive().ok()
    }

    fn report(&self, outcome: BeepOutcome) {
        if self.outcomes.try_send(outcome).is_err() {
            debug!("Buzzer: outcome queue full, dropping {:?}", outcome);
        }
    }
}

impl Default for BuzzerControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for &BuzzerControl {
    fn set_mode(&mut self, mode: AlertMode) {
        BuzzerControl::set_mode(self, mode);
    }
}

/// Process-wide buzzer control block.
pub static BUZZER: BuzzerControl = BuzzerControl::new();

// ---------------------------------------------------------------------------
// Waveform loop
// ---------------------------------------------------------------------------

/// Drives the buzzer from [`BuzzerControl`] on its own thread.
pub struct BuzzerDriver<'a, P: BuzzerPort, D: DelayNs> {
    port: P,
    delay: D,
    control: &'a BuzzerControl,
    idle_poll_ms: u32,
    last_mode: AlertMode,
}

impl<'a, P: BuzzerPort, D: DelayNs> BuzzerDriver<'a, P, D> {
    pub fn new(port: P, delay: D, control: &'a BuzzerControl, idle_poll_ms: u32) -> Self {
        Self {
            port,
            delay,
            control,
            idle_poll_ms,
            last_mode: AlertMode::Off,
        }
    }

    /// One iteration: a full on/off period, a queued beep pattern, or one
    /// idle poll interval.
    pub fn run_cycle(&mut self) {
        let mode = self.control.mode();
        if mode != self.last_mode {
            info!("Buzzer: {} -> {}", self.last_mode.name(), mode.name());
            self.last_mode = mode;
        }

        if mode == AlertMode::Off {
            self.port.waveform_off();
            match self.control.next_request() {
                Some(request) => {
                    let control = self.control;
                    let outcome = beep_pattern(&mut self.port, &mut self.delay, request, || {
                        control.mode() != AlertMode::Off
                    });
                    debug!("Buzzer: beep x{} {:?}", request.count, outcome);
                    self.control.report(outcome);
                }
                None => self.delay.delay_ms(self.idle_poll_ms),
            }
            return;
        }

        // A pattern queued while an alert is sounding is stale by the time
        // the alert ends.
        if let Some(request) = self.control.next_request() {
            debug!("Buzzer: beep x{} cancelled by {} mode", request.count, mode.name());
            self.control.report(BeepOutcome::Cancelled);
        }

        let profile = mode.profile();
        if let Err(e) = self.port.set_waveform(profile.frequency_hz, profile.duty_percent) {
            warn!("Buzzer: {} tone failed: {}", mode.name(), e);
        }
        self.delay.delay_ms(profile.on_ms);
        self.port.waveform_off();
        self.delay.delay_ms(profile.off_ms);
    }

    /// Run forever.  Call from a dedicated thread.
    pub fn run(mut self) -> ! {
        info!("Buzzer: waveform loop started");
        loop {
            self.run_cycle();
        }
    }
}
