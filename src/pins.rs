//! GPIO / peripheral pin assignments for the FireSentry detector board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Sensors: Analog (ADC1, 12-bit, 12 dB attenuation)
// ---------------------------------------------------------------------------

/// MQ-2 smoke sensor analog output.  ADC1 channel 6 (GPIO 34).
pub const SMOKE_ADC_GPIO: i32 = 34;
pub const SMOKE_ADC_CHANNEL: u32 = 6;

/// LM35-style temperature sensor.  ADC1 channel 7 (GPIO 35).
pub const TEMP_ADC_GPIO: i32 = 35;
pub const TEMP_ADC_CHANNEL: u32 = 7;

/// MQ-5 combustible gas sensor.  ADC1 channel 5 (GPIO 33).
pub const GAS_ADC_GPIO: i32 = 33;
pub const GAS_ADC_CHANNEL: u32 = 5;

// ---------------------------------------------------------------------------
// Sensors: Digital
// ---------------------------------------------------------------------------

/// IR flame sensor comparator output, pulled up.
/// LOW = flame seen, HIGH = clear.
pub const FLAME_GPIO: i32 = 32;

// ---------------------------------------------------------------------------
// Buzzer (passive piezo on LEDC)
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 25;
pub const BUZZER_LEDC_CHANNEL: u32 = 0;
pub const BUZZER_LEDC_TIMER: u32 = 0;
/// Duty resolution in bits; full-scale duty is `2^13 - 1`.
pub const BUZZER_DUTY_BITS: u32 = 13;
/// Timer frequency at init, retuned per waveform.
pub const BUZZER_INIT_FREQ_HZ: u32 = 2000;

/// Maximum raw LEDC duty value at the configured resolution.
pub const fn buzzer_duty_max() -> u32 {
    (1 << BUZZER_DUTY_BITS) - 1
}
