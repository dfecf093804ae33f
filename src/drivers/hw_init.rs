//! One-shot hardware peripheral initialization and raw access helpers.
//!
//! Configures the ADC1 oneshot unit, the flame-sensor GPIO, and the LEDC
//! timer/channel behind the buzzer using raw ESP-IDF sys calls.  Called
//! once from `main()` before any worker thread is spawned.
//!
//! On host builds every helper is backed by simulation atomics so the
//! adapters and the simulation harness can drive inputs and inspect the
//! buzzer output.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::{ActuatorError, SensorError};
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before any worker thread exists.
    unsafe {
        init_adc()?;
        init_flame_input()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: ADC1_HANDLE is written once in `init_adc()` before the sensor
/// worker starts; afterwards it is only read, and only by that worker.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };

    for channel in [pins::SMOKE_ADC_CHANNEL, pins::TEMP_ADC_CHANNEL, pins::GAS_ADC_CHANNEL] {
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::AdcInitFailed(ret));
        }
    }

    info!("hw_init: ADC1 configured (CH6=smoke, CH7=temp, CH5=gas)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract: sensor worker only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.max(0) as u16)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    sim::adc_read(channel)
}

// ── GPIO input (flame comparator) ─────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_flame_input() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::FLAME_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    info!("hw_init: flame input GPIO{} configured (pull-up)", pins::FLAME_GPIO);
    Ok(())
}

/// Logic level of an input pin.
#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> Result<bool, SensorError> {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    Ok((unsafe { gpio_get_level(pin) }) != 0)
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> Result<bool, SensorError> {
    sim::gpio_read(pin)
}

// ── LEDC PWM (buzzer) ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: pins::BUZZER_LEDC_TIMER,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_13_BIT,
        freq_hz: pins::BUZZER_INIT_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    let ret = unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: pins::BUZZER_LEDC_CHANNEL,
            timer_sel: pins::BUZZER_LEDC_TIMER,
            gpio_num: pins::BUZZER_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    info!("hw_init: LEDC configured (buzzer GPIO{}, CH0, 13-bit)", pins::BUZZER_GPIO);
    Ok(())
}

/// Scale a 0–100 duty percentage to the 13-bit LEDC register.
pub fn duty_from_percent(duty_percent: u8) -> u32 {
    u32::from(duty_percent.min(100)) * pins::buzzer_duty_max() / 100
}

/// Retune the buzzer timer and apply the duty.
#[cfg(target_os = "espidf")]
pub fn buzzer_tone(frequency_hz: u32, duty_percent: u8) -> Result<(), ActuatorError> {
    // SAFETY: LEDC timer/channel were configured in init_ledc(); only the
    // buzzer thread writes them after boot.
    unsafe {
        if ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, pins::BUZZER_LEDC_TIMER, frequency_hz)
            != ESP_OK as i32
        {
            return Err(ActuatorError::FrequencyRejected);
        }
        if ledc_set_duty(
            ledc_mode_t_LEDC_LOW_SPEED_MODE,
            pins::BUZZER_LEDC_CHANNEL,
            duty_from_percent(duty_percent),
        ) != ESP_OK as i32
        {
            return Err(ActuatorError::PwmWriteFailed);
        }
        if ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, pins::BUZZER_LEDC_CHANNEL)
            != ESP_OK as i32
        {
            return Err(ActuatorError::PwmWriteFailed);
        }
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn buzzer_tone(frequency_hz: u32, duty_percent: u8) -> Result<(), ActuatorError> {
    sim::tone(frequency_hz, duty_percent);
    Ok(())
}

/// Zero the buzzer duty.
#[cfg(target_os = "espidf")]
pub fn buzzer_silence() {
    // SAFETY: see buzzer_tone().
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, pins::BUZZER_LEDC_CHANNEL, 0);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, pins::BUZZER_LEDC_CHANNEL);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn buzzer_silence() {
    sim::tone(0, 0);
}

// ── Simulation backing store ──────────────────────────────────

/// Host-side stand-ins for the ADC, flame GPIO, and buzzer PWM.
#[cfg(not(target_os = "espidf"))]
pub mod sim {
    use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};

    use crate::error::SensorError;
    use crate::pins;

    const ADC_CHANNELS: usize = 10;

    static ADC: [AtomicU16; ADC_CHANNELS] = [const { AtomicU16::new(0) }; ADC_CHANNELS];
    /// Bit per ADC channel: set = next reads fail.
    static ADC_FAULTS: AtomicU32 = AtomicU32::new(0);
    /// Pulled-up comparator idles HIGH (no flame).
    static FLAME_LEVEL: AtomicBool = AtomicBool::new(true);
    static TONE_HZ: AtomicU32 = AtomicU32::new(0);
    static TONE_DUTY: AtomicU8 = AtomicU8::new(0);

    pub fn set_adc(channel: u32, raw: u16) {
        if let Some(slot) = ADC.get(channel as usize) {
            slot.store(raw, Ordering::Relaxed);
        }
    }

    pub fn set_adc_fault(channel: u32, failing: bool) {
        let bit = 1u32 << channel;
        if failing {
            ADC_FAULTS.fetch_or(bit, Ordering::Relaxed);
        } else {
            ADC_FAULTS.fetch_and(!bit, Ordering::Relaxed);
        }
    }

    /// `true` drives the comparator LOW (flame present).
    pub fn set_flame(present: bool) {
        FLAME_LEVEL.store(!present, Ordering::Relaxed);
    }

    /// Last tone written: `(frequency_hz, duty_percent)`, `(0, 0)` when silent.
    pub fn tone_state() -> (u32, u8) {
        (TONE_HZ.load(Ordering::Relaxed), TONE_DUTY.load(Ordering::Relaxed))
    }

    pub(super) fn adc_read(channel: u32) -> Result<u16, SensorError> {
        if ADC_FAULTS.load(Ordering::Relaxed) & (1u32 << channel) != 0 {
            return Err(SensorError::AdcReadFailed);
        }
        ADC.get(channel as usize)
            .map(|slot| slot.load(Ordering::Relaxed))
            .ok_or(SensorError::NotConfigured)
    }

    pub(super) fn gpio_read(pin: i32) -> Result<bool, SensorError> {
        if pin == pins::FLAME_GPIO {
            Ok(FLAME_LEVEL.load(Ordering::Relaxed))
        } else {
            Err(SensorError::NotConfigured)
        }
    }

    pub(super) fn tone(frequency_hz: u32, duty_percent: u8) {
        TONE_HZ.store(frequency_hz, Ordering::Relaxed);
        TONE_DUTY.store(duty_percent, Ordering::Relaxed);
    }
}
