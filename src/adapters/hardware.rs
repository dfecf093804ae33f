//! Hardware adapter: bridges the detector's peripherals to port traits.
//!
//! [`SensorInputs`] samples the three ADC channels and the flame comparator
//! through [`PeripheralPort`]; [`BuzzerOutput`] drives the LEDC tone through
//! [`BuzzerPort`].  These are the only types the workers hand to the core
//! that touch registers.  On non-espidf targets the underlying `hw_init`
//! calls use the simulation store.

use crate::app::ports::{BuzzerPort, PeripheralPort};
use crate::drivers::hw_init;
use crate::error::{ActuatorError, SensorError};
use crate::pins;
use crate::sensors::SensorKind;

/// ADC + GPIO sampling for the four detection channels.
pub struct SensorInputs {
    full_scale: u16,
}

impl SensorInputs {
    /// `full_scale` is what a digital channel reports when asserted.
    pub fn new(full_scale: u16) -> Self {
        Self { full_scale }
    }
}

impl PeripheralPort for SensorInputs {
    fn read_channel(&mut self, kind: SensorKind) -> Result<u16, SensorError> {
        match kind {
            SensorKind::Smoke => hw_init::adc1_read(pins::SMOKE_ADC_CHANNEL),
            SensorKind::Temperature => hw_init::adc1_read(pins::TEMP_ADC_CHANNEL),
            SensorKind::Gas => hw_init::adc1_read(pins::GAS_ADC_CHANNEL),
            // Active-low comparator: LOW means flame.
            SensorKind::InfraredFlame => {
                let level = hw_init::gpio_read(pins::FLAME_GPIO)?;
                Ok(if level { 0 } else { self.full_scale })
            }
        }
    }
}

/// LEDC-backed tone output.
#[derive(Default)]
pub struct BuzzerOutput;

impl BuzzerPort for BuzzerOutput {
    fn set_waveform(&mut self, frequency_hz: u32, duty_percent: u8) -> Result<(), ActuatorError> {
        hw_init::buzzer_tone(frequency_hz, duty_percent)
    }

    fn waveform_off(&mut self) {
        hw_init::buzzer_silence();
    }
}
