//! Buzzer driver, peripheral initialisation, and worker spawning.

pub mod buzzer;
pub mod hw_init;
pub mod task_pin;
