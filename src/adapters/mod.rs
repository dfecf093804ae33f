//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                 |
//! |------------|--------------------|-----------------------------|
//! | `hardware` | PeripheralPort     | ESP32 ADC1, flame GPIO      |
//! |            | BuzzerPort         | ESP32 LEDC PWM              |
//! | `mqtt`     | PublishPort        | ESP-IDF MQTT client         |
//! | `time`     | TimePort           | ESP32 system timer          |
//! | `wifi`     | (LinkStatus flags) | ESP-IDF Wi-Fi STA           |

pub mod hardware;
pub mod mqtt;
pub mod time;
pub mod wifi;
