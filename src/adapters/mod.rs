//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to               |
//! |------------|-------------------|---------------------------|
//! | `log_sink` | EventSink         | `log` facade / serial     |
//! | `nvs`      | SettingsStore     | NVS / in-memory store     |
//! | `time`     | Clock             | esp_timer / std Instant   |
//! | `uart`     | Transport + Clock | ESP-IDF UART driver       |

pub mod log_sink;
pub mod nvs;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
