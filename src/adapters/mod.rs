//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                  | Connects to                 |
//! |------------|-----------------------------|-----------------------------|
//! | `gpio`     | `OutputPin` / `InputPin`    | ESP32 GPIO (`PinDriver`)    |
//! | `log_sink` | EventSink                   | Serial log output           |
//! | `nvs`      | ConfigPort                  | NVS / in-memory store       |
//! | `sim`      | pins + Clock                | Host-side simulated bench   |
//! | `time`     | Clock                       | ESP32 timer / std::time     |

#[cfg(feature = "espidf")]
pub mod gpio;
pub mod log_sink;
pub mod nvs;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
pub mod time;
