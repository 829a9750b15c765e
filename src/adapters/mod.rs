//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements    | Connects to                       |
//! |------------|---------------|-----------------------------------|
//! | `hardware` | ActuatorPort  | relay GPIOs (lazy per actuator id)|
//! | `log_sink` | EventSink     | `log` facade                      |
//! | `storage`  | StoragePort   | SPIFFS / host directory           |
//! | `time`     | ClockPort     | platform clock + offset, snapshot |
//! | `wifi`     | (none)        | ESP-IDF WiFi STA (TCP reachability)|

pub mod hardware;
pub mod log_sink;
pub mod storage;
pub mod time;
pub mod wifi;
