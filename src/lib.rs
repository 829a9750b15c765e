//! Irrigation controller firmware library.
//!
//! Exposes the watering core, terminals, and adapters for integration
//! testing and the simulation binary.  All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod history;
pub mod pins;
pub mod schedule;
pub mod scheduler;
pub mod terminal;
pub mod timestamp;

pub use app::commands::{Command, HELP_TEXT};
pub use app::domain::{Domain, Watered};
pub use app::events::{AppEvent, FireSource};
pub use app::ports::{
    ActuatorPort, ClockError, ClockPort, EventSink, FireDelegate, ScheduledRun, StorageError,
    StoragePort,
};
pub use app::processor::{CommandProcessor, Reply};
pub use app::service::{SystemPorts, WateringSystem};
pub use config::{ConfigDocument, ControllerSettings, DomainSpec};
pub use error::ConfigError;
pub use history::WateringHistory;
pub use schedule::{ScheduleTable, TimeOfDay, Weekday};
pub use scheduler::{InlineFire, SchedulerLoop, ThreadedFire};
pub use timestamp::{MinuteStamp, Timestamp};
