//! Outbound application events.
//!
//! The [`WateringSystem`](super::service::WateringSystem) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, record in
//! a test, forward to a network sink.

use crate::timestamp::MinuteStamp;

/// What triggered a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSource {
    /// A terminal `water` command.
    Manual,
    /// The schedule check.
    Schedule,
}

/// Structured events emitted by the watering core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A configuration was loaded at boot.
    Bootstrapped { name: String, domains: usize },

    /// The schedule check claimed a minute for a domain.
    ScheduleFired { domain: String, at: MinuteStamp },

    /// A watering run completed.
    Watered {
        domain: String,
        actuator_id: u8,
        duration_secs: f32,
        at: MinuteStamp,
        source: FireSource,
    },

    /// A `water` command named a domain that isn't configured.
    DomainMissing(String),

    /// A new configuration document was validated, persisted and swapped in.
    ConfigReplaced { name: String, domains: usize },

    /// A configuration document was refused; carries the reason.
    ConfigRejected(String),

    /// The wall clock was stepped by `update_time`.
    ClockSet(MinuteStamp),
}
