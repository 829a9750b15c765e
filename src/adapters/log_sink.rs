//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! application event to the `log` facade (UART console on the board,
//! `tracing-subscriber` on the host).

use log::{info, warn};

use crate::app::events::{AppEvent, FireSource};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        match event {
            AppEvent::Bootstrapped { name, domains } => {
                info!("BOOT  | system=\"{}\" domains={}", name, domains);
            }
            AppEvent::ScheduleFired { domain, at } => {
                info!("SCHED | {} due at {}", domain, at);
            }
            AppEvent::Watered {
                domain,
                actuator_id,
                duration_secs,
                at,
                source,
            } => {
                let src = match source {
                    FireSource::Manual => "manual",
                    FireSource::Schedule => "schedule",
                };
                info!(
                    "WATER | {} gpio={} {:.1}s at {} ({})",
                    domain, actuator_id, duration_secs, at, src
                );
            }
            AppEvent::DomainMissing(name) => {
                warn!("WATER | no domain \"{}\"", name);
            }
            AppEvent::ConfigReplaced { name, domains } => {
                info!("CONFIG| replaced: system=\"{}\" domains={}", name, domains);
            }
            AppEvent::ConfigRejected(reason) => {
                warn!("CONFIG| rejected: {}", reason);
            }
            AppEvent::ClockSet(at) => {
                info!("CLOCK | set to {}", at);
            }
        }
    }
}
