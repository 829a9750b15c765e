//! Command processor: one line in, one reply out.
//!
//! Transport-independent and stateless per line: every session (UART,
//! each TCP client) holds a clone of the same processor, which holds the
//! shared [`WateringSystem`].  The only thing a line can do to its session
//! is ask for it to be closed ([`Reply::Close`]).

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use log::debug;

use super::commands::{Command, HELP_TEXT, ParseError};
use super::service::{NOT_CONFIGURED, WateringSystem};

pub const INVALID_COMMAND: &str = "Invalid command, try again";
pub const UPDATE_FAILED: &str = "Failed to update configuration";

/// What the session should do with a processed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send this text back (without trailing newline).
    Text(String),
    /// End the session.
    Close,
}

/// Parses terminal lines and dispatches them to the watering core.
pub struct CommandProcessor<D> {
    system: Arc<WateringSystem<D>>,
    max_duration_secs: f32,
}

impl<D> Clone for CommandProcessor<D> {
    fn clone(&self) -> Self {
        Self {
            system: Arc::clone(&self.system),
            max_duration_secs: self.max_duration_secs,
        }
    }
}

impl<D> CommandProcessor<D>
where
    D: DelayNs + Clone + Send + Sync + 'static,
{
    /// `max_duration_secs` bounds the optional `water` duration.
    pub fn new(system: Arc<WateringSystem<D>>, max_duration_secs: f32) -> Self {
        Self {
            system,
            max_duration_secs,
        }
    }

    pub fn system(&self) -> &Arc<WateringSystem<D>> {
        &self.system
    }

    /// Handle one received line.  Never fails: bad input becomes reply text.
    pub fn handle_line(&self, line: &str) -> Reply {
        match Command::parse(line, self.max_duration_secs) {
            Ok(cmd) => {
                debug!("Processor: {cmd:?}");
                self.execute(cmd)
            }
            Err(ParseError::DurationOutOfRange) => Reply::Text(format!(
                "Error: watering duration must be between 0 and {} seconds",
                self.max_duration_secs
            )),
            Err(ParseError::Invalid) => Reply::Text(INVALID_COMMAND.to_string()),
        }
    }

    /// Answer a line the terminal had to discard for length.  Only its
    /// first word survives, which is enough to pick the failure reply.
    pub fn handle_overlong(&self, keyword: &str) -> Reply {
        let text = if keyword == "update_config" {
            UPDATE_FAILED
        } else {
            INVALID_COMMAND
        };
        Reply::Text(text.to_string())
    }

    pub fn execute(&self, cmd: Command) -> Reply {
        let sys = &self.system;
        let text = match cmd {
            Command::Water {
                domain,
                duration_secs,
            } => sys.water_by_name(&domain, duration_secs),
            Command::Info => sys.describe(),
            Command::PrintConfig => sys
                .serialize_config()
                .unwrap_or_else(|| NOT_CONFIGURED.to_string()),
            Command::UpdateConfig(raw) => match sys.load_or_replace(&raw) {
                Ok(()) => format!(
                    "Successfully updated configuration and saved to {}",
                    sys.config_path().unwrap_or_default()
                ),
                Err(_) => UPDATE_FAILED.to_string(),
            },
            Command::PrintTime => format!("Current Time: {}", sys.now()),
            Command::UpdateTime(ts) => match sys.set_time(&ts) {
                Ok(()) => format!("Time updated to: {}", sys.now()),
                Err(e) => format!("Failed to update time: {e}"),
            },
            Command::History => sys.history().render(),
            Command::Help => HELP_TEXT.to_string(),
            Command::Quit => return Reply::Close,
        };
        Reply::Text(text)
    }
}
