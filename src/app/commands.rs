//! Inbound terminal commands.
//!
//! A line from either transport is split into a keyword and its
//! arguments, then parsed into one [`Command`] variant carrying validated
//! arguments.  Parsing never panics and never fails loudly: anything that
//! doesn't fit the grammar becomes a [`ParseError`] the processor renders
//! as reply text.
//!
//! ```text
//!   water <domain> [seconds]        update_config <json>
//!   info                            print_time
//!   print_config                    update_time MM/DD/YYYY HH:MM
//!   history                         help
//!   quit
//! ```

use core::fmt;

use crate::config::is_valid_domain_name;
use crate::timestamp::Timestamp;

/// Text of the `help` command.
pub const HELP_TEXT: &str = "\
The following commands are valid:
  water <domain> [duration]    : water a domain
  info                         : print info about watering system configuration
  print_config                 : print json configuration file
  update_config <json string>  : update json configuration file
  print_time                   : print the current local date and time
  update_time MM/DD/YYYY HH:MM : update the local date and time
  history                      : list the most recent watering runs
  quit                         : close the connection
  help                         : list valid commands";

/// Commands that terminal sessions send into the watering core.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Water a domain now, optionally overriding its duration.
    Water {
        domain: String,
        duration_secs: Option<f32>,
    },
    Info,
    PrintConfig,
    /// Replace the configuration with this document text.
    UpdateConfig(String),
    PrintTime,
    UpdateTime(Timestamp),
    History,
    Help,
    /// Close this session.
    Quit,
}

/// Why a line was not a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Unknown keyword, missing or extra arguments, malformed argument.
    Invalid,
    /// `water` with a numeric duration outside `(0, max]`.
    DurationOutOfRange,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid command"),
            Self::DurationOutOfRange => write!(f, "duration out of range"),
        }
    }
}

impl Command {
    /// Parse one line.  `max_duration_secs` bounds the `water` override.
    pub fn parse(line: &str, max_duration_secs: f32) -> Result<Self, ParseError> {
        let line = line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (line, ""),
        };

        match keyword {
            "water" => parse_water(rest, max_duration_secs),
            "update_config" if !rest.is_empty() => Ok(Self::UpdateConfig(rest.to_string())),
            "update_time" => Timestamp::parse_update_time(rest)
                .map(Self::UpdateTime)
                .ok_or(ParseError::Invalid),
            _ if !rest.is_empty() => Err(ParseError::Invalid),
            "info" => Ok(Self::Info),
            "print_config" => Ok(Self::PrintConfig),
            "print_time" => Ok(Self::PrintTime),
            "history" => Ok(Self::History),
            "help" => Ok(Self::Help),
            "quit" => Ok(Self::Quit),
            _ => Err(ParseError::Invalid),
        }
    }
}

fn parse_water(args: &str, max_duration_secs: f32) -> Result<Command, ParseError> {
    let mut tokens = args.split_whitespace();
    let domain = tokens.next().ok_or(ParseError::Invalid)?;
    if !is_valid_domain_name(domain) {
        return Err(ParseError::Invalid);
    }
    let duration_secs = match tokens.next() {
        None => None,
        Some(tok) => {
            let secs: f32 = tok.parse().map_err(|_| ParseError::Invalid)?;
            if !(secs.is_finite() && secs > 0.0 && secs <= max_duration_secs) {
                return Err(ParseError::DurationOutOfRange);
            }
            Some(secs)
        }
    };
    if tokens.next().is_some() {
        return Err(ParseError::Invalid);
    }
    Ok(Command::Water {
        domain: domain.to_string(),
        duration_secs,
    })
}
