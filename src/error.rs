//! Error types for the irrigation controller.
//!
//! Configuration errors are the only fallible tier in the core: every
//! problem found while validating a configuration document maps to one
//! [`ConfigError`] variant naming the first offending field, and a
//! rejected document never changes live state.  Command-level problems
//! are rendered as reply text by the command processor and never reach
//! this module.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Why a configuration document was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The text is not JSON, or the top level is not an object.
    Parse(String),
    /// A required field is absent.  Carries the field path,
    /// e.g. `domains[1].duration`.
    MissingField(String),
    /// A field is present but has the wrong JSON type.
    WrongType {
        field: String,
        expected: &'static str,
    },
    /// The top-level `name` is an empty string.
    EmptyName,
    /// A domain name is empty or contains characters outside `[A-Za-z0-9_-]`.
    InvalidDomainName(String),
    /// Two domains share the same name.
    DuplicateDomain(String),
    /// `gpio` is not an integer in `0..=255`.
    InvalidActuator { domain: String },
    /// `domain` drives a gpio an earlier domain already uses.
    DuplicateActuator { domain: String, gpio: u8 },
    /// `duration` is not a finite number in `(0, 60]`.
    InvalidDuration { domain: String, value: f64 },
    /// A schedule entry names a weekday outside `MON`..`SUN`.
    UnknownWeekday { domain: String, code: String },
    /// A schedule time is not of the form `HH:MM`.
    MalformedTime { domain: String, value: String },
    /// A schedule time has hour > 23 or minute > 59.
    TimeOutOfRange { domain: String, value: String },
    /// The validated document could not be persisted.
    Storage(StorageError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "document is not a JSON object: {msg}"),
            Self::MissingField(field) => write!(f, "missing field `{field}`"),
            Self::WrongType { field, expected } => {
                write!(f, "field `{field}` must be {expected}")
            }
            Self::EmptyName => write!(f, "field `name` must not be empty"),
            Self::InvalidDomainName(name) => write!(
                f,
                "domain name \"{name}\" must be non-empty and use only A-Z, a-z, 0-9, '_' or '-'"
            ),
            Self::DuplicateDomain(name) => write!(f, "domain \"{name}\" is defined twice"),
            Self::InvalidActuator { domain } => {
                write!(f, "domain \"{domain}\": gpio must be an integer 0-255")
            }
            Self::DuplicateActuator { domain, gpio } => {
                write!(f, "domain \"{domain}\": gpio {gpio} is already used by another domain")
            }
            Self::InvalidDuration { domain, value } => write!(
                f,
                "domain \"{domain}\": duration {value} must be greater than 0 and at most 60"
            ),
            Self::UnknownWeekday { domain, code } => write!(
                f,
                "domain \"{domain}\": \"{code}\" is not a day of the week (MON..SUN)"
            ),
            Self::MalformedTime { domain, value } => {
                write!(f, "domain \"{domain}\": time \"{value}\" is not HH:MM")
            }
            Self::TimeOutOfRange { domain, value } => write!(
                f,
                "domain \"{domain}\": time \"{value}\" needs hour 0-23 and minute 0-59"
            ),
            Self::Storage(e) => write!(f, "could not persist configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Settings errors
// ---------------------------------------------------------------------------

/// A runtime setting is out of its accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsError(pub &'static str);

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid setting: {}", self.0)
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_field() {
        let e = ConfigError::MissingField("domains[1].duration".into());
        assert_eq!(e.to_string(), "missing field `domains[1].duration`");

        let e = ConfigError::TimeOutOfRange {
            domain: "herbs".into(),
            value: "24:00".into(),
        };
        assert!(e.to_string().contains("herbs"));
        assert!(e.to_string().contains("24:00"));
    }

    #[test]
    fn storage_errors_convert() {
        let e: ConfigError = StorageError::Full.into();
        assert_eq!(e, ConfigError::Storage(StorageError::Full));
    }
}
