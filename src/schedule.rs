//! Weekly watering schedules.
//!
//! A [`ScheduleTable`] maps weekday codes to an ordered set of
//! `(hour, minute)` fire points.  Tables are built once from the
//! configuration document and never change afterwards: a single
//! malformed entry rejects the whole table, and with it the whole
//! document.
//!
//! ```text
//!   "schedule": [ { "weekday": "SUN", "times": ["15:34", "7:05"] } ]
//!                          │
//!                          ▼
//!   ScheduleTable { Sun => {07:05, 15:34} }
//! ```

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ═══════════════════════════════════════════════════════════════
//  Weekday
// ═══════════════════════════════════════════════════════════════

/// Day of the week, Monday first (matches the RTC weekday numbering
/// where 0 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Canonical three-letter code used in configuration documents.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Mon => "MON",
            Self::Tue => "TUE",
            Self::Wed => "WED",
            Self::Thu => "THU",
            Self::Fri => "FRI",
            Self::Sat => "SAT",
            Self::Sun => "SUN",
        }
    }

    /// Parse a canonical code.  Case-sensitive: `"mon"` is rejected.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    /// 0 = Monday … 6 = Sunday.
    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        // chrono also numbers Monday = 0.
        Self::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Time of day
// ═══════════════════════════════════════════════════════════════

/// A fire point within a day, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

/// Why a `HH:MM` string was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeParseError {
    /// Not two colon-separated groups of one or two digits.
    Malformed,
    /// Well-formed, but hour > 23 or minute > 59.
    OutOfRange,
}

impl TimeOfDay {
    /// `None` unless `hour <= 23` and `minute <= 59`.
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub const fn hour(self) -> u8 {
        self.hour
    }

    pub const fn minute(self) -> u8 {
        self.minute
    }

    /// Parse `H:MM` / `HH:MM` (one or two digits per field).
    pub fn parse(text: &str) -> Result<Self, TimeParseError> {
        let (h, m) = text.split_once(':').ok_or(TimeParseError::Malformed)?;
        let hour = parse_two_digits(h).ok_or(TimeParseError::Malformed)?;
        let minute = parse_two_digits(m).ok_or(TimeParseError::Malformed)?;
        Self::new(hour, minute).ok_or(TimeParseError::OutOfRange)
    }
}

fn parse_two_digits(field: &str) -> Option<u8> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schedule table
// ═══════════════════════════════════════════════════════════════

/// Per-domain weekly schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleTable {
    days: BTreeMap<Weekday, BTreeSet<TimeOfDay>>,
}

impl ScheduleTable {
    /// Build a table from `(weekday code, ["HH:MM", ...])` entries.
    ///
    /// A later entry for a weekday already seen replaces the earlier one.
    /// `domain` is only used to label the error.
    pub fn from_entries<'a, I, T>(domain: &str, entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, T)>,
        T: IntoIterator<Item = &'a str>,
    {
        let mut days = BTreeMap::new();
        for (code, times) in entries {
            let day = Weekday::from_code(code).ok_or_else(|| ConfigError::UnknownWeekday {
                domain: domain.to_string(),
                code: code.to_string(),
            })?;

            let mut slots = BTreeSet::new();
            for text in times {
                let t = TimeOfDay::parse(text).map_err(|e| match e {
                    TimeParseError::Malformed => ConfigError::MalformedTime {
                        domain: domain.to_string(),
                        value: text.to_string(),
                    },
                    TimeParseError::OutOfRange => ConfigError::TimeOutOfRange {
                        domain: domain.to_string(),
                        value: text.to_string(),
                    },
                })?;
                slots.insert(t);
            }
            days.insert(day, slots);
        }
        Ok(Self { days })
    }

    /// Whether `(hour, minute)` is a fire point on `day`.
    pub fn fires_at(&self, day: Weekday, hour: u8, minute: u8) -> bool {
        match (self.days.get(&day), TimeOfDay::new(hour, minute)) {
            (Some(slots), Some(t)) => slots.contains(&t),
            _ => false,
        }
    }

    /// Fire points for one day, earliest first.
    pub fn times_for(&self, day: Weekday) -> impl Iterator<Item = TimeOfDay> + '_ {
        self.days.get(&day).into_iter().flatten().copied()
    }

    /// Days that carry an entry, Monday first.
    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        self.days.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
