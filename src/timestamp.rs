//! Wall-clock readings at the granularity the controller cares about.
//!
//! [`Timestamp`] mirrors an RTC reading (`year, month, day, hour, minute,
//! second, weekday, yearday`).  [`MinuteStamp`] drops the seconds and the
//! yearday: it is the dedupe key that stops a domain firing twice in one
//! calendar minute, compared by exact equality only.

use core::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::schedule::Weekday;

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ───────────────────────────────────────────────────────────────
// Timestamp
// ───────────────────────────────────────────────────────────────

/// One clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: u16,
    /// 1–12
    pub month: u8,
    /// 1–31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub weekday: Weekday,
    /// 1–366
    pub yearday: u16,
}

impl Timestamp {
    /// Build a reading from calendar fields, deriving weekday and yearday.
    /// `None` for impossible dates or times (Feb 30, 24:00, …).
    pub fn from_parts(year: u16, month: u8, day: u8, hour: u8, minute: u8) -> Option<Self> {
        let dt = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?
            .and_hms_opt(u32::from(hour), u32::from(minute), 0)?;
        Some(Self::from_datetime(&dt))
    }

    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            year: dt.year().clamp(0, i32::from(u16::MAX)) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
            weekday: dt.weekday().into(),
            yearday: dt.ordinal() as u16,
        }
    }

    /// Inverse of [`from_datetime`](Self::from_datetime).  Weekday and
    /// yearday are ignored; the calendar fields must be valid.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?
        .and_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )
    }

    /// Parse the `update_time` argument: exactly `MM/DD/YYYY HH:MM`
    /// (two-digit fields, four-digit year, single space).
    pub fn parse_update_time(text: &str) -> Option<Self> {
        let b = text.as_bytes();
        if !text.is_ascii() || b.len() != 16 || b[2] != b'/' || b[5] != b'/' || b[10] != b' ' || b[13] != b':' {
            return None;
        }
        let month = digits(&text[0..2])?;
        let day = digits(&text[3..5])?;
        let year = digits(&text[6..10])?;
        let hour = digits(&text[11..13])?;
        let minute = digits(&text[14..16])?;
        Self::from_parts(year, month as u8, day as u8, hour as u8, minute as u8)
    }

    pub fn minute_stamp(&self) -> MinuteStamp {
        MinuteStamp {
            year: self.year,
            month: self.month,
            day: self.day,
            hour: self.hour,
            minute: self.minute,
            weekday: self.weekday,
        }
    }

    fn month_abbr(&self) -> &'static str {
        MONTH_ABBR
            .get(usize::from(self.month.saturating_sub(1)))
            .copied()
            .unwrap_or("???")
    }
}

fn digits(field: &str) -> Option<u16> {
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// `MON Oct 17, 2026 15:34`
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}, {} {:02}:{:02}",
            self.weekday,
            self.month_abbr(),
            self.day,
            self.year,
            self.hour,
            self.minute
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Minute stamp
// ───────────────────────────────────────────────────────────────

/// `(year, month, day, hour, minute, weekday)`, the per-minute dedupe key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MinuteStamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub weekday: Weekday,
}

/// `MON 10-17-2026 @ 15:34`
impl fmt::Display for MinuteStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}-{:02}-{:04} @ {:02}:{:02}",
            self.weekday, self.month, self.day, self.year, self.hour, self.minute
        )
    }
}
