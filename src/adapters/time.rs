//! Wall-clock adapter.
//!
//! Implements [`ClockPort`] as an adjustable offset over the platform
//! clock (`chrono::Local`, i.e. the ESP-IDF newlib clock on the board and
//! the OS clock on the host).  `update_time` moves the offset, never the
//! platform clock, so setting the time needs no privileges on the host.
//!
//! The board has no battery-backed RTC.  [`SystemClock::save_snapshot`]
//! stores the current reading under [`SNAPSHOT_PATH`] and
//! [`SystemClock::restore_snapshot`] winds the clock forward to it at
//! boot, so a reboot resumes close to the right time instead of 1970.

use std::sync::{Mutex, PoisonError};

use chrono::{Local, NaiveDateTime, TimeDelta};
use log::{info, warn};

use crate::app::ports::{ClockError, ClockPort, StorageError, StoragePort};
use crate::timestamp::Timestamp;

pub const SNAPSHOT_PATH: &str = "localtime";

pub struct SystemClock {
    source: fn() -> NaiveDateTime,
    offset: Mutex<TimeDelta>,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_source(local_now)
    }

    /// Clock over an arbitrary platform source.
    pub fn with_source(source: fn() -> NaiveDateTime) -> Self {
        Self {
            source,
            offset: Mutex::new(TimeDelta::zero()),
        }
    }

    fn current(&self) -> NaiveDateTime {
        let offset = *self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        let base = (self.source)();
        base.checked_add_signed(offset).unwrap_or(base)
    }

    fn step_to(&self, target: NaiveDateTime) {
        let delta = target - (self.source)();
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) = delta;
    }

    /// Persist the current reading.
    pub fn save_snapshot(&self, store: &dyn StoragePort) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(&self.now()).map_err(|_| StorageError::Corrupted)?;
        store.write(SNAPSHOT_PATH, &bytes)
    }

    /// Wind the clock forward to the saved snapshot if the platform clock
    /// is behind it.  Returns whether the clock moved.
    pub fn restore_snapshot(&self, store: &dyn StoragePort) -> bool {
        let saved: Timestamp = match store.read(SNAPSHOT_PATH) {
            Ok(bytes) => match postcard::from_bytes(&bytes) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("Clock: snapshot unreadable ({e}), ignoring");
                    return false;
                }
            },
            Err(StorageError::NotFound) => return false,
            Err(e) => {
                warn!("Clock: snapshot read failed ({e})");
                return false;
            }
        };
        let Some(target) = saved.to_datetime() else {
            warn!("Clock: snapshot holds an impossible date, ignoring");
            return false;
        };
        if target <= self.current() {
            return false;
        }
        self.step_to(target);
        info!("Clock: restored from snapshot to {saved}");
        true
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(&self.current())
    }

    fn set(&self, ts: &Timestamp) -> Result<(), ClockError> {
        let target = ts.to_datetime().ok_or(ClockError::InvalidTime)?;
        self.step_to(target);
        Ok(())
    }
}
