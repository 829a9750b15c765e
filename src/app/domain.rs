//! One irrigation zone.
//!
//! A [`Domain`] binds a name to an actuator, a default run length and an
//! optional weekly schedule, and owns the watermark that stops it firing
//! twice in the same calendar minute.
//!
//! ```text
//!   claim(now) ──▶ due? ─no──▶ false
//!                   │yes
//!                   ▼
//!     last_fired == now.minute  or  claimed == now.minute  or running ──▶ false
//!                   │otherwise
//!                   ▼
//!            claimed = now.minute ──▶ true ──▶ water()
//!
//!   water(): run_lock ─▶ running ─▶ set(on) ─▶ delay ─▶ set(off)
//!            ─▶ last_fired = clock.now().minute ─▶ release
//! ```
//!
//! Runs on one domain are strictly serial: `water()` holds the domain's
//! run lock for the whole actuate → wait → release → stamp sequence, so a
//! manual command and a scheduled fire on the same domain queue behind
//! each other.  Different domains run independently.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;
use log::debug;

use super::ports::{ActuatorPort, ClockPort};
use crate::config::DomainSpec;
use crate::schedule::ScheduleTable;
use crate::timestamp::{MinuteStamp, Timestamp};

/// Outcome of a completed watering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Watered {
    pub domain: String,
    pub actuator_id: u8,
    pub duration_secs: f32,
    /// Minute the run finished in (the new watermark).
    pub at: MinuteStamp,
}

/// `Watered domain "herbs" on SAT 10-17-2026 @ 15:34`
impl fmt::Display for Watered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Watered domain \"{}\" on {}", self.domain, self.at)
    }
}

#[derive(Debug, Default)]
struct DomainState {
    /// Minute of the most recent completed run.
    last_fired: Option<MinuteStamp>,
    /// Minute most recently claimed by the schedule check.
    claimed: Option<MinuteStamp>,
    /// A run is between actuator-on and the watermark stamp.
    running: bool,
}

/// One domain.  Immutable apart from its watermark.
#[derive(Debug)]
pub struct Domain {
    name: String,
    actuator_id: u8,
    duration_secs: f32,
    schedule: Option<ScheduleTable>,
    run_lock: Arc<Mutex<()>>,
    state: Arc<Mutex<DomainState>>,
}

impl Domain {
    /// A fresh domain with no watermark.
    pub fn new(spec: DomainSpec) -> Self {
        Self {
            name: spec.name,
            actuator_id: spec.actuator_id,
            duration_secs: spec.duration_secs,
            schedule: spec.schedule,
            run_lock: Arc::new(Mutex::new(())),
            state: Arc::new(Mutex::new(DomainState::default())),
        }
    }

    /// Replacement for `previous` after a configuration swap.
    ///
    /// If name and actuator are unchanged the new domain shares the old
    /// one's run lock and watermark: a run still in flight on the old
    /// object serialises against new runs and stamps the shared
    /// watermark, and a minute already fired stays fired.
    pub fn succeed(spec: DomainSpec, previous: Option<&Domain>) -> Self {
        match previous {
            Some(prev) if prev.name == spec.name && prev.actuator_id == spec.actuator_id => Self {
                name: spec.name,
                actuator_id: spec.actuator_id,
                duration_secs: spec.duration_secs,
                schedule: spec.schedule,
                run_lock: Arc::clone(&prev.run_lock),
                state: Arc::clone(&prev.state),
            },
            _ => Self::new(spec),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actuator_id(&self) -> u8 {
        self.actuator_id
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration_secs
    }

    pub fn schedule(&self) -> Option<&ScheduleTable> {
        self.schedule.as_ref()
    }

    pub fn last_fired(&self) -> Option<MinuteStamp> {
        self.state().last_fired
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    /// Whether the schedule has an entry at `now`'s weekday/hour/minute.
    pub fn is_due(&self, now: &Timestamp) -> bool {
        self.schedule
            .as_ref()
            .is_some_and(|s| s.fires_at(now.weekday, now.hour, now.minute))
    }

    /// Claim `now`'s minute for a scheduled run.
    ///
    /// Returns `true` at most once per distinct minute, and never while a
    /// run is in progress.  The claim is recorded before any actuation,
    /// so callers may execute the run asynchronously.
    pub fn claim(&self, now: &Timestamp) -> bool {
        if !self.is_due(now) {
            return false;
        }
        let stamp = now.minute_stamp();
        let mut st = self.state();
        if st.running || st.last_fired == Some(stamp) || st.claimed == Some(stamp) {
            return false;
        }
        st.claimed = Some(stamp);
        true
    }

    /// Run the actuator for `duration_secs` (or the domain default) and
    /// stamp the watermark.  Blocks the caller for the whole run, and
    /// first for any run already in progress on this domain.
    pub fn water<D: DelayNs>(
        &self,
        duration_secs: Option<f32>,
        hw: &dyn ActuatorPort,
        clock: &dyn ClockPort,
        delay: &mut D,
    ) -> Watered {
        let secs = duration_secs.unwrap_or(self.duration_secs);
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let running = RunningFlag::raise(&self.state);

        debug!("Domain {}: gpio {} on for {:.1}s", self.name, self.actuator_id, secs);
        hw.set(self.actuator_id, true);
        delay.delay_ms(secs_to_ms(secs));
        hw.set(self.actuator_id, false);

        let at = clock.now().minute_stamp();
        running.finish(at);

        Watered {
            domain: self.name.clone(),
            actuator_id: self.actuator_id,
            duration_secs: secs,
            at,
        }
    }

    /// Fire once if `now` is a scheduled minute that hasn't fired yet.
    pub fn maybe_fire<D: DelayNs>(
        &self,
        now: &Timestamp,
        hw: &dyn ActuatorPort,
        clock: &dyn ClockPort,
        delay: &mut D,
    ) -> Option<Watered> {
        self.claim(now).then(|| self.water(None, hw, clock, delay))
    }

    fn state(&self) -> MutexGuard<'_, DomainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn secs_to_ms(secs: f32) -> u32 {
    let ms = (secs * 1000.0).round();
    if ms <= 0.0 {
        0
    } else if ms >= u32::MAX as f32 {
        u32::MAX
    } else {
        ms as u32
    }
}

/// Clears `running` even if the run unwinds.
struct RunningFlag<'a> {
    state: &'a Mutex<DomainState>,
}

impl<'a> RunningFlag<'a> {
    fn raise(state: &'a Mutex<DomainState>) -> Self {
        state.lock().unwrap_or_else(PoisonError::into_inner).running = true;
        Self { state }
    }

    fn finish(self, at: MinuteStamp) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_fired = Some(at);
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).running = false;
    }
}
