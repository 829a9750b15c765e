//! Schedule driver.
//!
//! The [`SchedulerLoop`] polls the clock every few seconds and asks the
//! [`WateringSystem`] which domains are due.  Due runs are claimed
//! synchronously (so re-polling the same minute is harmless) and handed
//! to a [`FireDelegate`], which decides where they execute.
//!
//! ```text
//!   ┌──────────────┐  every poll_interval   ┌──────────────────────┐
//!   │ SchedulerLoop│ ─────── tick() ──────▶ │ WateringSystem       │
//!   └──────────────┘                        │  .check_schedule(now)│
//!                                           └──────────┬───────────┘
//!                                                      │ ScheduledRun (claimed)
//!                                                      ▼
//!                                   ┌────────────────────────────────────┐
//!                                   │ FireDelegate                       │
//!                                   │  InlineFire   → run on this thread │
//!                                   │  ThreadedFire → one thread per run │
//!                                   └────────────────────────────────────┘
//! ```
//!
//! With [`ThreadedFire`] a 60-second run never delays the next poll, so
//! every domain due in the same minute starts in that minute.

use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{FireDelegate, ScheduledRun};
use crate::app::service::WateringSystem;
use crate::drivers::task_pin::{WATER_RUN_TASK, spawn_task};

// ═══════════════════════════════════════════════════════════════
//  Fire delegates
// ═══════════════════════════════════════════════════════════════

/// Runs each claimed fire on the calling thread, one after another.
#[derive(Debug, Default)]
pub struct InlineFire;

impl FireDelegate for InlineFire {
    fn dispatch(&mut self, run: ScheduledRun) {
        let watered = run.run();
        debug!("Scheduler: {watered}");
    }
}

/// Runs each claimed fire on its own thread.
///
/// If a thread cannot be created the run executes inline instead: the
/// minute is already claimed, so dropping it would lose the fire.
#[derive(Debug, Default)]
pub struct ThreadedFire {
    in_flight: Vec<JoinHandle<()>>,
}

impl ThreadedFire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs started and not yet finished.
    pub fn in_flight(&mut self) -> usize {
        self.reap();
        self.in_flight.len()
    }

    /// Block until every dispatched run has finished.
    pub fn join_all(&mut self) {
        for handle in self.in_flight.drain(..) {
            if handle.join().is_err() {
                warn!("Scheduler: a watering run panicked");
            }
        }
    }

    fn reap(&mut self) {
        self.in_flight.retain(|h| !h.is_finished());
    }
}

impl FireDelegate for ThreadedFire {
    fn dispatch(&mut self, run: ScheduledRun) {
        self.reap();
        let domain = run.domain.clone();

        // The closure owns the run; on spawn failure we get neither back,
        // so hand it over through a slot we can reclaim.
        let slot = Arc::new(Mutex::new(Some(run)));
        let worker_slot = Arc::clone(&slot);
        let spawned = spawn_task(WATER_RUN_TASK, move || {
            let taken = worker_slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(run) = taken {
                let watered = run.run();
                debug!("Scheduler: {watered}");
            }
        });

        match spawned {
            Ok(handle) => self.in_flight.push(handle),
            Err(e) => {
                warn!("Scheduler: no thread for \"{domain}\" ({e}), running inline");
                let taken = slot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(run) = taken {
                    run.run();
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler loop
// ═══════════════════════════════════════════════════════════════

/// Periodic driver for [`WateringSystem::check_schedule`].
pub struct SchedulerLoop<D> {
    system: Arc<WateringSystem<D>>,
    poll_interval: Duration,
    ticks: u64,
    dispatched: u64,
}

impl<D> SchedulerLoop<D>
where
    D: DelayNs + Clone + Send + Sync + 'static,
{
    pub fn new(system: Arc<WateringSystem<D>>, poll_interval: Duration) -> Self {
        Self {
            system,
            poll_interval,
            ticks: 0,
            dispatched: 0,
        }
    }

    /// One evaluation against the current clock.  Returns the number of
    /// runs dispatched.
    pub fn tick(&mut self, delegate: &mut dyn FireDelegate) -> usize {
        self.ticks += 1;
        let now = self.system.now();
        let n = self.system.check_schedule(&now, delegate);
        if n > 0 {
            info!("Scheduler: {n} run(s) due at {}", now.minute_stamp());
        }
        self.dispatched += n as u64;
        n
    }

    /// Tick every `poll_interval` until `stop` is set.
    pub fn run_until(&mut self, delegate: &mut dyn FireDelegate, stop: &AtomicBool) {
        info!(
            "Scheduler: polling every {}s",
            self.poll_interval.as_secs_f32()
        );
        while !stop.load(Ordering::Relaxed) {
            self.tick(delegate);
            std::thread::sleep(self.poll_interval);
        }
        info!("Scheduler: stopped after {} tick(s)", self.ticks);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
