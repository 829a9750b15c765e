//! Port traits: the hexagonal boundary between the watering core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WateringSystem (domain)
//! ```
//!
//! Driven adapters (relays, clock, flash store, event sinks) implement
//! these traits.  The [`WateringSystem`](super::service::WateringSystem)
//! holds them behind `Arc<dyn …>`, so the core never touches hardware
//! directly and the same instance can be shared by the scheduler thread
//! and every terminal session.
//!
//! All ports take `&self`: implementations own whatever interior locking
//! their backend needs.

use core::fmt;

use super::domain::Watered;
use crate::timestamp::Timestamp;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: drives one relay / pump output.
pub trait ActuatorPort: Send + Sync {
    /// Energise (`on = true`) or release the output bound to `actuator_id`.
    fn set(&self, actuator_id: u8, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Wall-clock source.  Minute granularity is all the core relies on.
pub trait ClockPort: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Step the clock to `ts`.
    fn set(&self, ts: &Timestamp) -> Result<(), ClockError>;
}

/// Errors from [`ClockPort::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The fields do not form a real calendar date/time.
    InvalidTime,
    /// The backend refused the new value.
    Unsupported,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime => write!(f, "invalid date/time"),
            Self::Unsupported => write!(f, "clock cannot be set"),
        }
    }
}

impl std::error::Error for ClockError {}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ flash filesystem)
// ───────────────────────────────────────────────────────────────

/// Path-keyed blob storage (the configuration document, history, clock
/// snapshots, runtime settings).
///
/// Writes MUST replace the whole object: a reader never observes a
/// half-written document.
pub trait StoragePort: Send + Sync {
    /// Read the whole object stored under `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Replace the object stored under `path`.
    fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    fn exists(&self, path: &str) -> bool;
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested object does not exist.
    NotFound,
    /// Filesystem is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored bytes failed to decode.
    Corrupted,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "corrupted data"),
        }
    }
}

impl std::error::Error for StorageError {}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// test recorder, …).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Fire delegate (decouples schedule evaluation from execution)
// ───────────────────────────────────────────────────────────────

/// A claimed scheduled run, ready to execute.
///
/// By the time a `ScheduledRun` exists its minute has already been
/// claimed on the domain, so re-polling the same minute cannot produce a
/// second one.  Running the job blocks for the watering duration.
pub struct ScheduledRun {
    pub domain: String,
    job: Box<dyn FnOnce() -> Watered + Send>,
}

impl ScheduledRun {
    pub fn new(domain: impl Into<String>, job: impl FnOnce() -> Watered + Send + 'static) -> Self {
        Self {
            domain: domain.into(),
            job: Box::new(job),
        }
    }

    /// Execute the run on the calling thread.
    pub fn run(self) -> Watered {
        (self.job)()
    }
}

impl fmt::Debug for ScheduledRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledRun")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Callback the schedule check invokes for every claimed run.
///
/// The scheduler itself knows nothing about threads: the binary hands it
/// a [`ThreadedFire`](crate::scheduler::ThreadedFire) so a long run
/// never stalls the next poll, tests hand it a recorder or
/// [`InlineFire`](crate::scheduler::InlineFire).
pub trait FireDelegate {
    fn dispatch(&mut self, run: ScheduledRun);
}
