//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real GPIO registers, and flags any overlap
//! of two runs on one actuator.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use irrigation::{
    ActuatorPort, AppEvent, ClockError, ClockPort, EventSink, StorageError, StoragePort,
    SystemPorts, Timestamp, WateringHistory, WateringSystem,
};

// ── Actuator ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRelays {
    pub calls: Mutex<Vec<(u8, bool)>>,
    energised: Mutex<BTreeSet<u8>>,
    /// Set when an actuator is switched on while already on.
    pub overlap: AtomicBool,
}

impl MockRelays {
    pub fn calls(&self) -> Vec<(u8, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn any_on(&self) -> bool {
        !self.energised.lock().unwrap().is_empty()
    }

    pub fn overlapped(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }
}

impl ActuatorPort for MockRelays {
    fn set(&self, actuator_id: u8, on: bool) {
        let mut energised = self.energised.lock().unwrap();
        if on && !energised.insert(actuator_id) {
            self.overlap.store(true, Ordering::SeqCst);
        }
        if !on {
            energised.remove(&actuator_id);
        }
        self.calls.lock().unwrap().push((actuator_id, on));
    }
}

// ── Clock ─────────────────────────────────────────────────────

pub struct ManualClock(pub Mutex<Timestamp>);

impl ManualClock {
    pub fn at(y: u16, mo: u8, d: u8, h: u8, mi: u8) -> Self {
        Self(Mutex::new(Timestamp::from_parts(y, mo, d, h, mi).unwrap()))
    }

    pub fn set_to(&self, y: u16, mo: u8, d: u8, h: u8, mi: u8) {
        *self.0.lock().unwrap() = Timestamp::from_parts(y, mo, d, h, mi).unwrap();
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> Timestamp {
        *self.0.lock().unwrap()
    }

    fn set(&self, ts: &Timestamp) -> Result<(), ClockError> {
        ts.to_datetime().ok_or(ClockError::InvalidTime)?;
        *self.0.lock().unwrap() = *ts;
        Ok(())
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_writes: AtomicBool,
}

impl MemStore {
    pub fn with(path: &str, data: &str) -> Self {
        let s = Self::default();
        s.blobs.lock().unwrap().insert(path.into(), data.as_bytes().to_vec());
        s
    }

    pub fn text(&self, path: &str) -> Option<String> {
        self.blobs
            .lock()
            .unwrap()
            .get(path)
            .map(|b| String::from_utf8(b.clone()).unwrap())
    }
}

impl StoragePort for MemStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs.lock().unwrap().get(path).cloned().ok_or(StorageError::NotFound)
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Full);
        }
        self.blobs.lock().unwrap().insert(path.into(), data.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(path)
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink(pub Mutex<Vec<AppEvent>>);

impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AppEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Sleeps one real microsecond per requested millisecond, so a 5 s run
/// takes 5 ms and concurrency is still observable.  Totals every request.
#[derive(Clone, Default)]
pub struct ScaledDelay {
    pub requested_ms: Arc<AtomicU64>,
}

impl ScaledDelay {
    pub fn total_ms(&self) -> u64 {
        self.requested_ms.load(Ordering::SeqCst)
    }
}

impl DelayNs for ScaledDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.requested_ms.fetch_add(u64::from(ms), Ordering::SeqCst);
        std::thread::sleep(Duration::from_micros(u64::from(ms)));
    }
}

// ── Harness ───────────────────────────────────────────────────

pub const CONFIG_PATH: &str = "config.json";

pub const HERBS_ONLY: &str = r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":5}]}"#;

pub const HERBS_AND_SUCCULENTS: &str = r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":5},{"name":"succulents","gpio":1,"duration":2}]}"#;

/// `herbs` fires Sundays at 15:34 and 15:36, `succulents` on Mondays.
pub const SCHEDULED: &str = r#"{"name":"Garden","domains":[
  {"name":"herbs","gpio":0,"duration":5,
   "schedule":[{"weekday":"SUN","times":["15:34","15:36"]}]},
  {"name":"succulents","gpio":1,"duration":2,
   "schedule":[{"weekday":"MON","times":["06:00"]}]}]}"#;

pub struct Harness {
    pub system: Arc<WateringSystem<ScaledDelay>>,
    pub relays: Arc<MockRelays>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemStore>,
    pub sink: Arc<RecordingSink>,
    pub delay: ScaledDelay,
}

/// Sunday 2026-10-18 15:34.
pub fn harness_with(store: MemStore) -> Harness {
    let relays = Arc::new(MockRelays::default());
    let clock = Arc::new(ManualClock::at(2026, 10, 18, 15, 34));
    let store = Arc::new(store);
    let sink = Arc::new(RecordingSink::default());
    let delay = ScaledDelay::default();
    let history = Arc::new(WateringHistory::load(store.clone(), 10));
    let ports = SystemPorts {
        actuators: relays.clone(),
        clock: clock.clone(),
        storage: store.clone(),
        events: sink.clone(),
        history,
    };
    Harness {
        system: Arc::new(WateringSystem::new(ports, delay.clone(), CONFIG_PATH)),
        relays,
        clock,
        store,
        sink,
        delay,
    }
}

pub fn harness() -> Harness {
    harness_with(MemStore::default())
}

pub fn configured(doc: &str) -> Harness {
    let h = harness();
    h.system.load_or_replace(doc).unwrap();
    h
}
