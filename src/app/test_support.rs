//! In-memory port doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use embedded_hal::delay::DelayNs;

use super::events::AppEvent;
use super::ports::{ActuatorPort, ClockError, ClockPort, EventSink, StorageError, StoragePort};
use super::service::{SystemPorts, WateringSystem};
use crate::history::WateringHistory;
use crate::timestamp::Timestamp;

#[derive(Default)]
pub struct Relay(pub Mutex<Vec<(u8, bool)>>);

impl ActuatorPort for Relay {
    fn set(&self, actuator_id: u8, on: bool) {
        self.0.lock().unwrap().push((actuator_id, on));
    }
}

pub struct Clock(pub Mutex<Timestamp>);

impl ClockPort for Clock {
    fn now(&self) -> Timestamp {
        *self.0.lock().unwrap()
    }
    fn set(&self, ts: &Timestamp) -> Result<(), ClockError> {
        *self.0.lock().unwrap() = *ts;
        Ok(())
    }
}

#[derive(Default)]
pub struct Store {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub read_only: bool,
}

impl StoragePort for Store {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs.lock().unwrap().get(path).cloned().ok_or(StorageError::NotFound)
    }
    fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::IoError);
        }
        self.blobs.lock().unwrap().insert(path.into(), data.to_vec());
        Ok(())
    }
    fn exists(&self, path: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(path)
    }
}

#[derive(Default)]
pub struct Sink(pub Mutex<Vec<AppEvent>>);

impl EventSink for Sink {
    fn emit(&self, event: &AppEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

/// Returns immediately.
#[derive(Clone, Default)]
pub struct NoWait;

impl DelayNs for NoWait {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub struct Rig {
    pub sys: Arc<WateringSystem<NoWait>>,
    pub relay: Arc<Relay>,
    pub store: Arc<Store>,
    pub sink: Arc<Sink>,
    pub clock: Arc<Clock>,
}

/// Sunday 2026-10-18 15:34, matching [`HERBS`].
pub fn sunday_1534() -> Timestamp {
    Timestamp::from_parts(2026, 10, 18, 15, 34).unwrap()
}

pub const HERBS: &str = r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":5,
        "schedule":[{"weekday":"SUN","times":["15:34"]}]},{"name":"succulents","gpio":1,"duration":2}]}"#;

pub fn rig_with(store: Store) -> Rig {
    let relay = Arc::new(Relay::default());
    let store = Arc::new(store);
    let sink = Arc::new(Sink::default());
    let clock = Arc::new(Clock(Mutex::new(sunday_1534())));
    let history = Arc::new(WateringHistory::load(store.clone(), 10));
    let ports = SystemPorts {
        actuators: relay.clone(),
        clock: clock.clone(),
        storage: store.clone(),
        events: sink.clone(),
        history,
    };
    Rig {
        sys: Arc::new(WateringSystem::new(ports, NoWait, "config.json")),
        relay,
        store,
        sink,
        clock,
    }
}

pub fn rig() -> Rig {
    rig_with(Store::default())
}
