//! Hardware adapter: bridges relay outputs to the [`ActuatorPort`].
//!
//! Actuator ids come from the configuration document and may change on
//! every `update_config`, so relays are created on first use through a
//! pin factory and kept for the life of the process.  A pin that fails to
//! initialise is logged and retried on the next `set`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use embedded_hal::digital::OutputPin;
use log::{error, warn};

use crate::app::ports::ActuatorPort;
use crate::drivers::relay::{ActiveLevel, RelayDriver};

/// Lazily-populated bank of relays keyed by actuator id.
pub struct RelayBank<P, F> {
    relays: Mutex<BTreeMap<u8, RelayDriver<P>>>,
    make_pin: F,
    active: ActiveLevel,
}

impl<P, F, E> RelayBank<P, F>
where
    P: OutputPin,
    F: Fn(u8) -> Result<P, E>,
    E: fmt::Display,
{
    pub fn new(make_pin: F, active: ActiveLevel) -> Self {
        Self {
            relays: Mutex::new(BTreeMap::new()),
            make_pin,
            active,
        }
    }

    /// Ids with an initialised relay.
    pub fn initialised(&self) -> Vec<u8> {
        self.relays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    pub fn is_on(&self, actuator_id: u8) -> bool {
        self.relays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&actuator_id)
            .is_some_and(RelayDriver::is_energised)
    }

}

impl<P, F, E> RelayBank<P, F>
where
    P: OutputPin + Send,
    F: Fn(u8) -> Result<P, E> + Send + Sync,
    E: fmt::Display,
{
    /// Drive each listed relay to its released level, initialising any
    /// not yet in use.  Run at boot so configured outputs don't float
    /// until their first watering.
    pub fn release_all(&self, ids: impl IntoIterator<Item = u8>) {
        for id in ids {
            self.set(id, false);
        }
    }
}

impl<P, F, E> ActuatorPort for RelayBank<P, F>
where
    P: OutputPin + Send,
    F: Fn(u8) -> Result<P, E> + Send + Sync,
    E: fmt::Display,
{
    fn set(&self, actuator_id: u8, on: bool) {
        let mut relays = self.relays.lock().unwrap_or_else(PoisonError::into_inner);
        if !relays.contains_key(&actuator_id) {
            let pin = match (self.make_pin)(actuator_id) {
                Ok(pin) => pin,
                Err(e) => {
                    error!("Relay: actuator {actuator_id} unavailable: {e}");
                    return;
                }
            };
            match RelayDriver::new(pin, self.active) {
                Ok(relay) => {
                    relays.insert(actuator_id, relay);
                }
                Err(_) => {
                    error!("Relay: actuator {actuator_id} failed to initialise");
                    return;
                }
            }
        }
        if let Some(relay) = relays.get_mut(&actuator_id) {
            if relay.set(on).is_err() {
                warn!(
                    "Relay: actuator {actuator_id} failed to switch {}",
                    if on { "on" } else { "off" }
                );
            }
        }
    }
}
