//! Relay / pump output driver.
//!
//! One digital output switching a pump or solenoid valve through a relay
//! module.  Any `embedded_hal::digital::OutputPin` can drive it; the
//! board uses [`GpioPin`], tests use recording pins.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real GPIO via hw_init helpers.
//! On host/test: drives the simulated register in hw_init.

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};
use log::warn;

use crate::drivers::hw_init::{self, HwInitError};

/// Which output level energises the coil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveLevel {
    #[default]
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Released,
    Energised,
}

pub struct RelayDriver<P> {
    pin: P,
    active: ActiveLevel,
    state: RelayState,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Take `pin` and drive it to the released level.
    pub fn new(pin: P, active: ActiveLevel) -> Result<Self, P::Error> {
        let mut relay = Self {
            pin,
            active,
            state: RelayState::Released,
        };
        relay.drive(false)?;
        Ok(relay)
    }

    pub fn energise(&mut self) -> Result<(), P::Error> {
        self.drive(true)?;
        self.state = RelayState::Energised;
        Ok(())
    }

    /// Release the relay.  The state is recorded as released even when
    /// the pin write fails, so a retry is always attempted next time.
    pub fn release(&mut self) -> Result<(), P::Error> {
        self.state = RelayState::Released;
        self.drive(false)
    }

    pub fn set(&mut self, on: bool) -> Result<(), P::Error> {
        if on { self.energise() } else { self.release() }
    }

    fn drive(&mut self, on: bool) -> Result<(), P::Error> {
        let high = on == (self.active == ActiveLevel::High);
        if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_energised(&self) -> bool {
        self.state == RelayState::Energised
    }
}

// ── Raw GPIO pin ──────────────────────────────────────────────

/// Output pin driven through the raw ESP-IDF GPIO API (or the host
/// simulation register).
#[derive(Debug)]
pub struct GpioPin {
    gpio: u8,
}

impl GpioPin {
    /// Configure `gpio` as an output.
    pub fn output(gpio: u8) -> Result<Self, HwInitError> {
        hw_init::configure_output(gpio)?;
        Ok(Self { gpio })
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }
}

/// Driver status from a failed GPIO write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError(pub i32);

impl digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for GpioPin {
    type Error = GpioError;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), GpioError> {
        hw_init::gpio_write(self.gpio, false).map_err(|rc| {
            warn!("Relay: GPIO {} low failed (rc={})", self.gpio, rc);
            GpioError(rc)
        })
    }

    fn set_high(&mut self) -> Result<(), GpioError> {
        hw_init::gpio_write(self.gpio, true).map_err(|rc| {
            warn!("Relay: GPIO {} high failed (rc={})", self.gpio, rc);
            GpioError(rc)
        })
    }
}
