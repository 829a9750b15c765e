//! Relay driver, hardware initialisation, and task helpers.

pub mod delay;
pub mod hw_init;
pub mod relay;
pub mod task_pin;
