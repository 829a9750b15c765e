//! Application core: domain logic behind port traits.
//!
//! This module contains the business rules of the controller: the domain
//! model and its per-minute dedupe, the configuration lifecycle, and the
//! terminal command grammar.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod domain;
pub mod events;
pub mod ports;
pub mod processor;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;
