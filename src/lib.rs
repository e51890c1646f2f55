//! PumpBank firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection.  ESP-IDF-specific code is guarded by
//! `#[cfg(feature = "espidf")]` within each module; host builds get the
//! simulated bench in [`adapters::sim`] instead.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod channel;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
