//! Port traits: the boundary between the pump-bank logic and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ drivers / channels / dispatcher
//! ```
//!
//! GPIO is not re-modelled here: drivers take `embedded-hal` 1.0
//! [`OutputPin`](embedded_hal::digital::OutputPin) and
//! [`InputPin`](embedded_hal::digital::InputPin) directly.  What
//! `embedded-hal` does not cover (a monotonic clock next to the blocking
//! delays, and a place to publish domain events) is defined below.
//!
//! Ports are passed at call sites (`&mut impl Clock`), never stored, so a
//! test can hand every call the same simulated clock and inspect it after.

use embedded_hal::delay::DelayNs;

use crate::config::SystemConfig;
use crate::error::ConfigError;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware timer → domain)
// ───────────────────────────────────────────────────────────────

/// Blocking delays plus a monotonic millisecond counter.
///
/// Step pulses use [`DelayNs::delay_us`], debounce and polling use
/// [`DelayNs::delay_ms`].
pub trait Clock: DelayNs {
    /// Milliseconds since an arbitrary fixed origin. Never goes backwards.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Config port (driven adapter: domain ↔ persistent storage)
// ───────────────────────────────────────────────────────────────

/// Where the startup configuration snapshot comes from.
pub trait ConfigPort {
    /// Stored configuration, or defaults when nothing was saved.
    fn load(&self) -> Result<SystemConfig, ConfigError>;
    /// Validate and persist `config` for the next boot.
    fn save(&mut self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The dispatcher emits structured [`PumpEvent`](super::events::PumpEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::PumpEvent);
}

/// Sink that drops everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &super::events::PumpEvent) {}
}
