//! Board clock adapter.
//!
//! Implements [`Clock`] for the pump bank.
//!
//! - **`feature = "espidf"`**: `esp_timer_get_time()` for the monotonic
//!   counter, [`Ets`] busy-waits for microsecond delays (step pulses must
//!   not yield to the scheduler), [`FreeRtos`] task delays for
//!   milliseconds.
//! - otherwise: `std::time::Instant` and `std::thread::sleep`, for running
//!   the control loop on a workstation.

use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;

#[cfg(feature = "espidf")]
use esp_idf_hal::delay::{Ets, FreeRtos};

/// Monotonic clock plus blocking delays.
pub struct BoardClock {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl Default for BoardClock {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(feature = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since construction (monotonic).
    #[cfg(not(feature = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

#[cfg(feature = "espidf")]
impl DelayNs for BoardClock {
    fn delay_ns(&mut self, ns: u32) {
        Ets::delay_us(ns.div_ceil(1000));
    }

    fn delay_us(&mut self, us: u32) {
        Ets::delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}

#[cfg(not(feature = "espidf"))]
impl DelayNs for BoardClock {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

impl Clock for BoardClock {
    fn now_ms(&self) -> u64 {
        self.uptime_us() / 1000
    }
}
