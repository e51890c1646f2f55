//! Shared limit-switch bus.
//!
//! Physically one GPIO wired to every plunger's top limit switch.  This
//! driver only answers "is ANY switch pressed?"; it cannot tell which
//! channel closed the line, and no channel may reconfigure it.
//!
//! ## Debounce
//!
//! [`LimitBus::is_pressed`] with `debounce = true` is deliberately
//! asymmetric: an inactive first read returns `false` at once, an active
//! first read is confirmed by a second read `debounce_ms` later.  Polling
//! the idle bus therefore costs nothing, while a bouncing trigger edge is
//! still rejected.
//!
//! ## Sharing
//!
//! Channels hold `&LimitBus`.  `embedded-hal` reads take `&mut self`, so
//! the input sits in a `RefCell`; the firmware is single-threaded and a
//! read never re-enters, so the borrow cannot conflict.

use core::cell::RefCell;

use embedded_hal::digital::InputPin;
use log::debug;

use crate::app::ports::Clock;
use crate::config::LimitBusConfig;
use crate::error::{DriverError, PinRole};

pub struct LimitBus<I> {
    input: RefCell<I>,
    active_low: bool,
    debounce_ms: u32,
}

impl<I: InputPin> LimitBus<I> {
    pub fn new(input: I, active_low: bool, debounce_ms: u32) -> Self {
        Self {
            input: RefCell::new(input),
            active_low,
            debounce_ms,
        }
    }

    pub fn from_config(input: I, config: &LimitBusConfig) -> Self {
        Self::new(input, config.active_low, config.debounce_ms)
    }

    pub fn active_low(&self) -> bool {
        self.active_low
    }

    pub fn debounce_ms(&self) -> u32 {
        self.debounce_ms
    }

    /// One instantaneous, polarity-corrected read. No debounce.
    pub fn raw_active(&self) -> Result<bool, DriverError> {
        let mut input = self.input.borrow_mut();
        let active = if self.active_low {
            input.is_low()
        } else {
            input.is_high()
        };
        active.map_err(|e| DriverError::gpio(PinRole::LimitBus, e))
    }

    /// True if any switch on the bus is pressed.
    pub fn is_pressed(&self, debounce: bool, clock: &mut impl Clock) -> Result<bool, DriverError> {
        if !debounce {
            return self.raw_active();
        }
        if !self.raw_active()? {
            return Ok(false);
        }

        clock.delay_ms(self.debounce_ms);
        let confirmed = self.raw_active()?;
        if !confirmed {
            debug!("limit bus: trigger rejected as bounce");
        }
        Ok(confirmed)
    }

    /// Block until the bus reads pressed. `false` if `timeout_ms` ran out.
    pub fn wait_until_pressed(
        &self,
        timeout_ms: Option<u32>,
        poll_ms: u32,
        debounce: bool,
        clock: &mut impl Clock,
    ) -> Result<bool, DriverError> {
        self.wait_for(true, timeout_ms, poll_ms, debounce, clock)
    }

    /// Block until the bus reads released. `false` if `timeout_ms` ran out.
    pub fn wait_until_released(
        &self,
        timeout_ms: Option<u32>,
        poll_ms: u32,
        debounce: bool,
        clock: &mut impl Clock,
    ) -> Result<bool, DriverError> {
        self.wait_for(false, timeout_ms, poll_ms, debounce, clock)
    }

    fn wait_for(
        &self,
        pressed: bool,
        timeout_ms: Option<u32>,
        poll_ms: u32,
        debounce: bool,
        clock: &mut impl Clock,
    ) -> Result<bool, DriverError> {
        let start = clock.now_ms();
        loop {
            if self.is_pressed(debounce, clock)? == pressed {
                return Ok(true);
            }
            if let Some(timeout) = timeout_ms {
                if clock.now_ms().saturating_sub(start) >= u64::from(timeout) {
                    return Ok(false);
                }
            }
            clock.delay_ms(poll_ms);
        }
    }
}
