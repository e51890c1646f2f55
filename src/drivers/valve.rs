//! Valve driver (logic-level MOSFET on a single GPIO).
//!
//! Plain on/off switch with a configurable active level.  There is no
//! interlock with plunger motion; callers sequence valve and steps.

use embedded_hal::digital::{OutputPin, PinState};

use crate::error::{DriverError, PinRole};

pub struct Valve<O> {
    pin: O,
    active_high: bool,
    open: bool,
}

impl<O: OutputPin> Valve<O> {
    /// Take the output and drive it to the closed level.
    pub fn new(pin: O, active_high: bool) -> Result<Self, DriverError> {
        let mut valve = Self {
            pin,
            active_high,
            open: false,
        };
        valve.drive(false)?;
        Ok(valve)
    }

    pub fn open(&mut self) -> Result<(), DriverError> {
        self.drive(true)
    }

    pub fn close(&mut self) -> Result<(), DriverError> {
        self.drive(false)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn drive(&mut self, open: bool) -> Result<(), DriverError> {
        let level = PinState::from(open == self.active_high);
        self.pin
            .set_state(level)
            .map_err(|e| DriverError::gpio(PinRole::Valve, e))?;
        self.open = open;
        Ok(())
    }
}
