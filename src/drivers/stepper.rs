//! Step/direction pulse generator for one TB6600-style stepper driver.
//!
//! Knows how to set the DIR line and emit a train of symmetric pulses on
//! PUL.  It does not know what "up" or "down" means physically, how many
//! steps make a millilitre, or anything about homing.  The
//! [`PumpChannel`](crate::channel::PumpChannel) decides all of that.
//!
//! One step = PUL HIGH for `half_period_us`, then PUL LOW for
//! `half_period_us`.  Every call blocks for
//! `settle + count × 2 × half_period_us` microseconds.

use embedded_hal::digital::{OutputPin, PinState};

use crate::app::ports::Clock;
use crate::error::{DriverError, PinRole};

pub struct StepPulseGenerator<O> {
    dir: O,
    pulse: O,
    /// Sticky speed: applies to every `step` until changed again.
    default_half_period_us: u32,
    dir_settle_us: u32,
}

impl<O: OutputPin> StepPulseGenerator<O> {
    /// Take ownership of the DIR and PUL outputs and drive both LOW.
    pub fn new(
        mut dir: O,
        mut pulse: O,
        default_half_period_us: u32,
        dir_settle_us: u32,
    ) -> Result<Self, DriverError> {
        dir.set_low().map_err(|e| DriverError::gpio(PinRole::Direction, e))?;
        pulse.set_low().map_err(|e| DriverError::gpio(PinRole::Pulse, e))?;
        Ok(Self {
            dir,
            pulse,
            default_half_period_us,
            dir_settle_us,
        })
    }

    pub fn default_half_period_us(&self) -> u32 {
        self.default_half_period_us
    }

    /// Change the speed used by subsequent [`step`](Self::step) calls.
    pub fn set_default_half_period_us(&mut self, half_period_us: u32) {
        self.default_half_period_us = half_period_us;
    }

    /// Issue `count` steps at the sticky default speed.
    pub fn step(
        &mut self,
        direction: PinState,
        count: u32,
        clock: &mut impl Clock,
    ) -> Result<(), DriverError> {
        self.step_with_half_period(direction, count, self.default_half_period_us, clock)
    }

    /// Issue `count` steps with a one-off half-period.
    ///
    /// `count == 0` returns immediately without touching any pin.
    /// Steps already issued are not undone if a later pin write fails.
    pub fn step_with_half_period(
        &mut self,
        direction: PinState,
        count: u32,
        half_period_us: u32,
        clock: &mut impl Clock,
    ) -> Result<(), DriverError> {
        if count == 0 {
            return Ok(());
        }

        self.dir
            .set_state(direction)
            .map_err(|e| DriverError::gpio(PinRole::Direction, e))?;
        clock.delay_us(self.dir_settle_us);

        for _ in 0..count {
            self.pulse
                .set_high()
                .map_err(|e| DriverError::gpio(PinRole::Pulse, e))?;
            clock.delay_us(half_period_us);

            self.pulse
                .set_low()
                .map_err(|e| DriverError::gpio(PinRole::Pulse, e))?;
            clock.delay_us(half_period_us);
        }
        Ok(())
    }
}
