//! One syringe channel: stepper-driven plunger, valve, shared limit bus.
//!
//! A [`PumpChannel`] owns its step generator and valve outright and
//! borrows the single [`LimitBus`] that every channel homes against.
//! Volumes are converted to step counts with the channel's calibration;
//! direction is never encoded in a sign, only in which DIR level is used:
//!
//! | Operation   | DIR level         |
//! |-------------|-------------------|
//! | `home` seek | toward home       |
//! | backoff     | away from home    |
//! | `aspirate`  | away from home    |
//! | `dispense`  | toward home       |

pub mod homing;
pub mod registry;

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use log::{error, info, warn};

use crate::app::ports::Clock;
use crate::config::{ChannelName, ChannelSettings, HomingConfig, PressedAtStart, PulseConfig};
use crate::drivers::limit_bus::LimitBus;
use crate::drivers::stepper::StepPulseGenerator;
use crate::drivers::valve::Valve;
use crate::error::DriverError;

pub use homing::{HomingFailure, HomingOutcome, HomingState};

/// A requested pulse half-period outside the configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedOutOfRange {
    pub min_us: u32,
    pub max_us: u32,
}

pub struct PumpChannel<'bus, O, I> {
    name: ChannelName,
    limit_id: u8,
    steps_per_unit: f32,
    toward_home: PinState,
    away_from_home: PinState,
    homing: HomingConfig,
    pulse: PulseConfig,
    stepper: StepPulseGenerator<O>,
    valve: Valve<O>,
    bus: &'bus LimitBus<I>,
    state: HomingState,
}

impl<'bus, O: OutputPin, I: InputPin> PumpChannel<'bus, O, I> {
    /// Claim the channel's outputs and drive them to their idle levels.
    ///
    /// `settings` must come from a validated configuration.
    pub fn new(
        settings: &ChannelSettings,
        dir: O,
        pulse: O,
        valve: O,
        bus: &'bus LimitBus<I>,
    ) -> Result<Self, DriverError> {
        debug_assert_ne!(settings.toward_home, settings.away_from_home);
        let stepper = StepPulseGenerator::new(
            dir,
            pulse,
            settings.pulse.default_half_period_us,
            settings.pulse.dir_settle_us,
        )?;
        let valve = Valve::new(valve, settings.valve_active_high)?;

        Ok(Self {
            name: settings.name.clone(),
            limit_id: settings.limit_id,
            steps_per_unit: settings.steps_per_unit,
            toward_home: settings.toward_home,
            away_from_home: settings.away_from_home,
            homing: settings.homing,
            pulse: settings.pulse,
            stepper,
            valve,
            bus,
            state: HomingState::Unhomed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit_id(&self) -> u8 {
        self.limit_id
    }

    pub fn steps_per_unit(&self) -> f32 {
        self.steps_per_unit
    }

    pub fn state(&self) -> HomingState {
        self.state
    }

    pub fn is_homed(&self) -> bool {
        self.state == HomingState::Homed
    }

    pub fn is_valve_open(&self) -> bool {
        self.valve.is_open()
    }

    /// Current sticky pulse half-period.
    pub fn speed_us(&self) -> u32 {
        self.stepper.default_half_period_us()
    }

    // ── Valve ─────────────────────────────────────────────────

    pub fn open_valve(&mut self) -> Result<(), DriverError> {
        self.valve.open()
    }

    pub fn close_valve(&mut self) -> Result<(), DriverError> {
        self.valve.close()
    }

    // ── Speed ─────────────────────────────────────────────────

    /// Set the pulse half-period used by every later move.
    pub fn set_speed(&mut self, half_period_us: u32) -> Result<(), SpeedOutOfRange> {
        let (min_us, max_us) = (self.pulse.min_half_period_us, self.pulse.max_half_period_us);
        if !(min_us..=max_us).contains(&half_period_us) {
            return Err(SpeedOutOfRange { min_us, max_us });
        }
        self.stepper.set_default_half_period_us(half_period_us);
        info!("{}: speed set to {} us half-period", self.name, half_period_us);
        Ok(())
    }

    // ── Homing ────────────────────────────────────────────────

    /// Drive the plunger up to the shared limit bus and back off.
    ///
    /// A GPIO fault mid-sequence leaves the channel `HomingFailed`.
    pub fn home(&mut self, clock: &mut impl Clock) -> Result<HomingOutcome, DriverError> {
        info!("Homing: {}", self.name);
        self.state = HomingState::Homing;

        let result = self.seek_home(clock);
        self.state = match &result {
            Ok(outcome) if outcome.is_success() => HomingState::Homed,
            _ => HomingState::HomingFailed,
        };
        result
    }

    fn seek_home(&mut self, clock: &mut impl Clock) -> Result<HomingOutcome, DriverError> {
        let HomingConfig {
            max_steps,
            backoff_steps,
            half_period_us,
            pressed_at_start,
            ..
        } = self.homing;

        // The bus is shared: "pressed" here may be any channel's switch.
        let started_pressed = self.bus.is_pressed(true, clock)?;
        if started_pressed {
            warn!("{}: limit bus already active at start of homing", self.name);
            if pressed_at_start == PressedAtStart::BackOffFirst {
                self.stepper.step_with_half_period(
                    self.away_from_home,
                    backoff_steps,
                    half_period_us,
                    clock,
                )?;
            }
        }

        // Undebounced on purpose: this runs once per step.
        let mut seek_steps: u32 = 0;
        while !self.bus.is_pressed(false, clock)? {
            self.stepper
                .step_with_half_period(self.toward_home, 1, half_period_us, clock)?;
            seek_steps += 1;

            if seek_steps >= max_steps {
                error!(
                    "{}: homing max steps ({}) reached without hitting limit",
                    self.name, max_steps
                );
                return Ok(HomingOutcome::Failed {
                    reason: HomingFailure::TravelLimitExceeded,
                    seek_steps,
                });
            }
        }

        if !self.bus.is_pressed(true, clock)? {
            error!("{}: limit signal not stable during homing", self.name);
            return Ok(HomingOutcome::Failed {
                reason: HomingFailure::UnconfirmedTrigger,
                seek_steps,
            });
        }

        // Relieve the switch pre-load.
        self.stepper
            .step_with_half_period(self.away_from_home, backoff_steps, half_period_us, clock)?;

        info!("Homing OK for {} - steps taken: {}", self.name, seek_steps);
        Ok(HomingOutcome::Homed {
            seek_steps,
            started_pressed,
        })
    }

    // ── Volume-based moves ────────────────────────────────────

    /// `round(|volume| × steps_per_unit)`, with exact halves rounded to
    /// the even step count (`90.5` → 90, `271.5` → 272).
    ///
    /// The cast saturates: a product above `u32::MAX` yields `u32::MAX`
    /// steps, and the move that follows blocks for that whole count.
    pub fn volume_to_steps(&self, volume: f32) -> u32 {
        (volume * self.steps_per_unit).abs().round_ties_even() as u32
    }

    /// Pull the plunger away from home. Returns the steps issued.
    ///
    /// Non-positive or non-finite volumes are a no-op returning 0.
    pub fn aspirate(&mut self, volume: f32, clock: &mut impl Clock) -> Result<u32, DriverError> {
        self.move_volume("Aspirate", self.away_from_home, volume, clock)
    }

    /// Push the plunger toward home. Returns the steps issued.
    ///
    /// Non-positive or non-finite volumes are a no-op returning 0.
    pub fn dispense(&mut self, volume: f32, clock: &mut impl Clock) -> Result<u32, DriverError> {
        self.move_volume("Dispense", self.toward_home, volume, clock)
    }

    fn move_volume(
        &mut self,
        label: &str,
        direction: PinState,
        volume: f32,
        clock: &mut impl Clock,
    ) -> Result<u32, DriverError> {
        if !volume.is_finite() || volume <= 0.0 {
            return Ok(0);
        }
        let steps = self.volume_to_steps(volume);
        if self.state != HomingState::Homed {
            // Position is unknown; motion is still allowed.
            warn!("{}: {} on unhomed channel", self.name, label);
        }
        info!("{}: {} volume={} steps={}", label, self.name, volume, steps);
        self.stepper.step(direction, steps, clock)?;
        Ok(steps)
    }
}
