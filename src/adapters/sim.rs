//! Simulated board for host-side tests and bench-less development.
//!
//! [`SimBoard`] hands out [`SimOutput`] / [`SimInput`] pins that share one
//! recorder.  Every output write is logged in order, so a test can count
//! the pulses a channel issued in each DIR level.  The limit bus input is
//! driven by plunger models ([`SimBoard::add_switch`]) that track each
//! plunger's position from its own pulses, by a forced level, or by a
//! script of raw readings consumed first (for bounce).
//!
//! [`SimClock`] implements [`Clock`] without sleeping: it only adds up the
//! requested delays.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin, PinState};

use crate::app::ports::Clock;

/// One recorded output write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: u8,
    pub state: PinState,
}

/// Injected GPIO failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl embedded_hal::digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl core::fmt::Display for SimPinError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "simulated GPIO fault")
    }
}

/// A plunger whose limit switch closes once it has travelled
/// `steps_to_switch` net steps toward home.
#[derive(Debug, Clone, Copy)]
struct SimSwitch {
    pulse_pin: u8,
    dir_pin: u8,
    toward_home: PinState,
    steps_to_switch: i64,
    position: i64,
}

impl SimSwitch {
    fn pressed(&self) -> bool {
        self.position >= self.steps_to_switch
    }
}

#[derive(Debug, Default)]
struct BoardState {
    writes: Vec<PinWrite>,
    levels: HashMap<u8, PinState>,
    failing: HashSet<u8>,
    switches: Vec<SimSwitch>,
    scripted: VecDeque<bool>,
    forced: Option<bool>,
    active_low: bool,
    bus_reads: u32,
}

impl BoardState {
    fn record(&mut self, pin: u8, state: PinState) -> Result<(), SimPinError> {
        if self.failing.contains(&pin) {
            return Err(SimPinError);
        }
        self.writes.push(PinWrite { pin, state });
        self.levels.insert(pin, state);

        if state == PinState::High {
            for sw in self.switches.iter_mut().filter(|sw| sw.pulse_pin == pin) {
                let dir = self.levels.get(&sw.dir_pin).copied().unwrap_or(PinState::Low);
                if dir == sw.toward_home {
                    sw.position += 1;
                } else {
                    sw.position -= 1;
                }
            }
        }
        Ok(())
    }

    /// Logical "any switch pressed".
    fn bus_active(&mut self) -> bool {
        self.bus_reads += 1;
        if let Some(active) = self.scripted.pop_front() {
            return active;
        }
        if let Some(active) = self.forced {
            return active;
        }
        self.switches.iter().any(SimSwitch::pressed)
    }
}

/// Shared recorder behind every simulated pin.
#[derive(Clone)]
pub struct SimBoard {
    state: Rc<RefCell<BoardState>>,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBoard {
    /// Board whose bus is active-low (the default wiring).
    pub fn new() -> Self {
        Self::with_polarity(true)
    }

    pub fn with_polarity(active_low: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(BoardState {
                active_low,
                ..BoardState::default()
            })),
        }
    }

    pub fn output(&self, pin: u8) -> SimOutput {
        SimOutput {
            pin,
            board: Rc::clone(&self.state),
        }
    }

    pub fn input(&self) -> SimInput {
        SimInput {
            board: Rc::clone(&self.state),
        }
    }

    /// Model a plunger `steps_to_switch` steps below its limit switch.
    pub fn add_switch(&self, pulse_pin: u8, dir_pin: u8, toward_home: PinState, steps_to_switch: u32) {
        self.state.borrow_mut().switches.push(SimSwitch {
            pulse_pin,
            dir_pin,
            toward_home,
            steps_to_switch: i64::from(steps_to_switch),
            position: 0,
        });
    }

    /// Net steps toward home the plunger on `pulse_pin` has made.
    pub fn switch_position(&self, pulse_pin: u8) -> Option<i64> {
        self.state
            .borrow()
            .switches
            .iter()
            .find(|sw| sw.pulse_pin == pulse_pin)
            .map(|sw| sw.position)
    }

    /// Hold the bus active (`Some(true)`), released, or hand it back to the
    /// plunger models (`None`).
    pub fn force_bus(&self, active: Option<bool>) {
        self.state.borrow_mut().forced = active;
    }

    /// Queue logical bus readings served before any other source.
    pub fn script_bus(&self, reads: impl IntoIterator<Item = bool>) {
        self.state.borrow_mut().scripted.extend(reads);
    }

    /// Make every later write to `pin` fail.
    pub fn fail_pin(&self, pin: u8) {
        self.state.borrow_mut().failing.insert(pin);
    }

    pub fn writes(&self) -> Vec<PinWrite> {
        self.state.borrow().writes.clone()
    }

    pub fn level(&self, pin: u8) -> Option<PinState> {
        self.state.borrow().levels.get(&pin).copied()
    }

    pub fn bus_reads(&self) -> u32 {
        self.state.borrow().bus_reads
    }

    /// Rising edges on `pulse_pin`, split by the level `dir_pin` held at
    /// the time: `(while LOW, while HIGH)`.
    pub fn pulses(&self, pulse_pin: u8, dir_pin: u8) -> (u32, u32) {
        let state = self.state.borrow();
        let mut dir = PinState::Low;
        let mut counts = (0, 0);
        for w in &state.writes {
            if w.pin == dir_pin {
                dir = w.state;
            } else if w.pin == pulse_pin && w.state == PinState::High {
                match dir {
                    PinState::Low => counts.0 += 1,
                    PinState::High => counts.1 += 1,
                }
            }
        }
        counts
    }
}

/// Recording output pin.
pub struct SimOutput {
    pin: u8,
    board: Rc<RefCell<BoardState>>,
}

impl ErrorType for SimOutput {
    type Error = SimPinError;
}

impl OutputPin for SimOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().record(self.pin, PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().record(self.pin, PinState::High)
    }
}

/// The shared limit bus line, with the board's polarity applied.
pub struct SimInput {
    board: Rc<RefCell<BoardState>>,
}

impl ErrorType for SimInput {
    type Error = SimPinError;
}

impl InputPin for SimInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut board = self.board.borrow_mut();
        let active = board.bus_active();
        Ok(active != board.active_low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Clock that records delays instead of sleeping.
#[derive(Debug, Default)]
pub struct SimClock {
    now_us: u64,
    us_total: u64,
    ms_sleeps: Vec<u32>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of every `delay_us` request.
    pub fn total_us(&self) -> u64 {
        self.us_total
    }

    /// Every `delay_ms` request, in order.
    pub fn ms_sleeps(&self) -> &[u32] {
        &self.ms_sleeps
    }
}

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.now_us += u64::from(ns / 1000);
    }

    fn delay_us(&mut self, us: u32) {
        self.us_total += u64::from(us);
        self.now_us += u64::from(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ms_sleeps.push(ms);
        self.now_us += u64::from(ms) * 1000;
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now_us / 1000
    }
}
