//! Mock bench for integration tests.
//!
//! Wraps the simulated board, clock and a recording event sink so tests
//! can drive the dispatcher with protocol lines and then assert on the
//! pulses each channel issued and the events that were emitted.

use embedded_hal::digital::PinState;
use pumpbank::adapters::sim::{SimBoard, SimClock, SimInput, SimOutput, SimPinError};
use pumpbank::app::dispatcher::CommandDispatcher;
use pumpbank::app::events::PumpEvent;
use pumpbank::app::ports::EventSink;
use pumpbank::app::replies::render;
use pumpbank::channel::registry::ChannelRegistry;
use pumpbank::config::{channel_name, ChannelConfig, SystemConfig};
use pumpbank::drivers::limit_bus::LimitBus;

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<PumpEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &PumpEvent) {
        self.events.push(event.clone());
    }
}

// ── Bench ─────────────────────────────────────────────────────

pub type Dispatcher<'b> = CommandDispatcher<'b, SimOutput, SimInput>;

pub struct Bench {
    pub board: SimBoard,
    pub clock: SimClock,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self {
            board: SimBoard::new(),
            clock: SimClock::new(),
            sink: RecordingSink::default(),
        }
    }

    /// The shared bus, wired the default way (active-low, 5 ms debounce).
    pub fn bus(&self) -> LimitBus<SimInput> {
        LimitBus::from_config(self.board.input(), &SystemConfig::default().limit_bus)
    }

    pub fn registry<'b>(
        &self,
        bus: &'b LimitBus<SimInput>,
        config: &SystemConfig,
    ) -> ChannelRegistry<'b, SimOutput, SimInput> {
        ChannelRegistry::build(config, bus, |pin| Ok::<_, SimPinError>(self.board.output(pin)))
            .expect("bench config must build")
    }

    pub fn dispatcher<'b>(&self, bus: &'b LimitBus<SimInput>, config: &SystemConfig) -> Dispatcher<'b> {
        CommandDispatcher::new(self.registry(bus, config))
    }

    /// Send one line; the rendered reply, if any.
    pub fn send(&mut self, dispatcher: &mut Dispatcher<'_>, line: &str) -> Option<String> {
        dispatcher
            .dispatch(line, &mut self.clock, &mut self.sink)
            .map(|result| render(&result))
    }

    /// Model `channel`'s plunger sitting `steps` below its switch.
    pub fn place_switch(&self, config: &SystemConfig, channel: &str, steps: u32) {
        let ch = entry(config, channel);
        let toward_home = PinState::from(ch.dir_up.unwrap_or(config.homing.dir_up) != 0);
        self.board.add_switch(ch.pul_pin, ch.dir_pin, toward_home, steps);
    }

    /// `(toward home, away from home)` pulses issued on `channel`.
    pub fn moves(&self, config: &SystemConfig, channel: &str) -> (u32, u32) {
        let ch = entry(config, channel);
        let (low, high) = self.board.pulses(ch.pul_pin, ch.dir_pin);
        if ch.dir_up.unwrap_or(config.homing.dir_up) == 0 {
            (low, high)
        } else {
            (high, low)
        }
    }
}

fn entry<'c>(config: &'c SystemConfig, channel: &str) -> &'c ChannelConfig {
    config
        .channels
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(channel))
        .unwrap_or_else(|| panic!("{channel} not in bench config"))
}

/// Default five-channel config renamed to `names` (extra entries dropped).
#[allow(dead_code)]
pub fn named_config(names: &[&str]) -> SystemConfig {
    let mut config = SystemConfig::default();
    config.channels.truncate(names.len());
    for (entry, name) in config.channels.iter_mut().zip(names) {
        entry.name = channel_name(name).expect("short name");
    }
    config
}
