//! Name-keyed channel table, built once at startup.
//!
//! Keys are upper-case so lookups are case-insensitive; iteration follows
//! sorted name order, which is the order `INIT` lists and `HOME ALL` homes.
//! Nothing is inserted or removed after [`ChannelRegistry::build`].

use std::collections::BTreeMap;

use embedded_hal::digital::{InputPin, OutputPin};
use log::info;

use crate::channel::PumpChannel;
use crate::config::{channel_name, ChannelName, SystemConfig};
use crate::drivers::limit_bus::LimitBus;
use crate::error::RegistryError;

pub struct ChannelRegistry<'bus, O, I> {
    channels: BTreeMap<ChannelName, PumpChannel<'bus, O, I>>,
}

impl<'bus, O: OutputPin, I: InputPin> ChannelRegistry<'bus, O, I> {
    /// Validate `config` and construct every enabled channel.
    ///
    /// `make_output` claims one GPIO as an output; it is called three times
    /// per channel (dir, pulse, valve).  Disabled channels claim nothing.
    pub fn build<E>(
        config: &SystemConfig,
        bus: &'bus LimitBus<I>,
        mut make_output: impl FnMut(u8) -> Result<O, E>,
    ) -> Result<Self, RegistryError<E>> {
        config.validate()?;

        let mut channels = BTreeMap::new();
        for entry in &config.channels {
            if !entry.enabled {
                info!("Channel {} disabled, skipped", entry.name);
                continue;
            }

            let settings = entry.resolve(config);
            let mut claim = |pin: u8| {
                make_output(pin).map_err(|source| RegistryError::PinSetup { pin, source })
            };
            let dir = claim(settings.dir_pin)?;
            let pulse = claim(settings.pul_pin)?;
            let valve = claim(settings.valve_pin)?;

            let channel = PumpChannel::new(&settings, dir, pulse, valve, bus)?;
            info!(
                "Channel {} ready (dir={}, pul={}, valve={}, limit_id={}, steps/unit={})",
                settings.name,
                settings.dir_pin,
                settings.pul_pin,
                settings.valve_pin,
                settings.limit_id,
                settings.steps_per_unit,
            );
            channels.insert(settings.name, channel);
        }

        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, name: &str) -> bool {
        channel_name(name).is_some_and(|key| self.channels.contains_key(&key))
    }

    pub fn get(&self, name: &str) -> Option<&PumpChannel<'bus, O, I>> {
        self.channels.get(&channel_name(name)?)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PumpChannel<'bus, O, I>> {
        self.channels.get_mut(&channel_name(name)?)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(|name| name.as_str())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PumpChannel<'bus, O, I>)> {
        self.channels
            .iter_mut()
            .map(|(name, channel)| (name.as_str(), channel))
    }
}
