//! Fuzz target: `SystemConfig::from_json`
//!
//! Arbitrary bytes must either be rejected or produce a configuration
//! that passes validation and builds a registry on the simulated board.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpbank::adapters::sim::{SimBoard, SimPinError};
use pumpbank::channel::registry::ChannelRegistry;
use pumpbank::config::SystemConfig;
use pumpbank::drivers::limit_bus::LimitBus;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = SystemConfig::from_json(text) else {
        return;
    };
    assert!(config.validate().is_ok());

    let board = SimBoard::new();
    let bus = LimitBus::from_config(board.input(), &config.limit_bus);
    let registry = ChannelRegistry::build(&config, &bus, |pin| {
        Ok::<_, SimPinError>(board.output(pin))
    });
    assert!(registry.is_ok(), "validated config must build");
});
