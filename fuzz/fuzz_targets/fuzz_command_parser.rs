//! Fuzz target: `parse_line` + `CommandDispatcher::dispatch`
//!
//! Feeds arbitrary console lines through the parser and the dispatcher
//! on a simulated bench and asserts that every handled line is answered
//! with exactly one `OK`/`ERR` line.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpbank::adapters::sim::{SimBoard, SimClock, SimPinError};
use pumpbank::app::commands::parse_line;
use pumpbank::app::dispatcher::CommandDispatcher;
use pumpbank::app::ports::NullSink;
use pumpbank::app::replies::render;
use pumpbank::channel::registry::ChannelRegistry;
use pumpbank::config::SystemConfig;
use pumpbank::drivers::limit_bus::LimitBus;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_line(line, |name| name.starts_with("CH"));

    // Moves are bounded only by the volume; keep runs short.
    let huge = line
        .split_whitespace()
        .filter_map(|t| t.parse::<f32>().ok())
        .any(|v| v.abs() > 1000.0);
    if huge || line.contains(['\n', '\r']) {
        return;
    }

    let board = SimBoard::new();
    board.force_bus(Some(true));
    let bus = LimitBus::new(board.input(), true, 0);
    let mut config = SystemConfig::default();
    config.default_steps_per_unit = 0.001;
    let Ok(registry) = ChannelRegistry::build(&config, &bus, |pin| {
        Ok::<_, SimPinError>(board.output(pin))
    }) else {
        return;
    };
    let mut dispatcher = CommandDispatcher::new(registry);

    if let Some(result) = dispatcher.dispatch(line, &mut SimClock::new(), &mut NullSink) {
        let reply = render(&result);
        assert!(reply.starts_with("OK ") || reply.starts_with("ERR "));
    }
});
