//! Protocol-level scenarios run against the simulated bench.

use pumpbank::app::commands::MoveAction;
use pumpbank::app::events::PumpEvent;
use pumpbank::channel::{HomingFailure, HomingState};
use pumpbank::config::SystemConfig;

use crate::mock_hw::{named_config, Bench};

fn reply(bench: &mut Bench, d: &mut crate::mock_hw::Dispatcher<'_>, line: &str) -> String {
    bench.send(d, line).expect("line should be answered")
}

// ── Moves ─────────────────────────────────────────────────────

#[test]
fn aspirate_issues_calibrated_steps_away_from_home() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "CH1 ASP 2.5"), "OK CH1 ASP 2.5");
    assert_eq!(bench.moves(&config, "CH1"), (0, 905));
    assert!(bench.sink.events.contains(&PumpEvent::Moved {
        channel: "CH1".into(),
        action: MoveAction::Aspirate,
        volume: 2.5,
        steps: 905,
    }));
}

#[test]
fn dispense_moves_toward_home_and_echoes_token() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "ch2 disp 1.000"), "OK CH2 DISP 1.000");
    assert_eq!(bench.moves(&config, "CH2"), (362, 0));
}

#[test]
fn calibration_override_applies_per_channel() {
    let mut bench = Bench::new();
    let mut config = SystemConfig::default();
    config.channels[2].steps_per_unit = Some(100.0);
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    reply(&mut bench, &mut d, "CH3 ASP 2");
    assert_eq!(bench.moves(&config, "CH3"), (0, 200));
}

#[test]
fn inverted_direction_convention_swaps_levels() {
    let mut bench = Bench::new();
    let mut config = SystemConfig::default();
    config.channels[0].dir_up = Some(1);
    config.channels[0].dir_down = Some(0);
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    reply(&mut bench, &mut d, "CH1 ASP 1");
    // Away from home is now LOW.
    assert_eq!(bench.board.pulses(6, 28), (362, 0));
    assert_eq!(bench.moves(&config, "CH1"), (0, 362));
}

#[test]
fn bad_volumes_move_nothing() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    for line in ["CH1 ASP 0", "CH1 ASP -1", "CH1 DISP abc", "CH1 DISP"] {
        assert_eq!(reply(&mut bench, &mut d, line), "ERR CH1 BAD_VOLUME", "{line}");
    }
    assert_eq!(bench.moves(&config, "CH1"), (0, 0));
}

// ── Lookup and routing ────────────────────────────────────────

#[test]
fn unknown_channel_is_not_found() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);
    let idle = bench.board.writes().len();

    assert_eq!(reply(&mut bench, &mut d, "CH9 HOME"), "ERR CH9 NOT_FOUND");
    assert_eq!(reply(&mut bench, &mut d, "CH9 ASP 1"), "ERR CH9 NOT_FOUND");
    assert_eq!(bench.board.writes().len(), idle);
}

#[test]
fn disabled_channel_is_not_found() {
    let mut bench = Bench::new();
    let mut config = SystemConfig::default();
    config.channels[3].enabled = false;
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "INIT"), "OK INIT CH1 CH2 CH3 CH5");
    assert_eq!(reply(&mut bench, &mut d, "CH4 INIT"), "ERR CH4 NOT_FOUND");
}

#[test]
fn shape_errors_and_unknown_lines() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "INIT CH1"), "ERR INIT BAD_FORMAT");
    assert_eq!(reply(&mut bench, &mut d, "HOME"), "ERR HOME BAD_FORMAT");
    assert_eq!(reply(&mut bench, &mut d, "CH1 ASP 1 2"), "ERR MOVE BAD_FORMAT");
    assert_eq!(reply(&mut bench, &mut d, "mix it"), "ERR UNKNOWN_CMD \"mix it\"");
    assert_eq!(bench.send(&mut d, "# just a note"), None);

    let rejected = bench
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, PumpEvent::CommandRejected { .. }))
        .count();
    assert_eq!(rejected, 4);
}

// ── PUMP SOLUTION ─────────────────────────────────────────────

#[test]
fn pump_solution_skips_non_positive_slots() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(
        reply(&mut bench, &mut d, "PUMP SOLUTION 1 0 2 -1 3"),
        "OK PUMP SOLUTION"
    );
    assert_eq!(bench.moves(&config, "CH1"), (362, 0));
    assert_eq!(bench.moves(&config, "CH2"), (0, 0));
    assert_eq!(bench.moves(&config, "CH3"), (724, 0));
    assert_eq!(bench.moves(&config, "CH4"), (0, 0));
    assert_eq!(bench.moves(&config, "CH5"), (1086, 0));
}

#[test]
fn pump_solution_needs_exactly_five_volumes() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);
    let idle = bench.board.writes().len();

    assert_eq!(
        reply(&mut bench, &mut d, "PUMP SOLUTION 1 2 3 4"),
        "ERR PUMP EXPECT_5_VOLUMES"
    );
    assert_eq!(
        reply(&mut bench, &mut d, "PUMP SOLUTION 1 2 x 4 5"),
        "ERR PUMP BAD_VOLUME"
    );
    assert_eq!(bench.board.writes().len(), idle);
}

#[test]
fn pump_solution_skips_absent_channels() {
    let mut bench = Bench::new();
    let mut config = SystemConfig::default();
    config.channels[1].enabled = false;
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(
        reply(&mut bench, &mut d, "PUMP SOLUTION 1 1 1 1 1"),
        "OK PUMP SOLUTION"
    );
    assert_eq!(bench.moves(&config, "CH2"), (0, 0));
    assert_eq!(bench.moves(&config, "CH1"), (362, 0));
    assert_eq!(bench.moves(&config, "CH5"), (362, 0));
}

// ── Homing ────────────────────────────────────────────────────

#[test]
fn home_all_stops_at_first_failure() {
    let mut bench = Bench::new();
    let mut config = named_config(&["C", "A", "B"]);
    config.homing.max_steps = 200;
    bench.place_switch(&config, "A", 10);
    bench.place_switch(&config, "C", 30);
    // B has no reachable switch.
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "HOME ALL"), "ERR B HOME_FAILED");

    let state = |name: &str| d.registry().get(name).map(|c| c.state());
    assert_eq!(state("A"), Some(HomingState::Homed));
    assert_eq!(state("B"), Some(HomingState::HomingFailed));
    assert_eq!(state("C"), Some(HomingState::Unhomed));
    assert_eq!(bench.moves(&config, "A"), (10, 50));
    assert_eq!(bench.moves(&config, "B"), (200, 0));
    assert_eq!(bench.moves(&config, "C"), (0, 0));

    assert!(bench.sink.events.contains(&PumpEvent::HomingFailed {
        channel: "B".into(),
        reason: Some(HomingFailure::TravelLimitExceeded),
    }));
    assert!(!bench
        .sink
        .events
        .iter()
        .any(|e| matches!(e, PumpEvent::HomingStarted { channel } if channel == "C")));
}

#[test]
fn home_all_succeeds_in_sorted_order() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    for (i, name) in ["CH1", "CH2", "CH3", "CH4", "CH5"].iter().enumerate() {
        bench.place_switch(&config, name, 20 + i as u32);
    }
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "HOME ALL"), "OK HOME ALL");
    let started: Vec<&str> = bench
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            PumpEvent::HomingStarted { channel } => Some(channel.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(started, ["CH1", "CH2", "CH3", "CH4", "CH5"]);
    for name in ["CH1", "CH2", "CH3", "CH4", "CH5"] {
        assert_eq!(reply(&mut bench, &mut d, &format!("{name} STATUS")), format!("OK {name} STATUS HOMED"));
    }
}

#[test]
fn single_channel_home_reports_failure() {
    let mut bench = Bench::new();
    let mut config = SystemConfig::default();
    config.homing.max_steps = 50;
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "CH3 HOME"), "ERR CH3 HOME_FAILED");
    assert_eq!(reply(&mut bench, &mut d, "CH3 STATUS"), "OK CH3 STATUS HOMING_FAILED");
    // Motion is still permitted on an unhomed channel.
    assert_eq!(reply(&mut bench, &mut d, "CH3 DISP 0.5"), "OK CH3 DISP 0.5");
}

#[test]
fn shared_bus_cannot_tell_which_switch_closed() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    // CH1's plunger rests on its switch and holds the whole bus active.
    bench.place_switch(&config, "CH1", 0);
    bench.place_switch(&config, "CH2", 500);
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "CH2 HOME"), "OK CH2 HOME");
    assert_eq!(bench.moves(&config, "CH2"), (0, 50));
    assert!(bench.sink.events.contains(&PumpEvent::Homed {
        channel: "CH2".into(),
        seek_steps: 0,
        started_pressed: true,
    }));
}

#[test]
fn homing_bounce_is_a_failure() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);
    // entry check, one idle poll, trip, inactive confirmation
    bench.board.script_bus([false, false, true, false]);

    assert_eq!(reply(&mut bench, &mut d, "CH1 HOME"), "ERR CH1 HOME_FAILED");
    assert!(bench.sink.events.contains(&PumpEvent::HomingFailed {
        channel: "CH1".into(),
        reason: Some(HomingFailure::UnconfirmedTrigger),
    }));
}

// ── Auxiliary verbs ───────────────────────────────────────────

#[test]
fn speed_changes_pulse_timing() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    reply(&mut bench, &mut d, "CH1 DISP 1");
    let default_us = bench.clock.total_us();
    // settle + 362 × 2 × 1000 us
    assert_eq!(default_us, 50 + 362 * 2 * 1000);

    assert_eq!(reply(&mut bench, &mut d, "CH1 SPEED 500"), "OK CH1 SPEED 500");
    reply(&mut bench, &mut d, "CH1 DISP 1");
    assert_eq!(bench.clock.total_us() - default_us, 50 + 362 * 2 * 500);
    assert_eq!(reply(&mut bench, &mut d, "CH1 SPEED 5000"), "ERR CH1 BAD_SPEED");
}

#[test]
fn valve_verbs() {
    let mut bench = Bench::new();
    let mut config = SystemConfig::default();
    config.channels[4].valve_active_high = false;
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, &config);

    assert_eq!(reply(&mut bench, &mut d, "CH5 VALVE OPEN"), "OK CH5 VALVE OPEN");
    assert_eq!(bench.board.level(4), Some(embedded_hal::digital::PinState::Low));
    assert_eq!(reply(&mut bench, &mut d, "CH5 VALVE FLUSH"), "ERR CH5 UNKNOWN_ACTION");
    assert_eq!(reply(&mut bench, &mut d, "CH5 VALVE CLOSE"), "OK CH5 VALVE CLOSE");
    assert_eq!(bench.board.level(4), Some(embedded_hal::digital::PinState::High));
}
