//! Bench self-test against the simulated board.

use pumpbank::app::self_test::{self, Verdict, STEP_PAUSE_MS};
use pumpbank::channel::{HomingFailure, HomingState};
use pumpbank::config::{channel_name, SystemConfig};

use crate::mock_hw::Bench;

#[test]
fn failing_channel_is_skipped_and_run_continues() {
    let mut bench = Bench::new();
    let mut config = SystemConfig::default();
    config.homing.max_steps = 100;
    bench.place_switch(&config, "CH1", 40);
    bench.place_switch(&config, "CH3", 5);
    let bus = bench.bus();
    let mut registry = bench.registry(&bus, &config);

    let selected: Vec<_> = ["ch2", "CH1", "CH9", "CH3"]
        .iter()
        .filter_map(|n| channel_name(n))
        .collect();
    let reports = self_test::run(&mut registry, &selected, 0.5, &mut bench.clock, &mut bench.sink);

    let verdicts: Vec<(&str, &Verdict)> = reports
        .iter()
        .map(|r| (r.channel.as_str(), &r.verdict))
        .collect();
    assert_eq!(
        verdicts,
        [
            ("CH2", &Verdict::HomingFailed(HomingFailure::TravelLimitExceeded)),
            (
                "CH1",
                &Verdict::Passed {
                    seek_steps: 40,
                    aspirated_steps: 181,
                    dispensed_steps: 181
                }
            ),
            ("CH9", &Verdict::NotFound),
            (
                "CH3",
                &Verdict::Passed {
                    seek_steps: 5,
                    aspirated_steps: 181,
                    dispensed_steps: 181
                }
            ),
        ]
    );
    assert_eq!(reports.iter().filter(|r| r.passed()).count(), 2);

    // CH2 never reached the valve or motion steps.
    assert_eq!(bench.moves(&config, "CH2"), (100, 0));
    // seek + dispense toward home, backoff + aspirate away.
    assert_eq!(bench.moves(&config, "CH1"), (40 + 181, 50 + 181));

    assert_eq!(
        registry.get("CH1").map(|c| c.state()),
        Some(HomingState::Homed)
    );
    assert_eq!(
        registry.get("CH2").map(|c| c.state()),
        Some(HomingState::HomingFailed)
    );
}

#[test]
fn pauses_between_steps() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    bench.place_switch(&config, "CH4", 12);
    let bus = bench.bus();
    let mut registry = bench.registry(&bus, &config);

    let selected = [channel_name("CH4").expect("short name")];
    let reports = self_test::run(&mut registry, &selected, 1.0, &mut bench.clock, &mut bench.sink);

    assert!(reports[0].passed());
    // Homing confirmation debounce, then the three pauses.
    assert_eq!(
        bench.clock.ms_sleeps(),
        &[5, STEP_PAUSE_MS, STEP_PAUSE_MS, STEP_PAUSE_MS]
    );
    // Valve went open then closed again.
    let valve: Vec<_> = bench
        .board
        .writes()
        .into_iter()
        .filter(|w| w.pin == 3)
        .map(|w| w.state)
        .collect();
    use embedded_hal::digital::PinState::{High, Low};
    assert_eq!(valve, [Low, High, Low]);
}

#[test]
fn empty_selection_tests_every_channel() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    for name in ["CH1", "CH2", "CH3", "CH4", "CH5"] {
        bench.place_switch(&config, name, 3);
    }
    let bus = bench.bus();
    let mut registry = bench.registry(&bus, &config);

    let reports = self_test::run(&mut registry, &[], 0.25, &mut bench.clock, &mut bench.sink);

    let names: Vec<&str> = reports.iter().map(|r| r.channel.as_str()).collect();
    assert_eq!(names, ["CH1", "CH2", "CH3", "CH4", "CH5"]);
    assert!(reports.iter().all(|r| r.passed()));
}

#[test]
fn gpio_fault_while_homing_is_reported_like_the_console() {
    use embedded_hal::digital::ErrorKind;
    use pumpbank::app::events::PumpEvent;
    use pumpbank::error::{DriverError, PinRole};

    let mut bench = Bench::new();
    let config = SystemConfig::default();
    let bus = bench.bus();
    let mut registry = bench.registry(&bus, &config);
    bench.board.fail_pin(6);

    let selected = [channel_name("CH1").expect("short name")];
    let reports = self_test::run(&mut registry, &selected, 0.5, &mut bench.clock, &mut bench.sink);

    assert_eq!(
        reports[0].verdict,
        Verdict::Fault(DriverError::Gpio {
            role: PinRole::Pulse,
            kind: ErrorKind::Other,
        })
    );
    assert_eq!(
        bench.sink.events,
        [
            PumpEvent::HomingStarted {
                channel: "CH1".into()
            },
            PumpEvent::HomingFailed {
                channel: "CH1".into(),
                reason: None,
            },
        ]
    );
    assert_eq!(
        registry.get("CH1").map(|c| c.state()),
        Some(HomingState::HomingFailed)
    );
}
