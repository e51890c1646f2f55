//! End-to-end console sessions: bytes in, reply lines out.

use std::io::Cursor;

use pumpbank::app::control_loop;
use pumpbank::app::events::PumpEvent;
use pumpbank::config::{LoopConfig, SystemConfig};

use crate::mock_hw::Bench;

const SCRIPTED: LoopConfig = LoopConfig {
    idle_poll_ms: 10,
    error_backoff_ms: 50,
    exit_on_eof: true,
};

fn session(bench: &mut Bench, config: &SystemConfig, script: &str) -> Vec<String> {
    let bus = bench.bus();
    let mut d = bench.dispatcher(&bus, config);
    let mut out = Vec::new();
    control_loop::run(
        &mut Cursor::new(script.as_bytes()),
        &mut out,
        &mut d,
        &mut bench.clock,
        &mut bench.sink,
        &SCRIPTED,
    )
    .expect("writes to a Vec never fail");
    String::from_utf8(out)
        .expect("replies are ASCII")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn typical_prime_and_dose_session() {
    let mut bench = Bench::new();
    let config = SystemConfig::default();
    bench.place_switch(&config, "CH1", 64);

    let replies = session(
        &mut bench,
        &config,
        "# prime channel 1\r\n\
         ch1 home\r\n\
         CH1 VALVE OPEN\r\n\
         CH1 ASP 2.5\r\n\
         CH1 VALVE CLOSE\r\n\
         CH1 DISP 2.5\r\n\
         CH1 STATUS\r\n",
    );

    assert_eq!(
        replies,
        [
            "OK READY",
            "OK INIT CH1 CH2 CH3 CH4 CH5",
            "OK CH1 HOME",
            "OK CH1 VALVE OPEN",
            "OK CH1 ASP 2.5",
            "OK CH1 VALVE CLOSE",
            "OK CH1 DISP 2.5",
            "OK CH1 STATUS HOMED",
        ]
    );
    // Net travel after a dose cycle is just the backoff.
    assert_eq!(bench.moves(&config, "CH1"), (64 + 905, 50 + 905));
    assert!(matches!(bench.sink.events.first(), Some(PumpEvent::Ready { channels }) if channels.len() == 5));
}

#[test]
fn errors_never_stop_the_session() {
    let mut bench = Bench::new();
    let mut config = SystemConfig::default();
    config.homing.max_steps = 20;

    let replies = session(
        &mut bench,
        &config,
        "HOME ALL\n\
         CH2 ASP\n\
         CH2 SPEED fast\n\
         PUMP SOLUTION 0 0.5\n\
         PUMP SOLUTION 0 0.5 0 0 0\n\
         dance\n",
    );

    assert_eq!(
        replies,
        [
            "OK READY",
            "OK INIT CH1 CH2 CH3 CH4 CH5",
            "ERR CH1 HOME_FAILED",
            "ERR CH2 BAD_VOLUME",
            "ERR CH2 BAD_SPEED",
            "ERR PUMP EXPECT_5_VOLUMES",
            "OK PUMP SOLUTION",
            "ERR UNKNOWN_CMD \"dance\"",
        ]
    );
    assert_eq!(bench.moves(&config, "CH2"), (181, 0));
}
