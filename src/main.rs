//! PumpBank Firmware: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  gpio (PinDriver)   BoardClock   NvsConfigStore  LogEventSink│
//! │                                                              │
//! │  ─────────────── Port / embedded-hal boundary ─────────────  │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  ChannelRegistry ─ PumpChannel × N ─ &LimitBus          │  │
//! │  │  CommandDispatcher · control loop · self-test          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use pumpbank::adapters::gpio;
use pumpbank::adapters::log_sink::LogEventSink;
use pumpbank::adapters::nvs::NvsConfigStore;
use pumpbank::adapters::time::BoardClock;
use pumpbank::app::control_loop;
use pumpbank::app::dispatcher::CommandDispatcher;
use pumpbank::app::ports::ConfigPort;
use pumpbank::app::self_test;
use pumpbank::channel::registry::ChannelRegistry;
use pumpbank::config::{StartupMode, SystemConfig};
use pumpbank::drivers::limit_bus::LimitBus;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("=== PumpBank v{} startup ===", env!("CARGO_PKG_VERSION"));

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsConfigStore::new().and_then(|store| store.load()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Shared limit bus + channels ────────────────────────
    let bus = LimitBus::from_config(gpio::limit_bus(&config.limit_bus)?, &config.limit_bus);
    info!(
        "Limit bus on GPIO {} (active_low={}, debounce={} ms)",
        config.limit_bus.pin,
        bus.active_low(),
        bus.debounce_ms()
    );
    let mut registry = ChannelRegistry::build(&config, &bus, gpio::output)?;
    info!("{} channel(s) registered", registry.len());

    let mut clock = BoardClock::new();
    let mut sink = LogEventSink::new();

    // ── 4. Run the selected mode ──────────────────────────────
    match &config.mode {
        StartupMode::SerialControl => {
            let mut dispatcher = CommandDispatcher::new(registry);
            let mut reader = std::io::stdin().lock();
            let mut writer = std::io::stdout();
            control_loop::run(
                &mut reader,
                &mut writer,
                &mut dispatcher,
                &mut clock,
                &mut sink,
                &config.control_loop,
            )?;
        }
        StartupMode::SelfTest { channels, volume } => {
            let reports = self_test::run(&mut registry, channels, *volume, &mut clock, &mut sink);
            for report in &reports {
                info!("self-test {}: {:?}", report.channel, report.verdict);
            }
        }
    }

    info!("=== PumpBank finished ===");
    Ok(())
}
