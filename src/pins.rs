//! Default GPIO assignments for the five-channel mixing board.
//!
//! These only seed [`SystemConfig::default`](crate::config::SystemConfig);
//! a JSON config file may override any of them.  Drivers never reference
//! this module directly.

// ---------------------------------------------------------------------------
// Shared limit-switch bus
// ---------------------------------------------------------------------------

/// Digital input shared by every plunger's top limit switch (wired-OR).
pub const LIMIT_BUS_GPIO: u8 = 20;

// ---------------------------------------------------------------------------
// Per-channel stepper (TB6600) and valve MOSFET outputs
// ---------------------------------------------------------------------------

/// One row per channel: `(name, DIR+, PUL+, valve)`.
pub const CHANNEL_PINS: [(&str, u8, u8, u8); 5] = [
    ("CH1", 28, 6, 0),
    ("CH2", 27, 7, 1),
    ("CH3", 26, 8, 2),
    ("CH4", 22, 9, 3),
    ("CH5", 21, 10, 4),
];

// ---------------------------------------------------------------------------
// Auxiliary loads (not driven by the pump bank core)
// ---------------------------------------------------------------------------

/// Main circulation pump MOSFET.
pub const MAIN_PUMP_GPIO: u8 = 17;
/// Mixing servo PWM.
pub const SERVO_GPIO: u8 = 16;
/// Global rinse solenoid.
pub const GLOBAL_SOLENOID_GPIO: u8 = 5;
