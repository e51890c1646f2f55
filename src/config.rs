//! System configuration parameters
//!
//! Every tunable of the pump bank lives in one immutable [`SystemConfig`]
//! value.  It is loaded once at startup (NVS blob or defaults), validated,
//! and then handed to constructors explicitly.  No driver reads global
//! settings.  [`ChannelConfig::resolve`] folds the global defaults into a
//! per-channel [`ChannelSettings`] snapshot.

use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Longest accepted channel name.
pub const MAX_CHANNEL_NAME_LEN: usize = 16;

/// Upper-case channel identifier, as matched by the protocol.
pub type ChannelName = heapless::String<MAX_CHANNEL_NAME_LEN>;

/// Words the protocol routes on; a channel may not be named after one.
const RESERVED_WORDS: [&str; 10] = [
    "INIT", "HOME", "ALL", "ASP", "DISP", "PUMP", "SOLUTION", "VALVE", "SPEED", "STATUS",
];

/// Build an upper-cased [`ChannelName`], or `None` if it does not fit.
pub fn channel_name(raw: &str) -> Option<ChannelName> {
    let mut name = ChannelName::new();
    for c in raw.chars() {
        name.push(c.to_ascii_uppercase()).ok()?;
    }
    Some(name)
}

/// Step pulse timing shared by every channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// HIGH (and LOW) duration of one step pulse. Smaller = faster.
    pub default_half_period_us: u32,
    /// Fastest half-period accepted by `SPEED`.
    pub min_half_period_us: u32,
    /// Slowest half-period accepted by `SPEED`.
    pub max_half_period_us: u32,
    /// DIR setup time before the first pulse.
    pub dir_settle_us: u32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            default_half_period_us: 1000,
            min_half_period_us: 400,
            max_half_period_us: 3000,
            dir_settle_us: 50,
        }
    }
}

/// What homing does when the shared bus already reads pressed on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressedAtStart {
    /// Warn and seek anyway.
    #[default]
    Proceed,
    /// Warn, move `backoff_steps` away from home, then seek.
    BackOffFirst,
}

/// Homing bounds and the default direction convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomingConfig {
    /// Seek steps allowed before homing is declared failed.
    pub max_steps: u32,
    /// Steps moved away from the switch after a confirmed trigger.
    pub backoff_steps: u32,
    /// Pulse half-period used while homing (does not touch the sticky speed).
    pub half_period_us: u32,
    /// DIR level that moves a plunger toward its limit switch.
    pub dir_up: u8,
    /// DIR level that moves a plunger away from its limit switch.
    pub dir_down: u8,
    pub pressed_at_start: PressedAtStart,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            max_steps: 15_000,
            backoff_steps: 50,
            half_period_us: 1000,
            dir_up: 0,
            dir_down: 1,
            pressed_at_start: PressedAtStart::Proceed,
        }
    }
}

/// The single shared limit-switch input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitBusConfig {
    pub pin: u8,
    /// `true`: pressed reads LOW.
    pub active_low: bool,
    pub pull_up: bool,
    pub debounce_ms: u32,
}

impl Default for LimitBusConfig {
    fn default() -> Self {
        Self {
            pin: pins::LIMIT_BUS_GPIO,
            active_low: true,
            pull_up: true,
            debounce_ms: 5,
        }
    }
}

/// One plunger + valve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: ChannelName,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub dir_pin: u8,
    pub pul_pin: u8,
    pub valve_pin: u8,
    /// Logical switch id. Recorded only; the shared bus cannot tell switches apart.
    #[serde(default)]
    pub limit_id: u8,
    /// Overrides [`HomingConfig::dir_up`].
    #[serde(default)]
    pub dir_up: Option<u8>,
    /// Overrides [`HomingConfig::dir_down`].
    #[serde(default)]
    pub dir_down: Option<u8>,
    /// Overrides [`SystemConfig::default_steps_per_unit`].
    #[serde(default)]
    pub steps_per_unit: Option<f32>,
    #[serde(default = "enabled_by_default")]
    pub valve_active_high: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Fully-resolved, immutable settings for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings {
    pub name: ChannelName,
    pub limit_id: u8,
    pub steps_per_unit: f32,
    pub toward_home: PinState,
    pub away_from_home: PinState,
    pub dir_pin: u8,
    pub pul_pin: u8,
    pub valve_pin: u8,
    pub valve_active_high: bool,
    pub pulse: PulseConfig,
    pub homing: HomingConfig,
}

impl ChannelConfig {
    /// Fold the global defaults into a per-channel snapshot.
    ///
    /// Assumes the owning [`SystemConfig`] passed [`SystemConfig::validate`].
    pub fn resolve(&self, system: &SystemConfig) -> ChannelSettings {
        let dir_up = self.dir_up.unwrap_or(system.homing.dir_up);
        let dir_down = self.dir_down.unwrap_or(system.homing.dir_down);
        ChannelSettings {
            name: channel_name(&self.name).unwrap_or_else(|| self.name.clone()),
            limit_id: self.limit_id,
            steps_per_unit: self.steps_per_unit.unwrap_or(system.default_steps_per_unit),
            toward_home: PinState::from(dir_up != 0),
            away_from_home: PinState::from(dir_down != 0),
            dir_pin: self.dir_pin,
            pul_pin: self.pul_pin,
            valve_pin: self.valve_pin,
            valve_active_high: self.valve_active_high,
            pulse: system.pulse,
            homing: system.homing,
        }
    }
}

/// Which program the firmware runs after building the channels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartupMode {
    /// Line protocol on the console.
    #[default]
    SerialControl,
    /// Bench test: home, toggle valve, aspirate and dispense `volume`.
    /// An empty list tests every registered channel.
    SelfTest {
        #[serde(default)]
        channels: Vec<ChannelName>,
        #[serde(default = "default_test_volume")]
        volume: f32,
    },
}

fn default_test_volume() -> f32 {
    0.5
}

/// Console loop behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Pause after an empty console read.
    pub idle_poll_ms: u32,
    /// Pause after a read error was reported.
    pub error_backoff_ms: u32,
    /// Return from the loop at end of input instead of polling again.
    pub exit_on_eof: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: 10,
            error_backoff_ms: 50,
            exit_on_eof: false,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub pulse: PulseConfig,
    pub homing: HomingConfig,
    pub limit_bus: LimitBusConfig,
    /// Plunger steps per unit volume (ml), tuned experimentally.
    pub default_steps_per_unit: f32,
    pub mode: StartupMode,
    pub control_loop: LoopConfig,
    pub channels: Vec<ChannelConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let channels = pins::CHANNEL_PINS
            .iter()
            .enumerate()
            .map(|(i, &(name, dir_pin, pul_pin, valve_pin))| ChannelConfig {
                name: channel_name(name).unwrap_or_default(),
                enabled: true,
                dir_pin,
                pul_pin,
                valve_pin,
                limit_id: (i + 1) as u8,
                dir_up: None,
                dir_down: None,
                steps_per_unit: None,
                valve_active_high: true,
            })
            .collect();

        Self {
            pulse: PulseConfig::default(),
            homing: HomingConfig::default(),
            limit_bus: LimitBusConfig::default(),
            default_steps_per_unit: 362.0,
            mode: StartupMode::default(),
            control_loop: LoopConfig::default(),
            channels,
        }
    }
}

impl SystemConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pulse;
        if p.min_half_period_us == 0 {
            return Err(ConfigError::ValidationFailed("pulse.min_half_period_us must be > 0"));
        }
        if p.min_half_period_us > p.max_half_period_us {
            return Err(ConfigError::ValidationFailed("pulse min above max"));
        }
        if !(p.min_half_period_us..=p.max_half_period_us).contains(&p.default_half_period_us) {
            return Err(ConfigError::ValidationFailed("pulse.default_half_period_us out of bounds"));
        }
        if !(p.min_half_period_us..=p.max_half_period_us).contains(&self.homing.half_period_us) {
            return Err(ConfigError::ValidationFailed("homing.half_period_us out of bounds"));
        }

        if self.homing.max_steps == 0 {
            return Err(ConfigError::ValidationFailed("homing.max_steps must be > 0"));
        }
        check_direction_pair(self.homing.dir_up, self.homing.dir_down)?;
        check_calibration(self.default_steps_per_unit)?;

        if let StartupMode::SelfTest { volume, .. } = &self.mode {
            if !volume.is_finite() || *volume <= 0.0 {
                return Err(ConfigError::ValidationFailed("self_test volume must be > 0"));
            }
        }

        let mut names: Vec<ChannelName> = Vec::with_capacity(self.channels.len());
        let mut claimed: Vec<u8> = vec![
            self.limit_bus.pin,
            pins::MAIN_PUMP_GPIO,
            pins::SERVO_GPIO,
            pins::GLOBAL_SOLENOID_GPIO,
        ];

        for ch in &self.channels {
            let name = check_name(&ch.name)?;
            if names.contains(&name) {
                return Err(ConfigError::DuplicateChannel(name));
            }
            names.push(name);

            check_direction_pair(
                ch.dir_up.unwrap_or(self.homing.dir_up),
                ch.dir_down.unwrap_or(self.homing.dir_down),
            )?;
            if let Some(spu) = ch.steps_per_unit {
                check_calibration(spu)?;
            }

            // Disabled channels never claim their pins.
            if !ch.enabled {
                continue;
            }
            for pin in [ch.dir_pin, ch.pul_pin, ch.valve_pin] {
                if claimed.contains(&pin) {
                    return Err(ConfigError::PinConflict(pin));
                }
                claimed.push(pin);
            }
        }

        Ok(())
    }
}

fn check_name(raw: &str) -> Result<ChannelName, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::ValidationFailed("channel name must not be empty"));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::ValidationFailed(
            "channel name must be ASCII letters, digits, '_' or '-'",
        ));
    }
    let name = channel_name(raw).ok_or(ConfigError::ValidationFailed("channel name too long"))?;
    if RESERVED_WORDS.contains(&name.as_str()) {
        return Err(ConfigError::ValidationFailed("channel name is a protocol keyword"));
    }
    Ok(name)
}

fn check_direction_pair(up: u8, down: u8) -> Result<(), ConfigError> {
    if up > 1 || down > 1 {
        return Err(ConfigError::ValidationFailed("dir_up/dir_down must be 0 or 1"));
    }
    if up == down {
        return Err(ConfigError::ValidationFailed("dir_up must differ from dir_down"));
    }
    Ok(())
}

fn check_calibration(steps_per_unit: f32) -> Result<(), ConfigError> {
    if !steps_per_unit.is_finite() || steps_per_unit <= 0.0 {
        return Err(ConfigError::ValidationFailed("steps_per_unit must be finite and > 0"));
    }
    Ok(())
}
