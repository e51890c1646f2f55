//! Unified error types for the pump-bank firmware.
//!
//! Three layers, each converting into the next at its boundary:
//!
//! - [`DriverError`]: a GPIO write/read failed inside a driver.
//! - [`ConfigError`] / [`RegistryError`]: startup-time failures while the
//!   configuration snapshot is validated and the channels are built.
//! - [`CommandError`]: everything the protocol can answer with `ERR …`.
//!   The dispatcher converts driver faults into [`CommandError::Exception`]
//!   so that no failure ever leaves the control loop.

use core::fmt;

use embedded_hal::digital::ErrorKind;

use crate::config::ChannelName;

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

/// Which physical line a GPIO failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    Direction,
    Pulse,
    Valve,
    LimitBus,
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direction => write!(f, "dir"),
            Self::Pulse => write!(f, "pulse"),
            Self::Valve => write!(f, "valve"),
            Self::LimitBus => write!(f, "limit-bus"),
        }
    }
}

/// A digital I/O operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    Gpio { role: PinRole, kind: ErrorKind },
}

impl DriverError {
    /// Wrap any `embedded-hal` digital error raised on `role`.
    pub fn gpio(role: PinRole, e: impl embedded_hal::digital::Error) -> Self {
        Self::Gpio {
            role,
            kind: e.kind(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio { role, kind } => write!(f, "GPIO_{}_{:?}", role, kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating [`SystemConfig`](crate::config::SystemConfig).
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The JSON document could not be deserialised.
    Parse(String),
    /// A field failed range validation.
    /// The `&'static str` names the field and the rule.
    ValidationFailed(&'static str),
    /// Two channels share a name (compared case-insensitively).
    DuplicateChannel(ChannelName),
    /// One GPIO number is claimed by more than one output.
    PinConflict(u8),
    /// The backing store could not be read or written.
    Storage(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::DuplicateChannel(name) => write!(f, "duplicate channel name {name}"),
            Self::PinConflict(pin) => write!(f, "GPIO {pin} assigned more than once"),
            Self::Storage(msg) => write!(f, "config storage: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry build errors
// ---------------------------------------------------------------------------

/// Errors from [`ChannelRegistry::build`](crate::channel::registry::ChannelRegistry::build).
///
/// `E` is whatever the pin factory returns when it cannot claim a GPIO
/// (e.g. `EspError` on target, a sim error on host).
#[derive(Debug)]
pub enum RegistryError<E> {
    Config(ConfigError),
    PinSetup { pin: u8, source: E },
    Driver(DriverError),
}

impl<E: fmt::Display> fmt::Display for RegistryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::PinSetup { pin, source } => write!(f, "GPIO {pin} setup failed: {source}"),
            Self::Driver(e) => write!(f, "driver: {e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RegistryError<E> {}

impl<E> From<ConfigError> for RegistryError<E> {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl<E> From<DriverError> for RegistryError<E> {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for DriverError {}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Every `ERR` reply the dispatcher can produce.
///
/// `Display` renders the exact wire line (without the trailing newline).
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// `ERR <CH> NOT_FOUND`
    NotFound(String),
    /// `ERR <SCOPE> BAD_FORMAT`: the rule matched but the token shape did not.
    BadFormat(&'static str),
    /// `ERR <CH|PUMP> BAD_VOLUME`
    BadVolume(String),
    /// `ERR PUMP EXPECT_5_VOLUMES`
    ExpectFiveVolumes,
    /// `ERR <CH> BAD_SPEED`
    BadSpeed(String),
    /// `ERR <CH> UNKNOWN_ACTION`
    UnknownAction(String),
    /// `ERR <CH> HOME_FAILED`
    HomeFailed(String),
    /// `ERR UNKNOWN_CMD "<line>"`
    UnknownCommand(String),
    /// `ERR EXCEPTION <description>`
    Exception(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(ch) => write!(f, "ERR {ch} NOT_FOUND"),
            Self::BadFormat(scope) => write!(f, "ERR {scope} BAD_FORMAT"),
            Self::BadVolume(scope) => write!(f, "ERR {scope} BAD_VOLUME"),
            Self::ExpectFiveVolumes => write!(f, "ERR PUMP EXPECT_5_VOLUMES"),
            Self::BadSpeed(ch) => write!(f, "ERR {ch} BAD_SPEED"),
            Self::UnknownAction(ch) => write!(f, "ERR {ch} UNKNOWN_ACTION"),
            Self::HomeFailed(ch) => write!(f, "ERR {ch} HOME_FAILED"),
            Self::UnknownCommand(line) => write!(f, "ERR UNKNOWN_CMD \"{line}\""),
            Self::Exception(desc) => write!(f, "ERR EXCEPTION {desc}"),
        }
    }
}

impl From<DriverError> for CommandError {
    fn from(e: DriverError) -> Self {
        Self::Exception(e.to_string())
    }
}

impl std::error::Error for CommandError {}
