//! ESP32 GPIO adapter.
//!
//! Claims pins by number for the [`ChannelRegistry`] pin factory and sets
//! up the shared limit-bus input.  Both return `esp-idf-hal` [`PinDriver`]s,
//! which implement the `embedded-hal` 1.0 digital traits the drivers use.
//!
//! [`ChannelRegistry`]: crate::channel::registry::ChannelRegistry

use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
use esp_idf_svc::sys::EspError;

use crate::config::LimitBusConfig;

pub type OutputLine = PinDriver<'static, AnyOutputPin, Output>;
pub type BusLine = PinDriver<'static, AnyIOPin, Input>;

/// Claim GPIO `pin` as a push-pull output.
///
/// The configuration validator guarantees each number is claimed once.
pub fn output(pin: u8) -> Result<OutputLine, EspError> {
    // SAFETY: pin numbers come from a validated config in which every
    // output is unique and distinct from the bus input.
    let pin = unsafe { AnyOutputPin::new(i32::from(pin)) };
    PinDriver::output(pin)
}

/// Configure the shared limit-bus input with the configured pull.
pub fn limit_bus(config: &LimitBusConfig) -> Result<BusLine, EspError> {
    // SAFETY: the bus pin is reserved by the validator; nothing else
    // claims it.
    let pin = unsafe { AnyIOPin::new(i32::from(config.pin)) };
    let mut input = PinDriver::input(pin)?;
    input.set_pull(if config.pull_up { Pull::Up } else { Pull::Floating })?;
    Ok(input)
}
