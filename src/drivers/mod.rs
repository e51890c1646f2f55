//! Actuator and sensor drivers over `embedded-hal` pins.

pub mod limit_bus;
pub mod stepper;
pub mod valve;
