//! Application core: protocol, dispatch and run modes.
//!
//! Everything here is hardware-agnostic.  Channels are reached through the
//! [`ChannelRegistry`](crate::channel::registry::ChannelRegistry); time,
//! configuration storage and event output go through the port traits in
//! [`ports`], so the whole layer runs against the simulated bench.

pub mod commands;
pub mod control_loop;
pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod replies;
