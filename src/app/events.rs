//! Outbound domain events.
//!
//! The [`CommandDispatcher`](super::dispatcher::CommandDispatcher) and the
//! control loop emit these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them; the
//! default one logs them.

use crate::app::commands::{MoveAction, ValveAction};
use crate::channel::HomingFailure;

#[derive(Debug, Clone, PartialEq)]
pub enum PumpEvent {
    /// The console loop is up; carries the registered channel names.
    Ready { channels: Vec<String> },

    HomingStarted { channel: String },

    Homed {
        channel: String,
        seek_steps: u32,
        /// The shared bus already read pressed when homing began.
        started_pressed: bool,
    },

    /// `reason` is `None` when a GPIO fault aborted the sequence.
    HomingFailed {
        channel: String,
        reason: Option<HomingFailure>,
    },

    Moved {
        channel: String,
        action: MoveAction,
        volume: f32,
        steps: u32,
    },

    ValveSwitched { channel: String, action: ValveAction },

    SpeedChanged { channel: String, half_period_us: u32 },

    /// A line was answered with `ERR`; carries the reply line.
    CommandRejected { reply: String },
}
