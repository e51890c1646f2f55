//! Command dispatcher: protocol line in, reply out.
//!
//! [`CommandDispatcher`] owns the [`ChannelRegistry`].  Each line is parsed
//! into a [`Command`], executed against the addressed channel(s), and
//! answered with exactly one [`CommandResult`].  Every failure, including a
//! GPIO fault mid-move, comes back as an `ERR` value, so the caller's loop
//! never has a reason to stop.
//!
//! ```text
//!   line ──▶ parse_line ──▶ Command ──▶ execute ──▶ Ack | CommandError
//!                                          │
//!                                          └──▶ EventSink
//! ```
//!
//! The clock and the sink are passed per call, never stored.

use embedded_hal::digital::{InputPin, OutputPin};
use log::debug;

use crate::app::commands::{parse_line, Command, MoveAction, ValveAction};
use crate::app::events::PumpEvent;
use crate::app::ports::{Clock, EventSink};
use crate::app::replies::{Ack, CommandResult};
use crate::channel::registry::ChannelRegistry;
use crate::channel::{HomingOutcome, PumpChannel};
use crate::error::{CommandError, DriverError};

// ───────────────────────────────────────────────────────────────
// CommandDispatcher
// ───────────────────────────────────────────────────────────────

pub struct CommandDispatcher<'bus, O, I> {
    registry: ChannelRegistry<'bus, O, I>,
}

impl<'bus, O: OutputPin, I: InputPin> CommandDispatcher<'bus, O, I> {
    pub fn new(registry: ChannelRegistry<'bus, O, I>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ChannelRegistry<'bus, O, I> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ChannelRegistry<'bus, O, I> {
        &mut self.registry
    }

    /// `OK READY` followed by the `INIT` listing.
    pub fn banner(&self) -> [Ack; 2] {
        [Ack::Ready, self.list_channels()]
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.registry.names().map(str::to_string).collect()
    }

    // ── Entry point ───────────────────────────────────────────

    /// Handle one raw line.
    ///
    /// `None` for blank lines and comments; otherwise the reply to write.
    pub fn dispatch(
        &mut self,
        line: &str,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) -> Option<CommandResult> {
        let parsed = parse_line(line, |name| self.registry.contains(name))?;
        debug!("dispatch: {:?}", parsed);

        let result = parsed.and_then(|command| self.execute(command, clock, sink));
        if let Err(e) = &result {
            sink.emit(&PumpEvent::CommandRejected {
                reply: e.to_string(),
            });
        }
        Some(result)
    }

    /// Run an already-parsed command.
    pub fn execute(
        &mut self,
        command: Command,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) -> CommandResult {
        match command {
            Command::ListChannels => Ok(self.list_channels()),

            Command::ChannelInit { channel } => {
                self.channel_mut(&channel)?;
                Ok(Ack::ChannelInit(channel))
            }

            Command::HomeAll => {
                // Sorted order; the first failure ends the batch.
                for (name, ch) in self.registry.iter_mut() {
                    if !home_channel(ch, clock, sink)?.is_success() {
                        return Err(CommandError::HomeFailed(name.to_string()));
                    }
                }
                Ok(Ack::HomeAll)
            }

            Command::Home { channel } => {
                let ch = self.channel_mut(&channel)?;
                if home_channel(ch, clock, sink)?.is_success() {
                    Ok(Ack::Home(channel))
                } else {
                    Err(CommandError::HomeFailed(channel))
                }
            }

            Command::Move {
                channel,
                action,
                volume,
            } => {
                let ch = self.channel_mut(&channel)?;
                move_channel(ch, action, volume.value, clock, sink)?;
                Ok(Ack::Moved {
                    channel,
                    action,
                    volume: volume.token,
                })
            }

            Command::Valve { channel, action } => {
                let ch = self.channel_mut(&channel)?;
                match action {
                    ValveAction::Open => ch.open_valve()?,
                    ValveAction::Close => ch.close_valve()?,
                }
                sink.emit(&PumpEvent::ValveSwitched {
                    channel: channel.clone(),
                    action,
                });
                Ok(Ack::Valve { channel, action })
            }

            Command::Speed {
                channel,
                half_period_us,
            } => {
                let ch = self.channel_mut(&channel)?;
                if ch.set_speed(half_period_us).is_err() {
                    return Err(CommandError::BadSpeed(channel));
                }
                sink.emit(&PumpEvent::SpeedChanged {
                    channel: channel.clone(),
                    half_period_us,
                });
                Ok(Ack::Speed {
                    channel,
                    half_period_us,
                })
            }

            Command::Status { channel } => {
                let state = self.channel_mut(&channel)?.state();
                Ok(Ack::Status { channel, state })
            }

            Command::PumpSolution { volumes } => {
                for (slot, &volume) in volumes.iter().enumerate() {
                    let name = format!("CH{}", slot + 1);
                    let Some(ch) = self.registry.get_mut(&name) else {
                        debug!("PUMP SOLUTION: {name} not registered, skipped");
                        continue;
                    };
                    if volume <= 0.0 {
                        continue;
                    }
                    move_channel(ch, MoveAction::Dispense, volume, clock, sink)?;
                }
                Ok(Ack::PumpSolution)
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn list_channels(&self) -> Ack {
        Ack::Init(self.channel_names())
    }

    fn channel_mut(&mut self, name: &str) -> Result<&mut PumpChannel<'bus, O, I>, CommandError> {
        self.registry
            .get_mut(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))
    }
}

/// Home one channel, reporting start and result on `sink`.
///
/// A GPIO fault is reported as `HomingFailed` with no reason before it is
/// returned.
pub(crate) fn home_channel<O: OutputPin, I: InputPin>(
    ch: &mut PumpChannel<'_, O, I>,
    clock: &mut impl Clock,
    sink: &mut impl EventSink,
) -> Result<HomingOutcome, DriverError> {
    let channel = ch.name().to_string();
    sink.emit(&PumpEvent::HomingStarted {
        channel: channel.clone(),
    });

    let result = ch.home(clock);
    let event = match &result {
        Ok(HomingOutcome::Homed {
            seek_steps,
            started_pressed,
        }) => PumpEvent::Homed {
            channel,
            seek_steps: *seek_steps,
            started_pressed: *started_pressed,
        },
        Ok(HomingOutcome::Failed { reason, .. }) => PumpEvent::HomingFailed {
            channel,
            reason: Some(*reason),
        },
        Err(_) => PumpEvent::HomingFailed {
            channel,
            reason: None,
        },
    };
    sink.emit(&event);
    result
}

/// Aspirate or dispense `volume` and report the steps issued.
pub(crate) fn move_channel<O: OutputPin, I: InputPin>(
    ch: &mut PumpChannel<'_, O, I>,
    action: MoveAction,
    volume: f32,
    clock: &mut impl Clock,
    sink: &mut impl EventSink,
) -> Result<u32, DriverError> {
    let steps = match action {
        MoveAction::Aspirate => ch.aspirate(volume, clock)?,
        MoveAction::Dispense => ch.dispense(volume, clock)?,
    };
    sink.emit(&PumpEvent::Moved {
        channel: ch.name().to_string(),
        action,
        volume,
        steps,
    });
    Ok(steps)
}
