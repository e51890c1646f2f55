//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! [`PumpEvent`] through the `log` facade (UART / USB-CDC on target,
//! whatever logger the host installed otherwise).

use log::{info, warn};

use crate::app::events::PumpEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`PumpEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &PumpEvent) {
        match event {
            PumpEvent::Ready { channels } => {
                info!("READY | channels=[{}]", channels.join(" "));
            }
            PumpEvent::HomingStarted { channel } => {
                info!("HOME  | {channel} started");
            }
            PumpEvent::Homed {
                channel,
                seek_steps,
                started_pressed,
            } => {
                info!(
                    "HOME  | {channel} ok | seek_steps={seek_steps} | started_pressed={started_pressed}"
                );
            }
            PumpEvent::HomingFailed { channel, reason } => match reason {
                Some(reason) => warn!("HOME  | {channel} failed | {reason}"),
                None => warn!("HOME  | {channel} failed | gpio fault"),
            },
            PumpEvent::Moved {
                channel,
                action,
                volume,
                steps,
            } => {
                info!(
                    "MOVE  | {channel} {} | volume={volume} | steps={steps}",
                    action.as_token()
                );
            }
            PumpEvent::ValveSwitched { channel, action } => {
                info!("VALVE | {channel} {}", action.as_token());
            }
            PumpEvent::SpeedChanged {
                channel,
                half_period_us,
            } => {
                info!("SPEED | {channel} half_period={half_period_us}us");
            }
            PumpEvent::CommandRejected { reply } => {
                warn!("REJECT| {reply}");
            }
        }
    }
}
