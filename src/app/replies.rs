//! `OK` replies.
//!
//! A handled line yields a [`CommandResult`]: `Ok(Ack)` renders as an `OK`
//! line, `Err(CommandError)` as an `ERR` line.  Both `Display` impls write
//! the exact wire text without the trailing newline.

use core::fmt;

use crate::app::commands::{MoveAction, ValveAction};
use crate::channel::HomingState;
use crate::error::CommandError;

pub type CommandResult = Result<Ack, CommandError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    /// `OK READY`
    Ready,
    /// `OK INIT <names…>`, sorted.
    Init(Vec<String>),
    /// `OK <CH> INIT`
    ChannelInit(String),
    /// `OK HOME ALL`
    HomeAll,
    /// `OK <CH> HOME`
    Home(String),
    /// `OK <CH> ASP|DISP <vol>`
    Moved {
        channel: String,
        action: MoveAction,
        volume: String,
    },
    /// `OK <CH> VALVE OPEN|CLOSE`
    Valve { channel: String, action: ValveAction },
    /// `OK <CH> SPEED <us>`
    Speed { channel: String, half_period_us: u32 },
    /// `OK <CH> STATUS <state>`
    Status { channel: String, state: HomingState },
    /// `OK PUMP SOLUTION`
    PumpSolution,
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "OK READY"),
            Self::Init(names) => {
                write!(f, "OK INIT")?;
                for name in names {
                    write!(f, " {name}")?;
                }
                Ok(())
            }
            Self::ChannelInit(ch) => write!(f, "OK {ch} INIT"),
            Self::HomeAll => write!(f, "OK HOME ALL"),
            Self::Home(ch) => write!(f, "OK {ch} HOME"),
            Self::Moved {
                channel,
                action,
                volume,
            } => write!(f, "OK {channel} {} {volume}", action.as_token()),
            Self::Valve { channel, action } => {
                write!(f, "OK {channel} VALVE {}", action.as_token())
            }
            Self::Speed {
                channel,
                half_period_us,
            } => write!(f, "OK {channel} SPEED {half_period_us}"),
            Self::Status { channel, state } => write!(f, "OK {channel} STATUS {state}"),
            Self::PumpSolution => write!(f, "OK PUMP SOLUTION"),
        }
    }
}

/// Wire line for either outcome.
pub fn render(result: &CommandResult) -> String {
    match result {
        Ok(ack) => ack.to_string(),
        Err(err) => err.to_string(),
    }
}
