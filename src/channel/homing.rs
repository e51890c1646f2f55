//! Homing state machine types.
//!
//! ```text
//!   Unhomed ──home()──▶ Homing ──▶ Homed
//!                          │
//!                          └─────▶ HomingFailed
//! ```
//!
//! `Homed` and `HomingFailed` hold until the next `home()`, which always
//! re-enters `Homing`.  Motion is not gated on this state.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomingState {
    #[default]
    Unhomed,
    Homing,
    Homed,
    HomingFailed,
}

impl HomingState {
    /// Upper-case token used by the `STATUS` reply.
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Unhomed => "UNHOMED",
            Self::Homing => "HOMING",
            Self::Homed => "HOMED",
            Self::HomingFailed => "HOMING_FAILED",
        }
    }
}

impl fmt::Display for HomingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Why a homing attempt ended in `HomingFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingFailure {
    /// The seek used up `max_steps` without the bus ever reading active.
    TravelLimitExceeded,
    /// The bus tripped but the debounced re-read came back inactive.
    UnconfirmedTrigger,
}

impl fmt::Display for HomingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TravelLimitExceeded => write!(f, "max steps reached without hitting limit"),
            Self::UnconfirmedTrigger => write!(f, "limit signal not stable"),
        }
    }
}

/// Result of one `home()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingOutcome {
    Homed {
        /// Steps issued toward home before the bus tripped.
        seek_steps: u32,
        /// The bus already read pressed when homing began.
        started_pressed: bool,
    },
    Failed {
        reason: HomingFailure,
        seek_steps: u32,
    },
}

impl HomingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Homed { .. })
    }

    pub fn seek_steps(&self) -> u32 {
        match *self {
            Self::Homed { seek_steps, .. } | Self::Failed { seek_steps, .. } => seek_steps,
        }
    }
}
