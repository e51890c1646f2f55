//! Line protocol parser.
//!
//! Turns one console line into a [`Command`].  Matching is on upper-cased,
//! whitespace-separated tokens.  A line is routed by token 0, or by token 1
//! when token 0 looks like a channel name, in this fixed order:
//!
//! ```text
//!   INIT ─▶ HOME ─▶ <CH> ASP|DISP ─▶ <CH> VALVE|SPEED|STATUS ─▶ PUMP SOLUTION ─▶ UNKNOWN_CMD
//! ```
//!
//! Once a rule has matched, shape problems are reported against that rule
//! (`ERR MOVE BAD_FORMAT`, ...) and never fall through to the next one.
//!
//! The parser asks `is_registered` whether a name is a known channel, so an
//! unknown channel is reported as `NOT_FOUND` ahead of any argument error.

use crate::error::CommandError;

/// Fixed slots of `PUMP SOLUTION`; slot `i` targets `CH<i+1>`.
pub const SOLUTION_SLOTS: usize = 5;

/// Verb of a volume move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAction {
    /// `ASP`: draw liquid in (plunger away from home).
    Aspirate,
    /// `DISP`: push liquid out (plunger toward home).
    Dispense,
}

impl MoveAction {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Aspirate => "ASP",
            Self::Dispense => "DISP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveAction {
    Open,
    Close,
}

impl ValveAction {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
        }
    }
}

/// A validated, strictly positive volume and the token it was written as.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub value: f32,
    /// Echoed back verbatim (upper-cased) in the `OK` reply.
    pub token: String,
}

/// One parsed protocol line.  Channel names are upper-case.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `INIT`
    ListChannels,
    /// `<CH> INIT`
    ChannelInit { channel: String },
    /// `HOME ALL`
    HomeAll,
    /// `<CH> HOME`
    Home { channel: String },
    /// `<CH> ASP <vol>` / `<CH> DISP <vol>`
    Move {
        channel: String,
        action: MoveAction,
        volume: Volume,
    },
    /// `<CH> VALVE OPEN|CLOSE`
    Valve { channel: String, action: ValveAction },
    /// `<CH> SPEED <half-period us>`; range checked by the channel.
    Speed { channel: String, half_period_us: u32 },
    /// `<CH> STATUS`
    Status { channel: String },
    /// `PUMP SOLUTION v1 v2 v3 v4 v5`.
    /// Non-positive entries are kept and skipped at execution.
    PumpSolution { volumes: [f32; SOLUTION_SLOTS] },
}

/// Parse one line.
///
/// `None` for blank lines and `#` comments, which get no reply at all.
pub fn parse_line(
    line: &str,
    is_registered: impl Fn(&str) -> bool,
) -> Option<Result<Command, CommandError>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let upper = line.to_ascii_uppercase();
    let tokens: Vec<&str> = upper.split_whitespace().collect();
    Some(route(line, &tokens, &is_registered))
}

fn route(
    line: &str,
    tokens: &[&str],
    is_registered: &impl Fn(&str) -> bool,
) -> Result<Command, CommandError> {
    let head = tokens.first().copied().unwrap_or_default();
    let verb = match tokens {
        [first, second, ..] if looks_like_channel(first, is_registered) => Some(*second),
        _ => None,
    };

    if head == "INIT" || verb == Some("INIT") {
        return parse_init(tokens, is_registered);
    }
    if head == "HOME" || verb == Some("HOME") {
        return parse_home(tokens, is_registered);
    }
    match verb {
        Some("ASP" | "DISP") => return parse_move(tokens, is_registered),
        Some("VALVE") => return parse_valve(tokens, is_registered),
        Some("SPEED") => return parse_speed(tokens, is_registered),
        Some("STATUS") => return parse_status(tokens, is_registered),
        _ => {}
    }
    if let ["PUMP", "SOLUTION", volumes @ ..] = tokens {
        return parse_pump_solution(volumes);
    }

    Err(CommandError::UnknownCommand(line.to_string()))
}

/// `CH`-prefixed or a registered custom name.
fn looks_like_channel(token: &str, is_registered: &impl Fn(&str) -> bool) -> bool {
    token.starts_with("CH") || is_registered(token)
}

fn registered(
    channel: &str,
    is_registered: &impl Fn(&str) -> bool,
) -> Result<String, CommandError> {
    if is_registered(channel) {
        Ok(channel.to_string())
    } else {
        Err(CommandError::NotFound(channel.to_string()))
    }
}

// ── Rules ─────────────────────────────────────────────────────

fn parse_init(
    tokens: &[&str],
    is_registered: &impl Fn(&str) -> bool,
) -> Result<Command, CommandError> {
    match tokens {
        ["INIT"] => Ok(Command::ListChannels),
        [channel, "INIT"] => Ok(Command::ChannelInit {
            channel: registered(channel, is_registered)?,
        }),
        _ => Err(CommandError::BadFormat("INIT")),
    }
}

fn parse_home(
    tokens: &[&str],
    is_registered: &impl Fn(&str) -> bool,
) -> Result<Command, CommandError> {
    match tokens {
        ["HOME", "ALL"] => Ok(Command::HomeAll),
        [channel, "HOME"] => Ok(Command::Home {
            channel: registered(channel, is_registered)?,
        }),
        _ => Err(CommandError::BadFormat("HOME")),
    }
}

fn parse_move(
    tokens: &[&str],
    is_registered: &impl Fn(&str) -> bool,
) -> Result<Command, CommandError> {
    if tokens.len() > 3 {
        return Err(CommandError::BadFormat("MOVE"));
    }
    let channel = registered(tokens[0], is_registered)?;
    let action = match tokens[1] {
        "ASP" => MoveAction::Aspirate,
        _ => MoveAction::Dispense,
    };
    let volume = tokens
        .get(2)
        .and_then(|token| parse_volume(token))
        .ok_or_else(|| CommandError::BadVolume(channel.clone()))?;

    Ok(Command::Move {
        channel,
        action,
        volume,
    })
}

fn parse_valve(
    tokens: &[&str],
    is_registered: &impl Fn(&str) -> bool,
) -> Result<Command, CommandError> {
    let [channel, _, word] = tokens else {
        return Err(CommandError::BadFormat("VALVE"));
    };
    let channel = registered(channel, is_registered)?;
    let action = match *word {
        "OPEN" => ValveAction::Open,
        "CLOSE" => ValveAction::Close,
        _ => return Err(CommandError::UnknownAction(channel)),
    };
    Ok(Command::Valve { channel, action })
}

fn parse_speed(
    tokens: &[&str],
    is_registered: &impl Fn(&str) -> bool,
) -> Result<Command, CommandError> {
    let [channel, _, value] = tokens else {
        return Err(CommandError::BadFormat("SPEED"));
    };
    let channel = registered(channel, is_registered)?;
    match value.parse::<u32>() {
        Ok(half_period_us) => Ok(Command::Speed {
            channel,
            half_period_us,
        }),
        Err(_) => Err(CommandError::BadSpeed(channel)),
    }
}

fn parse_status(
    tokens: &[&str],
    is_registered: &impl Fn(&str) -> bool,
) -> Result<Command, CommandError> {
    let [channel, _] = tokens else {
        return Err(CommandError::BadFormat("STATUS"));
    };
    Ok(Command::Status {
        channel: registered(channel, is_registered)?,
    })
}

fn parse_pump_solution(tokens: &[&str]) -> Result<Command, CommandError> {
    // Every token must be numeric before the count is looked at.
    let mut volumes = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.parse::<f32>() {
            Ok(v) if v.is_finite() => volumes.push(v),
            _ => return Err(CommandError::BadVolume("PUMP".to_string())),
        }
    }
    let volumes: [f32; SOLUTION_SLOTS] = volumes
        .try_into()
        .map_err(|_| CommandError::ExpectFiveVolumes)?;
    Ok(Command::PumpSolution { volumes })
}

fn parse_volume(token: &str) -> Option<Volume> {
    let value = token.parse::<f32>().ok()?;
    (value.is_finite() && value > 0.0).then(|| Volume {
        value,
        token: token.to_string(),
    })
}
