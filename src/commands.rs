//! Command grammar for the layout controller.
//!
//! Both transports deliver the same slash-delimited text commands:
//!
//! ```text
//! lego/train/config
//! lego/train/motor/pf/<channel>/<side>/<speed>
//! lego/train/switch/<id>/<selector>
//! lego/train/barrier/<id>/<selector>
//! lego/train/signal/<id>/<light>/<value>
//! ```
//!
//! [`Command::parse`] turns a string into a typed [`Command`] without looking
//! at the registry. Whether ids and values are in range is decided later by
//! the dispatcher in [`TrainController`](crate::controller::TrainController),
//! which reports the result as a [`CommandOutcome`].
//!
//! Literals are case-sensitive. Tokens after a complete command are ignored.
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::commands::{Command, MotorCommand, PfOutput, RejectReason};
//!
//! let cmd = Command::parse("lego/train/motor/pf/0/1/5").unwrap();
//! assert_eq!(
//!     cmd,
//!     Command::Motor(MotorCommand { channel: 0, output: PfOutput::B, speed: 5 })
//! );
//!
//! assert_eq!(Command::parse("lego/plane/config"), Err(RejectReason::UnknownRoot));
//! ```

use crate::registry::ActuatorKind;
use crate::tokenizer::PathTokenizer;

/// First literal of every command path.
pub const ROOT: &str = "lego";
/// Second literal of every command path.
pub const SYSTEM: &str = "train";

/// Highest Power Functions channel (channels are `0..=3`).
pub const MAX_PF_CHANNEL: u8 = 3;
/// Largest absolute speed step.
pub const MAX_SPEED: i8 = 7;

// ============================================================================
// Command Source
// ============================================================================

/// Transport a command arrived on. Used for logging only; both transports
/// share one grammar and one dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandSource {
    /// Request/response channel (HTTP request path)
    Http,
    /// Publish/subscribe channel (MQTT topic + payload)
    Mqtt,
    /// In-process caller (tests, demo)
    Local,
}

impl CommandSource {
    /// Lowercase name used in logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandSource::Http => "http",
            CommandSource::Mqtt => "mqtt",
            CommandSource::Local => "local",
        }
    }
}

// ============================================================================
// Parsed Commands
// ============================================================================

/// Output of a Power Functions receiver channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PfOutput {
    /// Red output
    #[default]
    A,
    /// Blue output
    B,
}

impl PfOutput {
    /// Output bit in the frame's mode nibble.
    pub const fn bit(&self) -> u8 {
        match self {
            PfOutput::A => 0,
            PfOutput::B => 1,
        }
    }
}

/// A Power Functions speed command, already clamped to legal ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MotorCommand {
    /// Receiver channel, `0..=3`
    pub channel: u8,
    /// Output on that channel
    pub output: PfOutput,
    /// Signed speed step, `-7..=7`; `0` is float
    pub speed: i8,
}

impl MotorCommand {
    /// Build a motor command from raw field values, clamping each one.
    ///
    /// `side == 1` selects output B, any other value output A.
    pub fn from_raw(channel: i32, side: i32, speed: i32) -> Self {
        Self {
            channel: channel.clamp(0, MAX_PF_CHANNEL as i32) as u8,
            output: if side == 1 { PfOutput::B } else { PfOutput::A },
            speed: speed.clamp(-(MAX_SPEED as i32), MAX_SPEED as i32) as i8,
        }
    }
}

/// A command parsed from a path, before registry validation.
///
/// Numeric fields of switch, barrier and signal commands are `None` when the
/// token is missing or not an integer; the dispatcher treats that the same as
/// an out-of-range value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Report the topology.
    Config,
    /// Load the IR repeat queue.
    Motor(MotorCommand),
    /// Move a track switch.
    Switch {
        /// Switch id
        id: Option<i32>,
        /// Selector, `0` or `1`
        selector: Option<i32>,
    },
    /// Raise or lower a crossing barrier.
    Barrier {
        /// Barrier id
        id: Option<i32>,
        /// Selector, `0` or `1`
        selector: Option<i32>,
    },
    /// Change a signal lamp.
    Signal {
        /// Signal id
        id: Option<i32>,
        /// Lamp, `0` or `1`
        light: Option<i32>,
        /// `1` lights the lamp, `0` puts it out
        value: Option<i32>,
    },
}

impl Command {
    /// Parse a full command path such as `lego/train/switch/0/1`.
    pub fn parse(input: &str) -> Result<Self, RejectReason> {
        let mut tokens = PathTokenizer::new(input);

        if tokens.next_token() != ROOT || tokens.next_token() != SYSTEM {
            return Err(RejectReason::UnknownRoot);
        }

        match tokens.next_token() {
            "config" => Ok(Command::Config),
            "motor" => {
                if tokens.next_token() != "pf" {
                    return Err(RejectReason::UnknownMotorProtocol);
                }
                let channel = parse_lenient(tokens.next_token());
                let side = parse_lenient(tokens.next_token());
                let speed = parse_lenient(tokens.next_token());
                Ok(Command::Motor(MotorCommand::from_raw(channel, side, speed)))
            }
            "switch" => Ok(Command::Switch {
                id: parse_strict(tokens.next_token()),
                selector: parse_strict(tokens.next_token()),
            }),
            "barrier" => Ok(Command::Barrier {
                id: parse_strict(tokens.next_token()),
                selector: parse_strict(tokens.next_token()),
            }),
            "signal" => Ok(Command::Signal {
                id: parse_strict(tokens.next_token()),
                light: parse_strict(tokens.next_token()),
                value: parse_strict(tokens.next_token()),
            }),
            _ => Err(RejectReason::UnknownSubcommand),
        }
    }

    /// Short name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Command::Config => "config",
            Command::Motor(_) => "motor",
            Command::Switch { .. } => "switch",
            Command::Barrier { .. } => "barrier",
            Command::Signal { .. } => "signal",
        }
    }
}

/// Integer parse in the style of C `atoi`: optional sign, then leading
/// digits. Anything unparseable yields `0`; overflow saturates.
pub fn parse_lenient(token: &str) -> i32 {
    let bytes = token.trim_start().as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let magnitude = digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i32, |acc, b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as i32)
        });

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Integer parse that accepts only a complete decimal integer.
pub fn parse_strict(token: &str) -> Option<i32> {
    token.parse().ok()
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of dispatching one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// An actuator was changed.
    Applied,
    /// A motor command was loaded into the IR queue.
    Queued,
    /// Grammar matched but a field was out of range. Nothing changed.
    Ignored(IgnoreReason),
    /// The topology should be returned to the caller.
    TopologyRequested,
    /// The command did not match the grammar. Nothing changed.
    Rejected(RejectReason),
}

impl CommandOutcome {
    /// Whether the command is acknowledged as accepted.
    ///
    /// Ignored commands are still accepted.
    pub const fn accepted(&self) -> bool {
        !matches!(self, CommandOutcome::Rejected(_))
    }

    /// Whether the caller should send the topology back.
    pub const fn topology_requested(&self) -> bool {
        matches!(self, CommandOutcome::TopologyRequested)
    }
}

/// Why a command was rejected outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Path does not start with `lego/train`.
    UnknownRoot,
    /// Third token is not a known subcommand.
    UnknownSubcommand,
    /// Motor protocol other than `pf`.
    UnknownMotorProtocol,
}

/// Why an accepted command had no effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Id missing, malformed or not registered.
    UnknownActuator(ActuatorKind),
    /// Switch or barrier selector not `0`/`1`.
    InvalidSelector,
    /// Signal light not `0`/`1`.
    InvalidLight,
    /// Signal value not `0`/`1`.
    InvalidValue,
}

// ============================================================================
// Tests
// ============================================================================
