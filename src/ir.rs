//! LEGO Power Functions IR output: frame encoding and the repeat queue.
//!
//! IR is lossy and one-way, so each motor command is sent several times. The
//! queue holds only the latest command; a newer one replaces it outright.
//!
//! # Frame layout
//!
//! A single-output PWM frame is four nibbles, most significant first:
//!
//! ```text
//! | toggle escape ch1 ch0 | addr 1 0 output | d3 d2 d1 d0 | LRC |
//! ```
//!
//! with `LRC = 0xF ^ n1 ^ n2 ^ n3`. Receivers act on a frame only when the
//! toggle bit differs from the previous command they accepted, so the bit
//! flips with every newly loaded command and stays fixed across repeats.

use crate::commands::MotorCommand;

/// Times each motor command is transmitted.
pub const IR_REPEAT_COUNT: u8 = 5;

/// PWM data nibbles for forward speeds `0..=7`. Index 0 is float.
pub const FORWARD_LEVELS: [u8; 8] = [0x0, 0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0x7];

/// PWM data nibbles for reverse speeds `0..=7`. Index 0 is float.
pub const REVERSE_LEVELS: [u8; 8] = [0x0, 0xF, 0xE, 0xD, 0xC, 0xB, 0xA, 0x9];

/// Single output mode marker in the second nibble.
const SINGLE_OUTPUT_PWM: u8 = 0b0100;

/// Encoded 16-bit Power Functions frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PfFrame(pub u16);

impl PfFrame {
    /// Encode `command` with the given toggle bit.
    pub fn encode(command: &MotorCommand, toggle: bool) -> Self {
        let n1 = ((toggle as u8) << 3) | (command.channel & 0b11);
        let n2 = SINGLE_OUTPUT_PWM | command.output.bit();
        let n3 = speed_level(command.speed);
        let lrc = 0xF ^ n1 ^ n2 ^ n3;

        Self(((n1 as u16) << 12) | ((n2 as u16) << 8) | ((n3 as u16) << 4) | lrc as u16)
    }

    /// Raw frame bits.
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Nibble `i`, where 0 is the most significant. Only the low two bits
    /// of `i` are used, so `4` reads nibble 0 again.
    pub const fn nibble(&self, i: u8) -> u8 {
        ((self.0 >> (12 - 4 * (i & 3) as u16)) & 0xF) as u8
    }

    /// Whether the toggle bit is set.
    pub const fn toggle(&self) -> bool {
        self.0 & 0x8000 != 0
    }
}

/// PWM data nibble for a signed speed step.
pub fn speed_level(speed: i8) -> u8 {
    let step = speed.unsigned_abs().min(7) as usize;
    if speed >= 0 {
        FORWARD_LEVELS[step]
    } else {
        REVERSE_LEVELS[step]
    }
}

/// The pending motor command and how many transmissions it still needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingIr {
    /// Command being repeated
    pub command: MotorCommand,
    /// Frame sent on every repeat
    pub frame: PfFrame,
    /// Transmissions left, always > 0 while pending
    pub remaining: u8,
}

/// Single-slot queue that repeats the most recent motor command.
#[derive(Clone, Debug, Default)]
pub struct IrRepeatQueue {
    slot: Option<PendingIr>,
    toggle: bool,
}

impl IrRepeatQueue {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            slot: None,
            toggle: false,
        }
    }

    /// Replace whatever is pending with `command` and reset the repeat count.
    pub fn load(&mut self, command: MotorCommand) {
        self.toggle = !self.toggle;
        self.slot = Some(PendingIr {
            command,
            frame: PfFrame::encode(&command, self.toggle),
            remaining: IR_REPEAT_COUNT,
        });
    }

    /// Take one repeat unit, emptying the queue after the last one.
    pub fn next_frame(&mut self) -> Option<PfFrame> {
        let pending = self.slot.as_mut()?;
        let frame = pending.frame;
        pending.remaining -= 1;
        if pending.remaining == 0 {
            self.slot = None;
        }
        Some(frame)
    }

    /// The pending command, if any.
    pub fn pending(&self) -> Option<&PendingIr> {
        self.slot.as_ref()
    }

    /// True when nothing is waiting to be sent.
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
