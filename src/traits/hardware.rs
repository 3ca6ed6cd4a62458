//! Hardware abstraction traits for servos, lamps, IR output and pin inputs.
//!
//! The controller never touches a chip directly. Board support code implements
//! these traits; the desktop build and the tests use [`crate::hal::mock`].
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ServoDriver`] | Position switch and barrier servos |
//! | [`LampDriver`] | Drive signal lamp outputs |
//! | [`IrTransmitter`] | Send Power Functions frames on an IR LED |
//! | [`PinInput`] | Read position sensor pins |
//! | [`Delay`] | Blocking delay for servo settle time |
//! | [`Board`] | Everything above, as one bound |
//!
//! The fallible traits share a single error type through [`Peripheral`], so a
//! board exposes one `Error` to the controller.
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::traits::{LampDriver, PinInput, PinLevel, ServoDriver};
//! use rs_trackside::hal::MockBoard;
//!
//! let mut board = MockBoard::new();
//! board.write_angle(13, 90).unwrap();
//! board.set_lamp(25, true).unwrap();
//!
//! board.set_input(34, PinLevel::Low);
//! assert_eq!(board.read_level(34), PinLevel::Low);
//! ```

use crate::config::Pin;
use crate::ir::PfFrame;

/// Logic level of an input pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PinLevel {
    /// Pulled high. Idle level for the active-low position sensors.
    #[default]
    High,
    /// Driven low.
    Low,
}

/// Common error type for a group of hardware drivers.
pub trait Peripheral {
    /// Error type for hardware operations.
    type Error: core::fmt::Debug;
}

/// Servo output for switches and barriers.
///
/// # Implementation Notes
///
/// - The call only starts the move; the controller waits out the settle time
///   through [`Delay`].
/// - Angles are in degrees, already limited to the kind's configured range.
pub trait ServoDriver: Peripheral {
    /// Command the servo on `pin` to `angle` degrees.
    fn write_angle(&mut self, pin: Pin, angle: u8) -> Result<(), Self::Error>;
}

/// Digital output for signal lamps.
pub trait LampDriver: Peripheral {
    /// Switch the lamp on `pin` on or off.
    fn set_lamp(&mut self, pin: Pin, lit: bool) -> Result<(), Self::Error>;
}

/// IR LED output for LEGO Power Functions receivers.
pub trait IrTransmitter: Peripheral {
    /// Send one encoded frame on the LED attached to `pin`.
    ///
    /// Implementations handle carrier modulation and pulse timing.
    fn transmit(&mut self, pin: Pin, frame: PfFrame) -> Result<(), Self::Error>;
}

/// Digital input for position sensors.
///
/// Reads never fail; a disconnected input simply reads as pulled up.
pub trait PinInput {
    /// Current level of `pin`.
    fn read_level(&mut self, pin: Pin) -> PinLevel;
}

/// Blocking delay.
pub trait Delay {
    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Full set of hardware the controller drives.
///
/// Implemented automatically for anything that implements every part.
pub trait Board: ServoDriver + LampDriver + IrTransmitter + PinInput + Delay {}

impl<T> Board for T where T: ServoDriver + LampDriver + IrTransmitter + PinInput + Delay {}

/// Monotonic millisecond clock.
///
/// Used by the cooperative control loop to pace ticks and reconnect attempts.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed start.
    fn now_ms(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_level_default_is_high() {
        assert_eq!(PinLevel::default(), PinLevel::High);
    }
}
