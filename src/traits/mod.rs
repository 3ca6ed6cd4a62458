//! Trait definitions for hardware and network abstraction.
//!
//! These traits are the seams between the command core and the outside world,
//! so the same controller runs against a real board, a desktop mock or a test
//! double.
//!
//! # Submodules
//!
//! - `hardware`: Servo, lamp, IR and pin-input drivers; delay and clock
//! - `network`: MQTT client and polled request server traits

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
