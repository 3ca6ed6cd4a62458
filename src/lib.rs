//! # rs-trackside
//!
//! Command routing and actuation core for a LEGO model railway layout.
//!
//! ## Features
//!
//! - **One command surface**: `lego/train/...` paths over HTTP GET and MQTT
//! - **Actuators**: servo switches and barriers, two-lamp signals, Power
//!   Functions IR motor channels
//! - **Position sensors**: change-only reporting over MQTT
//! - **`no_std` core**: everything except the async services runs on
//!   `core` + `alloc`
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `tokenizer` - Path splitting
//! - `commands` - Command grammar and outcomes
//! - `registry` / `state` - Immutable topology and live actuator state
//! - `ir` - Power Functions frames and the repeat queue
//! - `sensors` - Position sensor polling
//! - `topology` - JSON documents for `config` and command responses
//! - `controller` - Main controller that ties everything together
//! - `traits` - Hardware and network abstractions
//! - `hal` - Concrete implementations (mocks, `embedded-hal` adapters)
//! - `services` - Control loop, HTTP and MQTT transports
//!
//! ## Example
//!
//! ```rust
//! use rs_trackside::{hal::MockBoard, CommandSource, LayoutConfig, Registry, TrainController};
//!
//! let layout = LayoutConfig::empty()
//!     .with_ir_output(4)
//!     .with_switch(13)
//!     .with_signal(25, 26);
//! let mut controller = TrainController::new(Registry::from_layout(&layout), MockBoard::new(), 0);
//!
//! // Throw switch 0
//! controller.dispatch("lego/train/switch/0/1", CommandSource::Http).unwrap();
//!
//! // Queue a motor command; it goes out over the next ticks
//! controller.dispatch("lego/train/motor/pf/0/0/4", CommandSource::Mqtt).unwrap();
//! controller.tick().unwrap(); // 20ms tick
//!
//! assert_eq!(controller.hardware().frames_on(4).len(), 1);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Command grammar, parsed commands and their outcomes.
pub mod commands;
/// Shared configuration for desktop and embedded builds.
pub mod config;
/// Layout controller that coordinates commands, state and hardware.
pub mod controller;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Power Functions IR frame encoding and the repeat queue.
pub mod ir;
/// Immutable actuator registry built from the layout.
pub mod registry;
/// Position sensor polling and change events.
pub mod sensors;
/// Transports: control loop, HTTP handler, MQTT.
pub mod services;
/// Live actuator state.
pub mod state;
/// Slash-delimited path tokenizer.
pub mod tokenizer;
/// Topology and response JSON documents.
pub mod topology;
/// Core traits for hardware and network abstraction.
pub mod traits;

// Re-exports for convenience
pub use commands::{
    Command, CommandOutcome, CommandSource, IgnoreReason, MotorCommand, PfOutput, RejectReason,
};
pub use controller::{TickReport, TrainController};
pub use ir::{IrRepeatQueue, PfFrame};
pub use registry::{ActuatorId, ActuatorKind, Registry};
pub use sensors::SensorChange;
pub use state::{ActuatorStates, SensorReading, Selector, SignalAspect};
pub use tokenizer::PathTokenizer;
pub use traits::{
    // Hardware
    Board,
    Clock,
    Delay,
    IrTransmitter,
    LampDriver,
    Peripheral,
    PinInput,
    PinLevel,
    ServoDriver,
    // Network
    HttpMethod,
    HttpRequest,
    HttpResponse,
    MqttClient,
    MqttMessage,
    RequestServer,
};

// Config re-exports
pub use config::{
    AngleRange, Config, ControllerConfig, DeviceConfig, LayoutConfig, MqttConfig, WebConfig,
};
