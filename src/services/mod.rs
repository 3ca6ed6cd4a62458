//! Transports for the command surface.
//!
//! Always available (`no_std` + `alloc`):
//! - `http_handler`: request handling shared by every HTTP front end
//! - `mqtt_runner`: polled MQTT runner over any `MqttClient`
//! - `control_loop`: the cooperative single-threaded tick
//!
//! With `std`:
//! - `shared`: `SharedTrainState`, one mutex around the controller
//! - `web` feature: axum router
//! - `mqtt` feature: rumqttc handler
//!
//! # Shared State Pattern
//!
//! On desktop every service drives the same controller:
//!
//! ```ignore
//! use std::sync::Arc;
//! use rs_trackside::services::SharedTrainState;
//!
//! let state = Arc::new(SharedTrainState::new(controller));
//!
//! let web_router = build_router(Arc::clone(&state), &web_config);
//! let mqtt_handler = MqttHandler::new(Arc::clone(&state), mqtt_config);
//! ```

pub mod control_loop;
pub mod http_handler;
pub mod mqtt_runner;

#[cfg(feature = "std")]
pub mod shared;

#[cfg(feature = "web")]
pub mod web;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-exports
pub use control_loop::*;
pub use http_handler::*;
pub use mqtt_runner::*;

#[cfg(feature = "std")]
pub use shared::*;

#[cfg(feature = "web")]
pub use web::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
