//! Shared configuration system for desktop and embedded targets.
//!
//! Uses `heapless::String` and `heapless::Vec` for `no_std` compatibility while
//! remaining ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::config::{Config, LayoutConfig, MqttConfig, WebConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_web(WebConfig::default().with_port(3000))
//!     .with_layout(LayoutConfig::empty().with_switch(13).with_signal(25, 26));
//! ```

use heapless::String as HString;
use heapless::Vec as HVec;
use serde::{Deserialize, Serialize};

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum number of actuators of a single kind in a layout.
pub const MAX_ACTUATORS: usize = 16;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Pin number on the controller board.
pub type Pin = u8;

/// Fixed-capacity list of pins for one actuator kind.
pub type PinList = HVec<Pin, MAX_ACTUATORS>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let _ = hs.push_str(truncate_at_char_boundary(s, MAX_SHORT_STRING));
    hs
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character.
pub(crate) fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn pin_list(pins: &[Pin]) -> PinList {
    pins.iter().copied().take(MAX_ACTUATORS).collect()
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MQTT client configuration
    pub mqtt: MqttConfig,
    /// Request/response (HTTP) server configuration
    pub web: WebConfig,
    /// Physical layout: pins and servo angles
    pub layout: LayoutConfig,
    /// Control loop timing
    pub controller: ControllerConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set layout configuration
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Set controller timing configuration
    pub fn with_controller(mut self, controller: ControllerConfig) -> Self {
        self.controller = controller;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Parse a configuration from JSON bytes.
    ///
    /// Works without `std`. Missing sections fall back to their defaults.
    pub fn from_json(json: &[u8]) -> Result<Self, serde_json_core::de::Error> {
        serde_json_core::from_slice(json).map(|(config, _)| config)
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID (should be unique per device)
    pub client_id: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Minimum delay between reconnect attempts in milliseconds
    pub reconnect_interval_ms: u32,
    /// Whether MQTT is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id: short_string("rs-trackside"),
            username: ShortString::new(),
            password: ShortString::new(),
            keep_alive_secs: 30,
            reconnect_interval_ms: 5000,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the reconnect interval
    pub fn with_reconnect_interval_ms(mut self, ms: u32) -> Self {
        self.reconnect_interval_ms = ms;
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Request/response server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
    /// Upper bound on servicing one request, in milliseconds.
    ///
    /// Covers reading the request and any servo settle delay.
    pub request_timeout_ms: u32,
    /// Whether the server is enabled
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 80,
            cors_permissive: true,
            request_timeout_ms: 5000,
            enabled: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout_ms(mut self, ms: u32) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// Enable or disable the server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Layout Config
// ============================================================================

/// The two legal servo angles for one actuator kind, in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AngleRange {
    /// Angle for selector `0`
    pub min: u8,
    /// Angle for selector `1`
    pub max: u8,
}

impl AngleRange {
    /// Create a new angle range.
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }
}

/// Physical layout: which pins drive which actuators.
///
/// Actuator ids are the positions in each list, so the order here is the
/// registration order reported by the topology document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// IR LED outputs used to broadcast Power Functions frames
    pub ir_pins: PinList,
    /// Position sensor inputs (active low)
    pub sensor_pins: PinList,
    /// Track switch servos
    pub switch_pins: PinList,
    /// Crossing barrier servos
    pub barrier_pins: PinList,
    /// Signal lamp pairs
    pub signal_pins: HVec<[Pin; 2], MAX_ACTUATORS>,
    /// Angles for switch selectors
    pub switch_angles: AngleRange,
    /// Angles for barrier selectors
    pub barrier_angles: AngleRange,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let mut signal_pins = HVec::new();
        let _ = signal_pins.push([25, 26]);
        let _ = signal_pins.push([27, 32]);
        Self {
            ir_pins: pin_list(&[4]),
            sensor_pins: pin_list(&[34, 35]),
            switch_pins: pin_list(&[13, 12]),
            barrier_pins: pin_list(&[14]),
            signal_pins,
            switch_angles: AngleRange::new(45, 135),
            barrier_angles: AngleRange::new(0, 90),
        }
    }
}

impl LayoutConfig {
    /// A layout with no actuators, keeping the default angles.
    pub fn empty() -> Self {
        Self {
            ir_pins: PinList::new(),
            sensor_pins: PinList::new(),
            switch_pins: PinList::new(),
            barrier_pins: PinList::new(),
            signal_pins: HVec::new(),
            ..Default::default()
        }
    }

    /// Add an IR output pin
    pub fn with_ir_output(mut self, pin: Pin) -> Self {
        let _ = self.ir_pins.push(pin);
        self
    }

    /// Add a position sensor pin
    pub fn with_sensor(mut self, pin: Pin) -> Self {
        let _ = self.sensor_pins.push(pin);
        self
    }

    /// Add a switch servo pin
    pub fn with_switch(mut self, pin: Pin) -> Self {
        let _ = self.switch_pins.push(pin);
        self
    }

    /// Add a barrier servo pin
    pub fn with_barrier(mut self, pin: Pin) -> Self {
        let _ = self.barrier_pins.push(pin);
        self
    }

    /// Add a signal with its two lamp pins
    pub fn with_signal(mut self, lamp0: Pin, lamp1: Pin) -> Self {
        let _ = self.signal_pins.push([lamp0, lamp1]);
        self
    }

    /// Set the switch angles
    pub fn with_switch_angles(mut self, min: u8, max: u8) -> Self {
        self.switch_angles = AngleRange::new(min, max);
        self
    }

    /// Set the barrier angles
    pub fn with_barrier_angles(mut self, min: u8, max: u8) -> Self {
        self.barrier_angles = AngleRange::new(min, max);
        self
    }
}

// ============================================================================
// Controller Config
// ============================================================================

/// Control loop timing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Minimum period of one control loop tick in milliseconds
    pub tick_interval_ms: u32,
    /// Time held after a servo write before the command returns
    pub servo_settle_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 20,
            servo_settle_ms: 300,
        }
    }
}

impl ControllerConfig {
    /// Set the tick interval
    pub fn with_tick_interval_ms(mut self, ms: u32) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Set the servo settle time
    pub fn with_servo_settle_ms(mut self, ms: u32) -> Self {
        self.servo_settle_ms = ms;
        self
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: ShortString,
    /// Layout/controller ID (for multi-controller setups)
    pub id: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("rs-trackside"),
            id: short_string("layout1"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set the device ID
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = short_string(id);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
