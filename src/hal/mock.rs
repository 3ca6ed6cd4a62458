//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without a layout attached.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockBoard`] | [`Board`] | Records servo, lamp and IR writes; scripted inputs |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockMqtt`] | [`MqttClient`] | Captures pub/sub operations |
//! | [`MockHttp`] | [`RequestServer`] | Queued request/response |
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::{CommandSource, TrainController};
//! use rs_trackside::hal::MockBoard;
//! use rs_trackside::registry::Registry;
//!
//! let mut controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
//! controller.dispatch("lego/train/barrier/0/1", CommandSource::Local).unwrap();
//!
//! // Verify via the recorded writes
//! assert_eq!(controller.hardware().angle(14), Some(90));
//! ```
//!
//! [`Board`]: crate::traits::Board
//! [`Clock`]: crate::traits::Clock
//! [`MqttClient`]: crate::traits::MqttClient
//! [`RequestServer`]: crate::traits::RequestServer

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::Pin;
use crate::ir::PfFrame;
use crate::traits::{
    Clock, Delay, HttpRequest, HttpResponse, IrTransmitter, LampDriver, MqttClient, MqttMessage,
    Peripheral, PinInput, PinLevel, RequestServer, ServoDriver,
};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock board for testing.
///
/// Records every output call for verification and returns scripted input
/// levels. Unset inputs read [`PinLevel::High`] (no train present).
///
/// # Example
///
/// ```rust
/// use rs_trackside::hal::MockBoard;
/// use rs_trackside::traits::{LampDriver, ServoDriver};
///
/// let mut board = MockBoard::new();
/// board.write_angle(13, 45).unwrap();
/// board.write_angle(13, 135).unwrap();
/// board.set_lamp(25, true).unwrap();
///
/// assert_eq!(board.angle(13), Some(135));
/// assert_eq!(board.servo_writes.len(), 2);
/// assert_eq!(board.lamp(25), Some(true));
/// ```
#[derive(Debug, Default)]
pub struct MockBoard {
    /// Servo writes in call order (pin, angle).
    pub servo_writes: Vec<(Pin, u8)>,
    /// Lamp writes in call order (pin, lit).
    pub lamp_writes: Vec<(Pin, bool)>,
    /// IR frames in call order (pin, frame).
    pub frames: Vec<(Pin, PfFrame)>,
    /// Requested delays in milliseconds.
    pub delays: Vec<u32>,
    /// Scripted input levels.
    pub inputs: Vec<(Pin, PinLevel)>,
    /// When true, every output call fails.
    pub fail_writes: bool,
    /// Zero-based `set_lamp` call that fails once, e.g. `Some(5)` fails the sixth.
    pub fail_lamp_call: Option<usize>,
    /// `set_lamp` calls seen so far, failed ones included.
    pub lamp_calls: usize,
}

impl MockBoard {
    /// Creates a new mock board with all inputs high.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level returned for `pin`.
    pub fn set_input(&mut self, pin: Pin, level: PinLevel) {
        match self.inputs.iter_mut().find(|(p, _)| *p == pin) {
            Some(entry) => entry.1 = level,
            None => self.inputs.push((pin, level)),
        }
    }

    /// Last angle written to `pin`.
    pub fn angle(&self, pin: Pin) -> Option<u8> {
        self.servo_writes
            .iter()
            .rev()
            .find(|(p, _)| *p == pin)
            .map(|(_, angle)| *angle)
    }

    /// Last lamp state written to `pin`.
    pub fn lamp(&self, pin: Pin) -> Option<bool> {
        self.lamp_writes
            .iter()
            .rev()
            .find(|(p, _)| *p == pin)
            .map(|(_, lit)| *lit)
    }

    /// Frames sent on `pin`.
    pub fn frames_on(&self, pin: Pin) -> Vec<PfFrame> {
        self.frames
            .iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, frame)| *frame)
            .collect()
    }

    fn check(&self) -> Result<(), ()> {
        if self.fail_writes {
            Err(())
        } else {
            Ok(())
        }
    }
}

impl Peripheral for MockBoard {
    type Error = ();
}

impl ServoDriver for MockBoard {
    fn write_angle(&mut self, pin: Pin, angle: u8) -> Result<(), ()> {
        self.check()?;
        self.servo_writes.push((pin, angle));
        Ok(())
    }
}

impl LampDriver for MockBoard {
    fn set_lamp(&mut self, pin: Pin, lit: bool) -> Result<(), ()> {
        let call = self.lamp_calls;
        self.lamp_calls += 1;
        self.check()?;
        if self.fail_lamp_call == Some(call) {
            return Err(());
        }
        self.lamp_writes.push((pin, lit));
        Ok(())
    }
}

impl IrTransmitter for MockBoard {
    fn transmit(&mut self, pin: Pin, frame: PfFrame) -> Result<(), ()> {
        self.check()?;
        self.frames.push((pin, frame));
        Ok(())
    }
}

impl PinInput for MockBoard {
    fn read_level(&mut self, pin: Pin) -> PinLevel {
        self.inputs
            .iter()
            .find(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
            .unwrap_or_default()
    }
}

impl Delay for MockBoard {
    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }
}

/// Mock clock for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use rs_trackside::hal::MockClock;
/// use rs_trackside::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock MQTT client for testing.
///
/// Records all publish/subscribe operations and allows injecting
/// incoming messages for testing message handling.
///
/// # Example
///
/// ```rust
/// use rs_trackside::hal::MockMqtt;
/// use rs_trackside::traits::MqttClient;
///
/// let mut mqtt = MockMqtt::new();
///
/// // Queue incoming message
/// mqtt.queue_message("lego/train/switch/0", b"1".to_vec());
///
/// // Check subscriptions
/// mqtt.subscribe("lego/train/motor/pf/#").unwrap();
/// assert!(mqtt.is_subscribed("lego/train/motor/pf/#"));
///
/// // Check published messages
/// mqtt.publish("lego/train/position/0", b"1", false).unwrap();
/// assert_eq!(mqtt.published_to("lego/train/position/0").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Topics that have been subscribed to.
    pub subscriptions: Vec<String>,
    /// Queue of incoming messages to be returned by `try_recv()`.
    pub incoming: Vec<MqttMessage>,
    /// Whether the client is connected.
    pub connected: bool,
    /// Number of `reconnect()` calls.
    pub reconnect_attempts: usize,
    /// When true, `reconnect()` fails and the client stays disconnected.
    pub refuse_reconnect: bool,
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Queue an incoming message
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push(MqttMessage::new(topic, payload));
    }

    /// Simulate the broker dropping the connection
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Check if a topic was subscribed to
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .collect()
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        if !self.connected {
            return Err(());
        }
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ()> {
        if !self.connected {
            return Err(());
        }
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        if !self.connected || self.incoming.is_empty() {
            None
        } else {
            Some(self.incoming.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> Result<(), ()> {
        self.reconnect_attempts += 1;
        if self.refuse_reconnect {
            return Err(());
        }
        // A fresh session has no subscriptions
        self.subscriptions.clear();
        self.connected = true;
        Ok(())
    }
}

/// Mock request server for testing.
///
/// Allows queuing requests and inspecting sent responses.
///
/// # Example
///
/// ```rust
/// use rs_trackside::hal::MockHttp;
/// use rs_trackside::traits::HttpRequest;
///
/// let mut http = MockHttp::new();
///
/// // Queue a request
/// http.queue_request(HttpRequest::get("/lego/train/config"));
///
/// assert_eq!(http.requests.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockHttp {
    /// Queue of requests to be returned by `try_recv_request()`.
    pub requests: Vec<HttpRequest>,
    /// Responses that have been sent.
    pub responses: Vec<HttpResponse>,
}

impl MockHttp {
    /// Creates a new mock request server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request to be returned
    pub fn queue_request(&mut self, request: HttpRequest) {
        self.requests.push(request);
    }
}

impl RequestServer for MockHttp {
    type Error = ();

    fn try_recv_request(&mut self) -> Option<HttpRequest> {
        if self.requests.is_empty() {
            None
        } else {
            Some(self.requests.remove(0))
        }
    }

    fn send_response(&mut self, response: HttpResponse) -> Result<(), ()> {
        self.responses.push(response);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // MockBoard Tests
    // =========================================================================

    #[test]
    fn mock_board_default() {
        let mut board = MockBoard::new();
        assert!(board.servo_writes.is_empty());
        assert!(board.lamp_writes.is_empty());
        assert!(board.frames.is_empty());
        assert_eq!(board.read_level(34), PinLevel::High);
    }

    #[test]
    fn mock_board_set_input_overrides() {
        let mut board = MockBoard::new();
        board.set_input(34, PinLevel::Low);
        board.set_input(34, PinLevel::High);
        assert_eq!(board.inputs.len(), 1);
        assert_eq!(board.read_level(34), PinLevel::High);
    }

    #[test]
    fn mock_board_fail_writes() {
        let mut board = MockBoard::new();
        board.fail_writes = true;
        assert!(board.write_angle(13, 90).is_err());
        assert!(board.set_lamp(25, true).is_err());
        assert!(board.transmit(4, PfFrame(0)).is_err());
        assert!(board.servo_writes.is_empty());
    }

    #[test]
    fn mock_board_frames_on() {
        let mut board = MockBoard::new();
        board.transmit(4, PfFrame(1)).unwrap();
        board.transmit(5, PfFrame(2)).unwrap();
        board.transmit(4, PfFrame(3)).unwrap();
        assert_eq!(board.frames_on(4), [PfFrame(1), PfFrame(3)]);
    }

    // =========================================================================
    // MockClock Tests
    // =========================================================================

    #[test]
    fn mock_clock_set_and_advance() {
        let mut clock = MockClock::new();
        clock.set(1000);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 1250);
    }

    // =========================================================================
    // MockMqtt Tests
    // =========================================================================

    #[test]
    fn mock_mqtt_default() {
        let mqtt = MockMqtt::new();
        assert!(mqtt.connected);
        assert!(mqtt.published.is_empty());
        assert!(mqtt.subscriptions.is_empty());
        assert!(mqtt.incoming.is_empty());
    }

    #[test]
    fn mock_mqtt_queue_message_fifo() {
        let mut mqtt = MockMqtt::new();
        mqtt.queue_message("a", b"1".to_vec());
        mqtt.queue_message("b", b"2".to_vec());

        assert_eq!(mqtt.try_recv().map(|m| m.topic), Some("a".into()));
        assert_eq!(mqtt.try_recv().map(|m| m.topic), Some("b".into()));
        assert!(mqtt.try_recv().is_none());
    }

    #[test]
    fn mock_mqtt_disconnected_fails() {
        let mut mqtt = MockMqtt::new();
        mqtt.queue_message("a", b"1".to_vec());
        mqtt.disconnect();

        assert!(mqtt.publish("t", b"x", false).is_err());
        assert!(mqtt.subscribe("t").is_err());
        assert!(mqtt.try_recv().is_none());
    }

    #[test]
    fn mock_mqtt_reconnect_clears_subscriptions() {
        let mut mqtt = MockMqtt::new();
        mqtt.subscribe("lego/train/switch/0").unwrap();
        mqtt.disconnect();

        mqtt.reconnect().unwrap();
        assert!(mqtt.connected);
        assert!(mqtt.subscriptions.is_empty());
        assert_eq!(mqtt.reconnect_attempts, 1);
    }

    #[test]
    fn mock_mqtt_refuse_reconnect() {
        let mut mqtt = MockMqtt::new();
        mqtt.disconnect();
        mqtt.refuse_reconnect = true;
        assert!(mqtt.reconnect().is_err());
        assert!(!mqtt.connected);
    }

    // =========================================================================
    // MockHttp Tests
    // =========================================================================

    #[test]
    fn mock_http_request_response() {
        let mut http = MockHttp::new();
        http.queue_request(HttpRequest::get("/lego/train/config"));

        let request = http.try_recv_request().unwrap();
        assert_eq!(request.path, "/lego/train/config");
        assert!(http.try_recv_request().is_none());

        http.send_response(HttpResponse::ok_json("{}")).unwrap();
        assert_eq!(http.responses.len(), 1);
    }
}
