//! Network abstraction traits for MQTT and the request/response channel.
//!
//! Both transports carry the same command paths (see [`crate::commands`]).
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`MqttClient`] | Pub/sub messaging: inbound commands, sensor events |
//! | [`RequestServer`] | Polled HTTP-style request/response |
//!
//! # MQTT Topics
//!
//! ```text
//! lego/train/motor/pf/#                 - Motor commands (subscribed)
//! lego/train/switch/<id>                - Switch selector payload (subscribed)
//! lego/train/barrier/<id>               - Barrier selector payload (subscribed)
//! lego/train/signal/<id>/<light>        - Signal value payload (subscribed)
//! lego/train/position/<id>              - Sensor changes, "0"/"1" (published)
//! ```
//!
//! # HTTP API
//!
//! ```text
//! GET /lego/train/config                - {"isok":true,"lego":{...}}
//! GET /lego/train/switch/0/1            - {"isok":true}
//! ```

use alloc::string::String;
use alloc::vec::Vec;

// ============================================================================
// MQTT Client Trait (Sync-First Design)
// ============================================================================

/// MQTT client trait for pub/sub messaging.
///
/// Sync-first so it fits both blocking embedded stacks and a desktop client
/// running its event loop elsewhere.
///
/// # Implementation Notes
///
/// - `publish` and `subscribe` are synchronous (blocking on embedded)
/// - `try_recv` is non-blocking for polling patterns
/// - `reconnect` is called by the service runner whenever
///   `is_connected()` is false; subscriptions are redone afterwards
///
/// # Example
///
/// ```rust,ignore
/// use rs_trackside::traits::MqttClient;
///
/// fn report<M: MqttClient>(client: &mut M, sensor: u8, occupied: bool) {
///     let topic = format!("lego/train/position/{}", sensor);
///     let payload: &[u8] = if occupied { b"1" } else { b"0" };
///     client.publish(&topic, payload, false).unwrap();
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error: core::fmt::Debug;

    /// Publish a message to a topic (blocking).
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Subscribe to a topic (blocking).
    ///
    /// Supports wildcards: `lego/train/motor/pf/#`
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Try to receive the next message (non-blocking).
    ///
    /// Returns `None` if no message is available. This should never block.
    fn try_recv(&mut self) -> Option<MqttMessage>;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool;

    /// Attempt to re-establish the broker connection.
    fn reconnect(&mut self) -> Result<(), Self::Error>;
}

/// An MQTT message received from a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Create a new MQTT message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }

    /// The command path carried by this message: `topic + "/" + payload`.
    ///
    /// A non-UTF-8 payload is treated as empty.
    pub fn command_path(&self) -> String {
        let mut path = String::with_capacity(self.topic.len() + 1 + self.payload.len());
        path.push_str(&self.topic);
        path.push('/');
        path.push_str(self.payload_str().unwrap_or(""));
        path
    }
}

// ============================================================================
// Request Server Trait
// ============================================================================

/// Polled request/response server.
///
/// The cooperative control loop takes at most one request per tick and
/// answers it before doing anything else, so the trait is non-blocking.
///
/// Note: callback-based servers (such as the axum router in
/// `services::web`) call `HttpApiHandler` directly instead.
pub trait RequestServer {
    /// Error type for sending responses.
    type Error: core::fmt::Debug;

    /// Take the next pending request, if any. Never blocks.
    fn try_recv_request(&mut self) -> Option<HttpRequest>;

    /// Answer the request most recently returned by `try_recv_request`.
    fn send_response(&mut self, response: HttpResponse) -> Result<(), Self::Error>;
}

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET request. The only method commands are served on.
    Get,
    /// HTTP POST request.
    Post,
    /// HTTP PUT request.
    Put,
    /// HTTP DELETE request.
    Delete,
}

/// An HTTP request received by the server.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path (e.g., "/lego/train/config").
    pub path: String,
    /// Request body, if present.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// A GET request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Returns the body as a UTF-8 string, if valid.
    pub fn body_str(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| core::str::from_utf8(b).ok())
    }
}

/// An HTTP response to send to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status: u16,
    /// Content-Type header value.
    pub content_type: &'static str,
    /// Response body as bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a 200 OK response with JSON content.
    pub fn ok_json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    /// Creates an error response with the given status code.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: alloc::format!(r#"{{"error":"{}"}}"#, message).into_bytes(),
        }
    }

    /// Creates a 405 Method Not Allowed response.
    pub fn method_not_allowed() -> Self {
        Self::error(405, "method not allowed")
    }

    /// Returns the body as a UTF-8 string, if valid.
    pub fn body_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.body).ok()
    }
}
