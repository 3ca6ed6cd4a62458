//! MQTT service runner for unified polling across platforms.
//!
//! Provides a platform-agnostic MQTT handler that works with any
//! implementation of the `MqttClient` trait.
//!
//! Inbound messages are turned back into command paths by appending the
//! payload to the topic, so `lego/train/switch/0` with payload `1` runs
//! `lego/train/switch/0/1`. Sensor changes go out on
//! `lego/train/position/<id>` with payload `0` or `1`.
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::TrainController;
//! use rs_trackside::config::MqttConfig;
//! use rs_trackside::hal::{MockBoard, MockMqtt};
//! use rs_trackside::registry::Registry;
//! use rs_trackside::services::MqttServiceRunner;
//!
//! let mut controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
//! let mut runner = MqttServiceRunner::new(MockMqtt::new(), &MqttConfig::default(), controller.registry());
//!
//! runner.client_mut().queue_message("lego/train/switch/0", b"1".to_vec());
//! runner.service(&mut controller, &[], 0);
//!
//! assert!(runner.client().is_subscribed("lego/train/motor/pf/#"));
//! assert_eq!(controller.hardware().angle(13), Some(135));
//! ```

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::commands::CommandSource;
use crate::config::MqttConfig;
use crate::registry::Registry;
use crate::sensors::SensorChange;
use crate::traits::MqttClient;

use super::http_handler::CommandTarget;

/// Wildcard subscription for every motor command.
pub const MOTOR_TOPIC: &str = "lego/train/motor/pf/#";

/// Topics the controller listens on for `registry`.
///
/// Switch and barrier topics carry the selector as payload; signal topics
/// carry the value, with the light in the topic.
pub fn control_topics(registry: &Registry) -> Vec<String> {
    let mut topics = Vec::new();
    topics.push(String::from(MOTOR_TOPIC));
    topics.extend(
        registry
            .switches()
            .iter()
            .map(|s| format!("lego/train/switch/{}", s.id)),
    );
    topics.extend(
        registry
            .barriers()
            .iter()
            .map(|b| format!("lego/train/barrier/{}", b.id)),
    );
    for signal in registry.signals() {
        for light in 0..2 {
            topics.push(format!("lego/train/signal/{}/{}", signal.id, light));
        }
    }
    topics
}

// ============================================================================
// MQTT Service Runner
// ============================================================================

/// What one [`MqttServiceRunner::service`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MqttReport {
    /// Whether the client was connected after reconnect handling
    pub connected: bool,
    /// Sensor changes published
    pub published: usize,
    /// Sensor changes dropped because the broker was unreachable
    pub dropped: usize,
    /// Inbound commands dispatched
    pub dispatched: usize,
}

/// Unified MQTT service runner for the cooperative loop and desktop.
///
/// Wraps any `MqttClient` implementation and provides:
/// - Reconnect with a minimum interval, and resubscription afterwards
/// - Sensor change publishing
/// - Inbound command dispatch
pub struct MqttServiceRunner<C: MqttClient> {
    client: C,
    topics: Vec<String>,
    subscribed: bool,
    reconnect_interval_ms: u64,
    last_reconnect_ms: Option<u64>,
}

impl<C: MqttClient> MqttServiceRunner<C> {
    /// Create a new MQTT service runner listening for `registry`'s actuators.
    pub fn new(client: C, config: &MqttConfig, registry: &Registry) -> Self {
        Self {
            client,
            topics: control_topics(registry),
            subscribed: false,
            reconnect_interval_ms: config.reconnect_interval_ms as u64,
            last_reconnect_ms: None,
        }
    }

    /// Get a reference to the MQTT client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Get a mutable reference to the MQTT client.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Topics subscribed after every (re)connect.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Whether the control topics are currently subscribed.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Subscribe to control topics.
    pub fn subscribe_control_topics(&mut self) -> Result<(), C::Error> {
        for topic in &self.topics {
            self.client.subscribe(topic)?;
        }
        self.subscribed = true;
        log::info!("subscribed to {} control topics", self.topics.len());
        Ok(())
    }

    /// Reconnect and resubscribe if needed. Returns whether the client is
    /// connected and subscribed afterwards.
    ///
    /// Reconnect attempts are spaced by the configured interval.
    pub fn ensure_connected(&mut self, now_ms: u64) -> bool {
        if !self.client.is_connected() {
            self.subscribed = false;

            let due = self
                .last_reconnect_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= self.reconnect_interval_ms);
            if !due {
                return false;
            }
            self.last_reconnect_ms = Some(now_ms);

            log::warn!("MQTT disconnected, reconnecting");
            if let Err(e) = self.client.reconnect() {
                log::warn!("MQTT reconnect failed: {:?}", e);
                return false;
            }
            log::info!("MQTT reconnected");
        }

        if !self.subscribed {
            if let Err(e) = self.subscribe_control_topics() {
                log::warn!("MQTT subscribe failed: {:?}", e);
                return false;
            }
        }
        true
    }

    /// Publish sensor changes. Stops at the first failure and returns it.
    pub fn publish_sensor_changes(&mut self, changes: &[SensorChange]) -> Result<usize, C::Error> {
        for change in changes {
            self.client
                .publish(&change.topic(), change.payload(), false)?;
        }
        Ok(changes.len())
    }

    /// Poll for incoming MQTT messages and dispatch them.
    ///
    /// Returns the number of messages handled.
    pub fn poll<T: CommandTarget + ?Sized>(&mut self, target: &mut T) -> usize {
        let mut handled = 0;
        while let Some(msg) = self.client.try_recv() {
            let path = msg.command_path();
            let response = target.execute(&path, CommandSource::Mqtt);
            log::debug!("mqtt {} -> {}", path, response);
            handled += 1;
        }
        handled
    }

    /// One MQTT step of the control loop: reconnect if needed, publish
    /// `changes`, then dispatch inbound messages.
    ///
    /// Changes that cannot be published are dropped.
    pub fn service<T: CommandTarget + ?Sized>(
        &mut self,
        target: &mut T,
        changes: &[SensorChange],
        now_ms: u64,
    ) -> MqttReport {
        let mut report = MqttReport {
            connected: self.ensure_connected(now_ms),
            ..Default::default()
        };

        if !report.connected {
            if !changes.is_empty() {
                log::warn!("MQTT unavailable, dropping {} sensor changes", changes.len());
            }
            report.dropped = changes.len();
            return report;
        }

        match self.publish_sensor_changes(changes) {
            Ok(n) => report.published = n,
            Err(e) => {
                log::warn!("MQTT publish failed: {:?}", e);
                report.dropped = changes.len();
            }
        }

        report.dispatched = self.poll(target);
        report
    }
}
