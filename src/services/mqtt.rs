//! Async MQTT handler for the desktop build.
//!
//! **Subscribe Topics** (for every registered actuator):
//! - `lego/train/motor/pf/#` - Motor commands, payload is the speed
//! - `lego/train/switch/<id>` - Payload is the selector
//! - `lego/train/barrier/<id>` - Payload is the selector
//! - `lego/train/signal/<id>/<light>` - Payload is the value
//!
//! **Publish Topics:**
//! - `lego/train/position/<id>` - `0` clear, `1` occupied, on every change
//!
//! Inbound messages run `topic + "/" + payload` through the same dispatcher
//! as HTTP. Subscriptions are renewed on every `ConnAck`, so a broker restart
//! does not silently drop them.
//!
//! # Shared State
//!
//! ```ignore
//! let state = Arc::new(SharedTrainState::new(controller));
//! let handler = MqttHandler::new(Arc::clone(&state), MqttRuntimeConfig::from_config(&config.mqtt));
//! tokio::spawn(handler.run());
//! ```

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use crate::config::MqttConfig as SharedMqttConfig;
use crate::traits::{Board, MqttMessage};
use crate::CommandSource;

use super::mqtt_runner::control_topics;
use super::shared::SharedTrainState;

// ============================================================================
// Configuration
// ============================================================================

/// Runtime MQTT client configuration for `rumqttc`.
///
/// This struct uses `String` for runtime compatibility with the `rumqttc` library.
/// For embedded/no-alloc contexts, use [`crate::config::MqttConfig`] which uses
/// fixed-size `ShortString` types and convert with [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// MQTT broker hostname
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Username, empty for anonymous
    pub username: String,
    /// Password
    pub password: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Wait between reconnect attempts
    pub reconnect_interval_ms: u64,
    /// How often queued sensor changes are flushed
    pub publish_interval_ms: u64,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self::from_config(&SharedMqttConfig::default())
    }
}

impl MqttRuntimeConfig {
    /// Create a new config with the given broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create from shared MqttConfig
    pub fn from_config(config: &SharedMqttConfig) -> Self {
        Self {
            host: config.host.as_str().to_string(),
            port: config.port,
            client_id: config.client_id.as_str().to_string(),
            username: config.username.as_str().to_string(),
            password: config.password.as_str().to_string(),
            keep_alive_secs: config.keep_alive_secs,
            reconnect_interval_ms: config.reconnect_interval_ms as u64,
            publish_interval_ms: 20,
        }
    }

    /// Set the client ID
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set broker credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the publish interval
    pub fn publish_interval_ms(mut self, ms: u64) -> Self {
        self.publish_interval_ms = ms;
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs as u64));
        if !self.username.is_empty() {
            options.set_credentials(&self.username, &self.password);
        }
        options
    }
}

// ============================================================================
// MQTT Handler
// ============================================================================

/// MQTT handler that bridges the broker to the shared controller.
pub struct MqttHandler<H: Board + Send + 'static> {
    state: Arc<SharedTrainState<H>>,
    config: MqttRuntimeConfig,
    topics: Vec<String>,
}

impl<H: Board + Send + 'static> MqttHandler<H> {
    /// Create a handler subscribed to the controller's actuators.
    pub fn new(state: Arc<SharedTrainState<H>>, config: MqttRuntimeConfig) -> Self {
        let topics = state.with_controller(|controller| control_topics(controller.registry()));
        Self {
            state,
            config,
            topics,
        }
    }

    /// Get a reference to the shared state.
    pub fn state(&self) -> Arc<SharedTrainState<H>> {
        Arc::clone(&self.state)
    }

    /// Topics subscribed on every connection.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Run the MQTT handler
    ///
    /// Handles MQTT messages until the client is dropped. Connection errors
    /// are logged and retried after the reconnect interval.
    pub async fn run(self) -> Result<(), MqttError> {
        let (client, mut eventloop) = AsyncClient::new(self.config.options(), 32);

        // Publisher task: flush the sensor outbox
        let client_for_publish = client.clone();
        let state_for_publish = Arc::clone(&self.state);
        let publish_interval = Duration::from_millis(self.config.publish_interval_ms.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(publish_interval);
            loop {
                interval.tick().await;
                if let Err(e) = flush_outbox(&state_for_publish, &client_for_publish).await {
                    log::warn!("{}, publisher stopped", e);
                    return;
                }
            }
        });

        // Main event loop
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    log::info!(
                        "MQTT connected to {}:{}",
                        self.config.host,
                        self.config.port
                    );
                    self.subscribe_all(&client).await?;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.handle_message(&publish.topic, &publish.payload).await;
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("MQTT connection error: {}", e);
                    tokio::time::sleep(Duration::from_millis(self.config.reconnect_interval_ms))
                        .await;
                }
            }
        }
    }

    async fn subscribe_all(&self, client: &AsyncClient) -> Result<(), MqttError> {
        for topic in &self.topics {
            client
                .subscribe(topic, QoS::AtLeastOnce)
                .await
                .map_err(|e| MqttError::Subscribe(e.to_string()))?;
        }
        log::info!("subscribed to {} control topics", self.topics.len());
        Ok(())
    }

    /// Dispatch one inbound message and return the rendered response.
    async fn handle_message(&self, topic: &str, payload: &[u8]) -> String {
        let path = MqttMessage::new(topic, payload).command_path();
        let state = Arc::clone(&self.state);

        let result = tokio::task::spawn_blocking(move || {
            let response = state.dispatch(&path, CommandSource::Mqtt);
            (path, response)
        })
        .await;

        match result {
            Ok((path, response)) => {
                log::debug!("mqtt {} -> {}", path, response);
                response.as_str().to_string()
            }
            Err(e) => {
                log::warn!("MQTT command task failed: {}", e);
                crate::topology::NOT_OK_JSON.to_string()
            }
        }
    }
}

/// Publish every queued sensor change and return how many went out.
///
/// Stops at the first failure; the changes after it are dropped.
pub async fn flush_outbox<H: Board>(
    state: &SharedTrainState<H>,
    client: &AsyncClient,
) -> Result<usize, MqttError> {
    let changes = state.take_sensor_changes();
    for change in &changes {
        client
            .publish(change.topic(), QoS::AtMostOnce, false, change.payload())
            .await
            .map_err(|e| MqttError::Publish(format!("{}: {}", change.topic(), e)))?;
    }
    Ok(changes.len())
}

/// MQTT-related errors
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// Failed to subscribe to topic
    #[error("MQTT subscribe error: {0}")]
    Subscribe(String),
    /// Failed to publish message
    #[error("MQTT publish error: {0}")]
    Publish(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::short_string;
    use crate::hal::MockBoard;
    use crate::registry::{ActuatorKind, Registry};
    use crate::state::Selector;
    use crate::TrainController;

    fn shared() -> Arc<SharedTrainState<MockBoard>> {
        let controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
        Arc::new(SharedTrainState::new(controller))
    }

    // ========================================================================
    // MqttRuntimeConfig tests
    // ========================================================================

    #[test]
    fn test_mqtt_config_default() {
        let config = MqttRuntimeConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.client_id, "rs-trackside");
        assert!(config.username.is_empty());
    }

    #[test]
    fn test_mqtt_config_new() {
        let config = MqttRuntimeConfig::new("mqtt.example.com", 8883);
        assert_eq!(config.host, "mqtt.example.com");
        assert_eq!(config.port, 8883);
        assert_eq!(config.client_id, "rs-trackside");
    }

    #[test]
    fn test_mqtt_config_builder_chaining() {
        let config = MqttRuntimeConfig::new("broker.local", 1883)
            .client_id("yard-1")
            .credentials("lego", "bricks")
            .publish_interval_ms(50);

        assert_eq!(config.client_id, "yard-1");
        assert_eq!(config.username, "lego");
        assert_eq!(config.password, "bricks");
        assert_eq!(config.publish_interval_ms, 50);
    }

    #[test]
    fn test_mqtt_config_from_config() {
        let mut shared_config = SharedMqttConfig::default()
            .with_host("mqtt.test.com")
            .with_port(8883)
            .with_reconnect_interval_ms(2500);
        shared_config.client_id = short_string("test-id");
        shared_config.keep_alive_secs = 60;

        let config = MqttRuntimeConfig::from_config(&shared_config);
        assert_eq!(config.host, "mqtt.test.com");
        assert_eq!(config.port, 8883);
        assert_eq!(config.client_id, "test-id");
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.reconnect_interval_ms, 2500);
    }

    // ========================================================================
    // MqttHandler tests
    // ========================================================================

    #[test]
    fn test_mqtt_handler_topics_follow_registry() {
        let handler = MqttHandler::new(shared(), MqttRuntimeConfig::default());
        assert_eq!(handler.topics().len(), 8);
        assert_eq!(handler.topics()[0], "lego/train/motor/pf/#");
        assert!(handler.topics().iter().any(|t| t == "lego/train/signal/1/1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handle_message_dispatches() {
        let state = shared();
        let handler = MqttHandler::new(Arc::clone(&state), MqttRuntimeConfig::default());

        let response = handler.handle_message("lego/train/barrier/0", b"1").await;
        assert_eq!(response, r#"{"isok":true}"#);

        let selector = state.with_controller(|c| c.states().selector(ActuatorKind::Barrier, 0));
        assert_eq!(selector, Some(Selector::Max));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handle_message_bad_payload() {
        let handler = MqttHandler::new(shared(), MqttRuntimeConfig::default());
        let response = handler.handle_message("lego/train/motor/xx/0/0", b"3").await;
        assert_eq!(response, r#"{"isok":false}"#);
    }

    // ========================================================================
    // Outbox tests
    // ========================================================================

    #[tokio::test]
    async fn test_flush_outbox_publishes_queued_changes() {
        let state = shared();
        state.tick();

        let (client, _eventloop) = AsyncClient::new(MqttRuntimeConfig::default().options(), 8);
        let sent = flush_outbox(&state, &client).await.unwrap();
        assert_eq!(sent, 2);
        assert!(state.take_sensor_changes().is_empty());
    }

    #[tokio::test]
    async fn test_flush_outbox_reports_publish_error() {
        let state = shared();
        state.tick();

        let (client, eventloop) = AsyncClient::new(MqttRuntimeConfig::default().options(), 8);
        drop(eventloop);

        let error = flush_outbox(&state, &client).await.unwrap_err();
        assert!(matches!(error, MqttError::Publish(ref msg) if msg.starts_with("lego/train/position/0")));
    }

    // ========================================================================
    // MqttError tests
    // ========================================================================

    #[test]
    fn test_mqtt_error_display() {
        let error = MqttError::Subscribe("topic not allowed".to_string());
        let display = format!("{}", error);
        assert!(display.contains("MQTT subscribe error"));
        assert!(display.contains("topic not allowed"));
    }

    #[test]
    fn test_mqtt_error_is_error() {
        let error = MqttError::Publish("test".to_string());
        let _: &dyn std::error::Error = &error;
    }
}
