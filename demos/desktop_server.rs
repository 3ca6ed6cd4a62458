//! Desktop server for trying the command surface without hardware.
//!
//! Runs the controller against a mock board, so every command is accepted
//! and logged but nothing moves:
//! - HTTP on the configured port, e.g. `curl localhost:8080/lego/train/config`
//! - MQTT against the configured broker
//!
//! # Shared State
//!
//! Web and MQTT share a single `TrainController` via `SharedTrainState`.
//! A 20ms update task polls sensors and sends IR repeats, and its sensor
//! changes are published by the MQTT handler.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=debug cargo run --example desktop_server --features web,mqtt
//! ```
//!
//! # Configuration
//!
//! Set `TRACKSIDE_CONFIG` to a JSON file holding any part of `Config`.
//! Missing fields keep their defaults:
//!
//! ```json
//! { "web": { "port": 8080 }, "mqtt": { "host": "192.168.1.100" } }
//! ```

use std::path::Path;

use anyhow::Context;

use rs_trackside::hal::MockBoard;
use rs_trackside::{Config, TrainController};

#[cfg(any(feature = "web", feature = "mqtt"))]
use std::sync::Arc;

#[cfg(any(feature = "web", feature = "mqtt"))]
use std::time::Duration;

#[cfg(any(feature = "web", feature = "mqtt"))]
use rs_trackside::services::SharedTrainState;

#[cfg(feature = "web")]
use rs_trackside::services::WebServerConfig;

#[cfg(feature = "mqtt")]
use rs_trackside::services::{MqttHandler, MqttRuntimeConfig};

const CONFIG_ENV: &str = "TRACKSIDE_CONFIG";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => load_config(Path::new(&path))?,
        None => Config::default().with_web(rs_trackside::WebConfig::default().with_port(8080)),
    };

    let mut controller = TrainController::from_config(&config, MockBoard::new());
    controller
        .init()
        .map_err(|()| anyhow::anyhow!("mock board refused initial outputs"))?;

    let rt = tokio::runtime::Runtime::new().context("failed to create runtime")?;
    rt.block_on(run(controller, config))
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing config {}", path.display()))?;
    log::info!("loaded config from {}", path.display());
    Ok(config)
}

#[cfg(any(feature = "web", feature = "mqtt"))]
async fn run(controller: TrainController<MockBoard>, config: Config) -> anyhow::Result<()> {
    let state = Arc::new(SharedTrainState::new(controller));
    spawn_update_loop(Arc::clone(&state), config.controller.tick_interval_ms);

    #[cfg(feature = "mqtt")]
    if config.mqtt.enabled {
        let mqtt_config = MqttRuntimeConfig::from_config(&config.mqtt);
        log::info!("MQTT broker {}:{}", mqtt_config.host, mqtt_config.port);

        let handler = MqttHandler::new(Arc::clone(&state), mqtt_config);
        tokio::spawn(async move {
            if let Err(e) = handler.run().await {
                log::error!("MQTT handler stopped: {}", e);
            }
        });
    }

    #[cfg(feature = "web")]
    if config.web.enabled {
        let web_config = WebServerConfig::from_config(&config.web);
        rs_trackside::services::run_server(state, web_config)
            .await
            .context("web server failed")?;
        return Ok(());
    }

    // MQTT only: the spawned tasks run until the process is killed
    std::future::pending::<()>().await;
    Ok(())
}

#[cfg(not(any(feature = "web", feature = "mqtt")))]
async fn run(_controller: TrainController<MockBoard>, _config: Config) -> anyhow::Result<()> {
    anyhow::bail!("no transport enabled, run with --features web or --features mqtt")
}

/// Spawn the single controller update loop.
///
/// Every tick polls the sensors, queues their changes for MQTT and sends
/// one IR repeat.
#[cfg(any(feature = "web", feature = "mqtt"))]
fn spawn_update_loop(state: Arc<SharedTrainState<MockBoard>>, interval_ms: u32) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1) as u64));
        loop {
            interval.tick().await;
            let report = state.tick();
            for change in &report.sensor_changes {
                log::debug!("sensor {} -> {}", change.sensor, change.value);
            }
        }
    });
}
