//! Axum-based HTTP server for the command surface.
//!
//! Every command is a GET on its path:
//! - GET `/lego/train/config` - Topology document
//! - GET `/lego/train/motor/pf/<channel>/<side>/<speed>` - Queue an IR motor command
//! - GET `/lego/train/switch/<id>/<selector>` - Move a switch
//! - GET `/lego/train/barrier/<id>/<selector>` - Move a barrier
//! - GET `/lego/train/signal/<id>/<light>/<value>` - Set a signal
//!
//! Responses are `{"isok":..}` with status 200, including for malformed
//! paths. Other methods get 405.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{Method, Uri},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::config::WebConfig;
use crate::traits::Board;

use super::http_handler::{ApiResult, HttpApiHandler};
use super::shared::SharedTrainState;

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /*path - Dispatch the command named by the path.
///
/// Runs on the blocking pool since servo commands hold the settle delay.
async fn run_command<H: Board + Send + 'static>(
    State(state): State<Arc<SharedTrainState<H>>>,
    uri: Uri,
) -> ApiResult {
    let path = decode_path(uri.path());
    tokio::task::spawn_blocking(move || HttpApiHandler::new(state).handle_get(&path))
        .await
        .unwrap_or_else(|e| {
            log::warn!("command task failed: {}", e);
            ApiResult::error(500, "command task failed")
        })
}

/// Percent-decode a request path, keeping it raw when it does not decode to UTF-8.
fn decode_path(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            log::debug!("path {} kept undecoded: {}", path, e);
            path.to_owned()
        }
    }
}

/// Fallback for paths the wildcard route does not match (`/`).
async fn fallback<H: Board + Send + 'static>(
    state: State<Arc<SharedTrainState<H>>>,
    method: Method,
    uri: Uri,
) -> ApiResult {
    if method != Method::GET {
        return ApiResult::error(405, "method not allowed");
    }
    run_command(state, uri).await
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
    /// Requests taking longer than this get 408
    pub request_timeout: Duration,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self::from_config(&WebConfig::default())
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Create from shared WebConfig
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
            request_timeout: Duration::from_millis(config.request_timeout_ms as u64),
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router<H: Board + Send + 'static>(
    state: Arc<SharedTrainState<H>>,
    config: &WebServerConfig,
) -> Router {
    let mut router = Router::new()
        .route("/*path", get(run_command::<H>))
        .fallback(fallback::<H>)
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout));

    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server with shared state
///
/// Runs until the listener fails. Share `state` with the MQTT handler and
/// the update task so every service drives the same controller.
///
/// # Example
///
/// ```ignore
/// let state = Arc::new(SharedTrainState::new(controller));
///
/// let mqtt_handler = MqttHandler::new(Arc::clone(&state), mqtt_config);
/// run_server(state, web_config).await?;
/// ```
pub async fn run_server<H: Board + Send + 'static>(
    state: Arc<SharedTrainState<H>>,
    config: WebServerConfig,
) -> Result<(), std::io::Error> {
    let router = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    log::info!("web server listening on http://{}", config.addr);

    axum::serve(listener, router).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_from_config() {
        let web = WebConfig::default()
            .with_port(9000)
            .with_cors(false)
            .with_request_timeout_ms(2500);
        let config = WebServerConfig::from_config(&web);

        assert_eq!(config.addr.port(), 9000);
        assert!(!config.cors_permissive);
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_server_config_builders() {
        let config = WebServerConfig::new(([127, 0, 0, 1], 8081))
            .cors(false)
            .request_timeout(Duration::from_secs(1));

        assert_eq!(config.addr, SocketAddr::from(([127, 0, 0, 1], 8081)));
        assert!(!config.cors_permissive);
        assert_eq!(config.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(
            decode_path("/lego/train/motor/pf/0/0/%2D3"),
            "/lego/train/motor/pf/0/0/-3"
        );
        assert_eq!(decode_path("/lego/train/config"), "/lego/train/config");
        // Not UTF-8 once decoded
        assert_eq!(decode_path("/lego/%FF"), "/lego/%FF");
    }
}
