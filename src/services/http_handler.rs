//! Request handling shared by every request/response transport.
//!
//! A request path is the command path with a leading `/`. The handler strips
//! it, dispatches the command and renders `{"isok":..}` (plus the topology for
//! `config`). The same code serves the cooperative control loop, a
//! callback-based embedded server and the axum router.
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::TrainController;
//! use rs_trackside::hal::MockBoard;
//! use rs_trackside::registry::Registry;
//! use rs_trackside::services::HttpApiHandler;
//!
//! let mut controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
//! let mut handler = HttpApiHandler::new(&mut controller);
//!
//! let result = handler.handle_get("/lego/train/switch/0/1");
//! assert_eq!(result.body(), r#"{"isok":true}"#);
//! ```

use alloc::string::String;

use crate::commands::{CommandOutcome, CommandSource};
use crate::controller::TrainController;
use crate::topology::{Response, ResponseJson, NOT_OK_JSON};
use crate::traits::{Board, HttpMethod, HttpRequest, HttpResponse};

// ============================================================================
// Command Target
// ============================================================================

/// Something that can execute a command and render the response document.
///
/// Implemented by [`TrainController`] itself and, on `std`, by the shared
/// state wrapper used by the async services.
pub trait CommandTarget {
    /// Dispatch `command` and render the response.
    fn execute(&mut self, command: &str, source: CommandSource) -> ResponseJson;
}

impl<H: Board> CommandTarget for TrainController<H> {
    fn execute(&mut self, command: &str, source: CommandSource) -> ResponseJson {
        let outcome = self.dispatch(command, source);
        render_outcome(self, outcome)
    }
}

impl<T: CommandTarget + ?Sized> CommandTarget for &mut T {
    fn execute(&mut self, command: &str, source: CommandSource) -> ResponseJson {
        (**self).execute(command, source)
    }
}

/// Render the response for a dispatch result.
///
/// Hardware errors are logged and reported as `{"isok":false}`.
pub fn render_outcome<H: Board>(
    controller: &TrainController<H>,
    outcome: Result<CommandOutcome, H::Error>,
) -> ResponseJson {
    let response = match outcome {
        Ok(outcome) if outcome.topology_requested() => {
            Response::with_topology(controller.registry())
        }
        Ok(outcome) => Response::ack(outcome.accepted()),
        Err(e) => {
            log::warn!("hardware error while applying command: {:?}", e);
            Response::ack(false)
        }
    };

    response.to_json().unwrap_or_else(|e| {
        log::warn!("response does not fit buffer: {:?}", e);
        not_ok()
    })
}

fn not_ok() -> ResponseJson {
    let mut json = ResponseJson::new();
    let _ = json.push_str(NOT_OK_JSON);
    json
}

/// Command path for a request path: leading `/` and any query string removed.
pub fn command_path(request_path: &str) -> &str {
    let path = request_path.split('?').next().unwrap_or("");
    path.strip_prefix('/').unwrap_or(path)
}

// ============================================================================
// API Response Types
// ============================================================================

/// Result of an API operation.
#[derive(Debug)]
pub enum ApiResult {
    /// Success with JSON response body.
    Ok(String),
    /// Error with status code and message.
    Error(u16, String),
}

impl ApiResult {
    /// Create a success response.
    pub fn ok(json: impl Into<String>) -> Self {
        Self::Ok(json.into())
    }

    /// Create an error response.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::Error(status, message.into())
    }

    /// Check if this is a success response.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Get the JSON body (for success) or error message.
    pub fn body(&self) -> &str {
        match self {
            Self::Ok(json) => json,
            Self::Error(_, msg) => msg,
        }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Ok(_) => 200,
            Self::Error(status, _) => *status,
        }
    }
}

impl From<ApiResult> for HttpResponse {
    fn from(result: ApiResult) -> Self {
        match result {
            ApiResult::Ok(json) => HttpResponse::ok_json(&json),
            ApiResult::Error(status, message) => HttpResponse::error(status, &message),
        }
    }
}

// Axum integration: allow ApiResult to be returned directly from handlers
#[cfg(feature = "web")]
impl axum::response::IntoResponse for ApiResult {
    fn into_response(self) -> axum::response::Response {
        use axum::http::{header, StatusCode};

        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = match self {
            ApiResult::Ok(json) => json,
            ApiResult::Error(_, message) => alloc::format!(r#"{{"error":"{}"}}"#, message),
        };

        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}

// ============================================================================
// HTTP API Handler
// ============================================================================

/// Shared request handler.
///
/// Every command is served on `GET /<command path>`. Commands that do not
/// match the grammar still answer 200 with `{"isok":false}`.
pub struct HttpApiHandler<T: CommandTarget> {
    target: T,
}

impl<T: CommandTarget> HttpApiHandler<T> {
    /// Create a new handler for `target`.
    pub fn new(target: T) -> Self {
        Self { target }
    }

    /// GET /<command path> - Dispatch a command.
    pub fn handle_get(&mut self, path: &str) -> ApiResult {
        let json = self.target.execute(command_path(path), CommandSource::Http);
        ApiResult::ok(json.as_str())
    }

    /// Route a full request. Only GET is served.
    pub fn handle_request(&mut self, request: &HttpRequest) -> HttpResponse {
        match request.method {
            HttpMethod::Get => self.handle_get(&request.path).into(),
            _ => HttpResponse::method_not_allowed(),
        }
    }
}
