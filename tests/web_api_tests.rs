//! Integration tests for the web API.
//!
//! These tests verify the axum router serves the command surface.

#![cfg(feature = "web")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use rs_trackside::hal::MockBoard;
use rs_trackside::registry::Registry;
use rs_trackside::services::{build_router, SharedTrainState, WebServerConfig};
use rs_trackside::{ActuatorKind, LayoutConfig, Selector, TrainController};

fn create_test_app() -> (axum::Router, Arc<SharedTrainState<MockBoard>>) {
    let controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
    let state = Arc::new(SharedTrainState::new(controller));
    let config = WebServerConfig::default();
    let router = build_router(Arc::clone(&state), &config);
    (router, state)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_get_config() {
    let (app, _state) = create_test_app();

    let (status, json) = get(app, "/lego/train/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isok"], true);

    let train = &json["lego"]["train"];
    assert_eq!(train["switches"].as_array().unwrap().len(), 2);
    assert_eq!(train["positions"][1]["pin"], 35);
    assert_eq!(train["signals"][0]["pins"], serde_json::json!([25, 26]));
}

#[tokio::test]
async fn test_config_is_byte_exact() {
    let layout = LayoutConfig::empty().with_ir_output(4).with_barrier(14);
    let controller = TrainController::new(Registry::from_layout(&layout), MockBoard::new(), 0);
    let state = Arc::new(SharedTrainState::new(controller));
    let app = build_router(state, &WebServerConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/lego/train/config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()["content-type"],
        "application/json"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(
        &body[..],
        br#"{"isok":true,"lego":{"train":{"motors":{"pf":[{"id":0,"pin":4}]},"positions":[],"switches":[],"barriers":[{"id":0,"pin":14}],"signals":[]}}}"#
    );
}

#[tokio::test]
async fn test_switch_command() {
    let (app, state) = create_test_app();

    let (status, json) = get(app, "/lego/train/switch/1/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"isok": true}));

    state.with_controller(|controller| {
        assert_eq!(controller.hardware().angle(12), Some(135));
        assert_eq!(
            controller.states().selector(ActuatorKind::Switch, 1),
            Some(Selector::Max)
        );
    });
}

#[tokio::test]
async fn test_motor_command_then_tick() {
    let (app, state) = create_test_app();

    let (_, json) = get(app, "/lego/train/motor/pf/3/1/6").await;
    assert_eq!(json["isok"], true);

    let report = state.tick();
    assert!(report.ir_frame.is_some());
    state.with_controller(|controller| {
        assert_eq!(controller.hardware().frames_on(4).len(), 1);
    });
}

#[tokio::test]
async fn test_out_of_range_is_still_ok() {
    let (app, state) = create_test_app();

    let (status, json) = get(app, "/lego/train/barrier/5/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isok"], true);
    state.with_controller(|controller| assert!(controller.hardware().servo_writes.is_empty()));
}

#[tokio::test]
async fn test_malformed_path_not_ok() {
    let (app, _state) = create_test_app();

    let (status, json) = get(app.clone(), "/lego/plane/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"isok": false}));

    let (status, json) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isok"], false);
}

#[tokio::test]
async fn test_query_string_ignored() {
    let (app, state) = create_test_app();

    let (_, json) = get(app, "/lego/train/signal/1/1/1?ts=12345").await;
    assert_eq!(json["isok"], true);
    state.with_controller(|controller| {
        assert_eq!(controller.hardware().lamp(32), Some(true));
        assert_eq!(controller.hardware().lamp(27), Some(false));
    });
}

#[tokio::test]
async fn test_percent_encoded_path_is_decoded() {
    let (app, state) = create_test_app();

    let (_, json) = get(app, "/lego/train/motor/pf/0/0/%2D3").await;
    assert_eq!(json["isok"], true);
    state.with_controller(|controller| {
        let pending = controller.ir_queue().pending().unwrap();
        assert_eq!(pending.command.speed, -3);
    });
}

#[tokio::test]
async fn test_post_not_allowed() {
    let (app, state) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/lego/train/switch/0/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    state.with_controller(|controller| assert!(controller.hardware().servo_writes.is_empty()));
}

#[tokio::test]
async fn test_cors_headers() {
    let (app, _state) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/lego/train/config")
                .header("Origin", "http://layout.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
