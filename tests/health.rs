use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use slope_race_server::app::AppState;
use slope_race_server::config::{Config, RoomSettings};
use slope_race_server::http::build_router;

fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "debug".to_string(),
        client_origin: "*".to_string(),
        room: RoomSettings {
            idle_timeout: Duration::from_secs(5),
            ..RoomSettings::default()
        },
        room_command_buffer: 32,
        input_rate_limit: 60,
    }
}

#[tokio::test]
async fn health_reports_rooms_and_connections() {
    let router = build_router(AppState::new(test_config()));

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["active_rooms"], 0);
    assert_eq!(json["active_connections"], 0);
}

#[tokio::test]
async fn room_endpoint_requires_websocket_upgrade() {
    let state = AppState::new(test_config());
    let router = build_router(state.clone());

    let response = router
        .oneshot(Request::get("/ws/ABCD").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert_eq!(state.rooms.active_rooms(), 0);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let router = build_router(AppState::new(test_config()));

    let response = router
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
