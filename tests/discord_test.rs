use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::Duration;

use xelis_stats_bot::platform::{DiscordClient, DiscordConfig, Platform, PlatformError};
use xelis_stats_bot::types::SlotId;

const TOKEN: &str = "test-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bot test-token")
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "401: Unauthorized", "code": 0}))).into_response();
    }
    Json(json!({"id": "1", "username": "stats-bot"})).into_response()
}

fn special_status(id: &str) -> Option<Response> {
    match id {
        "404" => Some((StatusCode::NOT_FOUND, Json(json!({"message": "Unknown Channel", "code": 10003}))).into_response()),
        "403" => Some((StatusCode::FORBIDDEN, Json(json!({"message": "Missing Permissions", "code": 50013}))).into_response()),
        "429" => Some(
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("retry-after", "5")],
                Json(json!({"message": "You are being rate limited.", "retry_after": 4.2, "global": false})),
            )
                .into_response(),
        ),
        "430" => Some(
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"message": "You are being rate limited.", "retry_after": 2.5, "global": false})),
            )
                .into_response(),
        ),
        "500" => Some((StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()),
        _ => None,
    }
}

async fn get_channel(Path(id): Path<String>) -> Response {
    if let Some(response) = special_status(&id) {
        return response;
    }
    Json(json!({"id": id, "name": "Price: $1.0000", "parent_id": "1000", "type": 2})).into_response()
}

async fn patch_channel(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    if let Some(response) = special_status(&id) {
        return response;
    }
    Json(json!({"id": id, "name": body["name"], "parent_id": "1000", "type": 2})).into_response()
}

async fn create_channel(Path(guild): Path<String>, Json(body): Json<Value>) -> Response {
    if guild != "77" || body["type"] != 2 || body["parent_id"] != "1000" {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "Invalid Form Body"}))).into_response();
    }
    Json(json!({"id": "5001", "name": body["name"], "parent_id": "1000", "type": 2})).into_response()
}

async fn client_with_token(token: &str) -> DiscordClient {
    let app = Router::new()
        .route("/users/@me", get(me))
        .route("/channels/:id", get(get_channel).patch(patch_channel))
        .route("/guilds/:guild/channels", post(create_channel));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    DiscordClient::new(DiscordConfig {
        api_base: format!("http://{}", addr),
        timeout: Duration::from_secs(5),
        ..DiscordConfig::new(token, SlotId(77))
    })
    .unwrap()
}

#[tokio::test]
async fn test_current_user_sends_bot_token() {
    let client = client_with_token(TOKEN).await;
    assert_eq!(client.current_user().await.unwrap(), "stats-bot");

    let rejected = client_with_token("wrong").await;
    assert!(matches!(rejected.current_user().await, Err(PlatformError::Unauthorized(_))));
}

#[tokio::test]
async fn test_get_slot_and_missing_slot() {
    let client = client_with_token(TOKEN).await;

    let slot = client.get_slot(SlotId(1234)).await.unwrap().unwrap();
    assert_eq!(slot.id, SlotId(1234));
    assert_eq!(slot.name, "Price: $1.0000");
    assert_eq!(slot.parent_id, Some(SlotId(1000)));

    assert_eq!(client.get_slot(SlotId(404)).await.unwrap(), None);
    assert_eq!(client.get_container(SlotId(404)).await.unwrap(), None);
}

#[tokio::test]
async fn test_create_slot_under_category() {
    let client = client_with_token(TOKEN).await;
    let id = client.create_slot(SlotId(1000), "Price: $2.5000").await.unwrap();
    assert_eq!(id, SlotId(5001));

    let rejected = client.create_slot(SlotId(999), "Price: $2.5000").await;
    assert!(matches!(rejected, Err(PlatformError::Api { status: 400, .. })));
}

#[tokio::test]
async fn test_rename_errors_are_classified() {
    let client = client_with_token(TOKEN).await;

    client.rename_slot(SlotId(1234), "Block Time: 15s avg").await.unwrap();
    client.rename_container(SlotId(1000), "XELIS STATS").await.unwrap();

    let forbidden = client.rename_slot(SlotId(403), "x").await;
    assert!(matches!(forbidden, Err(PlatformError::Unauthorized(ref message)) if message == "Missing Permissions"));

    let failed = client.rename_slot(SlotId(500), "x").await;
    assert!(matches!(failed, Err(PlatformError::Api { status: 500, .. })));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let client = client_with_token(TOKEN).await;

    let from_header = client.rename_slot(SlotId(429), "x").await.unwrap_err();
    assert!(from_header.is_rate_limit());
    assert!(matches!(
        from_header,
        PlatformError::RateLimited { retry_after: Some(wait) } if wait == Duration::from_secs(5)
    ));

    let from_body = client.get_slot(SlotId(430)).await.unwrap_err();
    assert!(matches!(
        from_body,
        PlatformError::RateLimited { retry_after: Some(wait) } if wait == Duration::from_secs(3)
    ));
}
