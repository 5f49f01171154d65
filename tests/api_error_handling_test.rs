use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use habit_tracker::api;
use habit_tracker::config::Config;
use habit_tracker::db;
use habit_tracker::infrastructure::AppState;
use habit_tracker::seed;
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

// Helper to create a test app state
async fn setup_test_state() -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    seed::seed_catalog(&db).await.expect("Failed to seed catalog");
    AppState::new(db, Config::default())
}

async fn setup_app() -> Router {
    api::api_router_with_state(setup_test_state().await)
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, username: &str) -> String {
    let payload = json!({ "username": username, "password": "password123" });
    let req = Request::builder()
        .uri("/auth/register")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn send(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> Response {
    app.clone()
        .oneshot(request(method, uri, token, body))
        .await
        .unwrap()
}

async fn give_points(app: &Router, token: &str, points: i64) {
    let response = send(app, "POST", "/user/points", token, Some(json!({ "points": points }))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

fn event_payload(price: i64, max: Option<i32>) -> Value {
    let start = Utc::now() + Duration::days(3);
    json!({
        "title": "Morning routines",
        "description": "Share what works",
        "event_type": "workshop",
        "start_time": start,
        "end_time": start + Duration::hours(1),
        "max_participants": max,
        "price_points": price
    })
}

#[tokio::test]
async fn test_habit_validation_errors() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;

    let cases = [
        json!({ "title": "" }),
        json!({ "title": "   " }),
        json!({ "title": "x".repeat(51) }),
        json!({ "title": "Read", "description": "d".repeat(201) }),
        json!({ "title": "Read", "target_count": 0 }),
    ];
    for payload in cases {
        let response = send(&app, "POST", "/habits", &token, Some(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Validation error"));
    }

    let response = send(&app, "GET", "/habits", &token, None).await;
    assert_eq!(body_json(response).await["total"], 0);
}

#[tokio::test]
async fn test_missing_resources_return_404() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;

    let response = send(&app, "GET", "/habits/999", &token, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Resource not found");

    let response = send(
        &app,
        "PUT",
        "/habits/999",
        &token,
        Some(json!({ "title": "Non-existent" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "DELETE", "/habits/999", &token, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "POST", "/shop/items/999/purchase", &token, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "POST", "/events/999/join", &token, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/rooms/999/messages", &token, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shop_errors_map_to_status_codes() {
    let app = setup_app().await;
    let token = register(&app, "alice").await;

    let response = send(&app, "GET", "/shop/items", &token, None).await;
    let items = body_json(response).await["items"].clone();
    let theme = items
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["name"] == "Custom Profile Theme")
        .unwrap()["id"]
        .as_i64()
        .unwrap();
    let uri = format!("/shop/items/{}/purchase", theme);

    let response = send(&app, "POST", &uri, &token, None).await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    give_points(&app, &token, 300).await;
    let response = send(&app, "POST", &uri, &token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["new_balance"], 50);

    let response = send(&app, "POST", &uri, &token, None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, "GET", "/shop/purchases", &token, None).await;
    let body = body_json(response).await;
    assert_eq!(body["purchases"].as_array().unwrap().len(), 1);
    assert_eq!(body["purchases"][0]["is_current"], true);

    let response = send(
        &app,
        "POST",
        "/shop/checkout",
        &token,
        Some(json!({ "item_ids": [] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_paid_event_registration() {
    let app = setup_app().await;
    let host = register(&app, "host").await;
    let bob = register(&app, "bob").await;
    let carol = register(&app, "carol").await;
    let dave = register(&app, "dave").await;

    let response = send(&app, "POST", "/events", &host, Some(event_payload(50, Some(2)))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let event_id = body_json(response).await["event"]["id"].as_i64().unwrap();
    let join = format!("/events/{}/join", event_id);
    let leave = format!("/events/{}/leave", event_id);

    // No points yet
    let response = send(&app, "POST", &join, &bob, None).await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    give_points(&app, &bob, 80).await;
    let response = send(&app, "POST", &join, &bob, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "POST", &join, &bob, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "GET", "/user/level", &bob, None).await;
    assert_eq!(body_json(response).await["points"], 30);

    give_points(&app, &carol, 50).await;
    let response = send(&app, "POST", &join, &carol, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    give_points(&app, &dave, 50).await;
    let response = send(&app, "POST", &join, &dave, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("full")
    );

    let response = send(&app, "GET", "/events", &bob, None).await;
    let body = body_json(response).await;
    assert_eq!(body["events"][0]["participants_count"], 2);
    assert_eq!(body["events"][0]["is_joined"], true);

    let response = send(&app, "POST", &leave, &bob, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, "POST", &leave, &bob, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // No refund on leave
    let response = send(&app, "GET", "/user/level", &bob, None).await;
    assert_eq!(body_json(response).await["points"], 30);
}

#[tokio::test]
async fn test_event_validation() {
    let app = setup_app().await;
    let token = register(&app, "host").await;

    let mut backwards = event_payload(0, None);
    backwards["end_time"] = backwards["start_time"].clone();
    let response = send(&app, "POST", "/events", &token, Some(backwards)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "POST", "/events", &token, Some(event_payload(-5, None))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "POST", "/events", &token, Some(event_payload(0, Some(0)))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_room_membership_rules() {
    let app = setup_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let response = send(
        &app,
        "POST",
        "/rooms",
        &alice,
        Some(json!({ "name": "Lobby" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let lobby = body_json(response).await["room"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        "/rooms",
        &alice,
        Some(json!({ "name": "Secret", "room_type": "private" })),
    )
    .await;
    let secret = body_json(response).await["room"]["id"].as_i64().unwrap();

    // Public rooms auto-join on first message
    let response = send(
        &app,
        "POST",
        &format!("/rooms/{}/messages", lobby),
        &bob,
        Some(json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = body_json(response).await["message"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        &format!("/rooms/{}/messages", lobby),
        &alice,
        Some(json!({ "content": "welcome", "replied_to_id": first })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, "GET", &format!("/rooms/{}/messages", lobby), &bob, None).await;
    let body = body_json(response).await;
    let contents: Vec<_> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, vec!["hello", "welcome"]);

    let response = send(
        &app,
        "GET",
        &format!("/rooms/{}/messages?limit=1", lobby),
        &bob,
        None,
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["messages"][0]["content"], "welcome");

    // Private rooms stay hidden from outsiders
    let response = send(&app, "POST", &format!("/rooms/{}/join", secret), &bob, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = send(&app, "GET", &format!("/rooms/{}/messages", secret), &bob, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(
        &app,
        "POST",
        &format!("/rooms/{}/messages", secret),
        &bob,
        Some(json!({ "content": "let me in" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/rooms", &bob, None).await;
    let body = body_json(response).await;
    let rooms = body["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["member_count"], 2);
    assert_eq!(rooms[0]["last_message"]["content"], "welcome");

    // Message length limits
    let response = send(
        &app,
        "POST",
        &format!("/rooms/{}/messages", lobby),
        &alice,
        Some(json!({ "content": "   " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = send(
        &app,
        "POST",
        &format!("/rooms/{}/messages", lobby),
        &alice,
        Some(json!({ "content": "a".repeat(1001) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_rooms_require_registration() {
    let app = setup_app().await;
    let host = register(&app, "host").await;
    let bob = register(&app, "bob").await;

    let response = send(&app, "POST", "/events", &host, Some(event_payload(0, None))).await;
    let event_id = body_json(response).await["event"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        "/rooms",
        &host,
        Some(json!({ "name": "Workshop chat", "room_type": "event" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/rooms",
        &host,
        Some(json!({ "name": "Workshop chat", "room_type": "event", "event_id": event_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let room = body_json(response).await["room"]["id"].as_i64().unwrap();
    let join_room = format!("/rooms/{}/join", room);

    let response = send(&app, "POST", &join_room, &bob, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    send(&app, "POST", &format!("/events/{}/join", event_id), &bob, None).await;
    let response = send(&app, "POST", &join_room, &bob, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Joining twice is harmless
    let response = send(&app, "POST", &join_room, &bob, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_leaderboard_cache_is_dropped_on_writes() {
    let app = setup_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    give_points(&app, &alice, 100).await;
    let response = send(&app, "GET", "/leaderboard", &bob, None).await;
    let body = body_json(response).await;
    assert_eq!(body["leaderboard"][0]["username"], "alice");

    give_points(&app, &bob, 300).await;
    let response = send(&app, "GET", "/leaderboard", &alice, None).await;
    let body = body_json(response).await;
    assert_eq!(body["leaderboard"][0]["username"], "bob");
    assert_eq!(body["leaderboard"][0]["rank"], 1);
    assert_eq!(body["leaderboard"][1]["rank"], 2);

    let response = send(&app, "POST", "/user/points", &alice, Some(json!({ "points": -5 }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
