use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use habit_tracker::api;
use habit_tracker::auth::{create_jwt, decode_jwt, hash_password, verify_password};
use habit_tracker::config::Config;
use habit_tracker::db;
use habit_tracker::infrastructure::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

async fn setup_app() -> Router {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    api::api_router_with_state(AppState::new(db, Config::default()))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_password_hashing() {
    let password = "super_secret_password";
    let hash = hash_password(password).expect("Failed to hash password");

    assert_ne!(password, hash);
    assert!(verify_password(password, &hash).unwrap());
    assert!(!verify_password("wrong_password", &hash).unwrap());
}

#[tokio::test]
async fn test_jwt_creation_and_verification() {
    let secret = SecretString::new("secret".to_string());
    let token = create_jwt(7, "test_user", &secret, 1).expect("Failed to create JWT");
    assert!(!token.is_empty());

    let claims = decode_jwt(&token, &secret).expect("Failed to verify JWT");
    assert_eq!(claims.sub, "7");
    assert_eq!(claims.username, "test_user");

    let other = SecretString::new("another".to_string());
    assert!(decode_jwt(&token, &other).is_err());
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = setup_app().await;

    let payload = json!({
        "username": "alice",
        "password": "correct-horse",
        "email": "alice@example.com"
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/auth/register", None, payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("password_hash").is_none());

    // Login
    let payload = json!({ "username": "alice", "password": "correct-horse" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/auth/login", None, payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    // Me
    let response = app
        .oneshot(get_request("/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["level"]["level"], 1);
    assert_eq!(body["level"]["points"], 0);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = setup_app().await;

    let payload = json!({ "username": "bob", "password": "password123" });
    app.clone()
        .oneshot(json_request("POST", "/auth/register", None, payload))
        .await
        .unwrap();

    let payload = json!({ "username": "bob", "password": "wrong_password" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/auth/login", None, payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown user gets the same answer
    let payload = json!({ "username": "nobody", "password": "password123" });
    let response = app
        .oneshot(json_request("POST", "/auth/login", None, payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = setup_app().await;

    let cases = [
        json!({ "username": "ab", "password": "password123" }),
        json!({ "username": "has space", "password": "password123" }),
        json!({ "username": "carol", "password": "short" }),
        json!({ "username": "carol", "password": "password123", "email": "not-an-email" }),
    ];
    for payload in cases {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/auth/register", None, payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let payload = json!({ "username": "carol", "password": "password123" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/auth/register", None, payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(json_request("POST", "/auth/register", None, payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup_app().await;

    for uri in [
        "/auth/me",
        "/habits",
        "/habits/summary",
        "/user/level",
        "/shop/purchases",
        "/preferences",
        "/export",
    ] {
        let response = app.clone().oneshot(get_request(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = app
        .clone()
        .oneshot(get_request("/habits", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A token signed with another secret is rejected too
    let forged = create_jwt(1, "mallory", &SecretString::new("forged".to_string()), 1).unwrap();
    let response = app
        .oneshot(get_request("/habits", Some(&forged)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup_app().await;
    let response = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
