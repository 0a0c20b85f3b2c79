//! Full-router tests against the memory backend.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::services::mailer::tests::RecordingMailer;
use crate::store::fallback::tests::DownStore;
use crate::store::{FallbackStore, MemoryStore, RecordStore};
use crate::{build_router, AppState};

fn app() -> Router {
    build_router(AppState::for_tests(Arc::new(MemoryStore::new())))
}

fn app_with_store(store: Arc<dyn RecordStore>) -> Router {
    build_router(AppState::for_tests(store))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Registers `username` and returns `(user_id, token)`.
async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": format!("{username}@x.com"),
            "username": username,
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_dates_are_scoped_to_their_owner() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "a@x.com", "username": "alice", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let alice_id = body["user"]["id"].as_str().unwrap().to_string();
    let alice_token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/dates",
        Some(&alice_token),
        Some(json!({"name": "Sam", "rating": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["date"]["ownerId"], alice_id.as_str());
    assert_eq!(body["date"]["name"], "Sam");
    assert_eq!(body["date"]["rating"], 8);

    let (_, bob_token) = register(&app, "bob").await;
    let (status, body) = send(&app, "GET", "/api/dates", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dates"], json!([]));
    assert_eq!(body["pagination"]["total"], 0);

    let (_, body) = send(&app, "GET", "/api/dates", Some(&alice_token), None).await;
    assert_eq!(body["dates"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_responses_never_carry_password_material() {
    let app = app();
    let (_, token) = register(&app, "alice").await;

    let (_, login) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@x.com", "password": "password123"})),
    )
    .await;
    let (_, verify) = send(&app, "POST", "/api/auth/verify", Some(&token), None).await;
    let (_, me) = send(&app, "GET", "/api/users/me", Some(&token), None).await;

    for body in [&login, &verify, &me] {
        let user = body["user"].as_object().unwrap();
        assert!(!user.contains_key("password"));
        assert!(!user.contains_key("passwordHash"));
        assert!(!body.to_string().contains("$argon2"));
        assert_eq!(user["username"], "alice");
    }
}

#[tokio::test]
async fn test_login_failures_look_identical() {
    let app = app();
    register(&app, "alice").await;

    let unknown = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "nobody@x.com", "password": "password123"})),
    )
    .await;
    let wrong = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@x.com", "password": "not-the-password"})),
    )
    .await;

    assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.1["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let app = app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "ALICE@x.com", "username": "alice2", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_register_rejects_malformed_body() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "a@x.com", "username": "alice", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "a@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = app();

    let (status, body) = send(&app, "GET", "/api/dates", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");

    let (status, _) = send(&app, "GET", "/api/dates", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/auth/verify", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Identity comes from the token only.
    let req = Request::builder()
        .uri("/api/dates")
        .header("x-user-id", uuid::Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_dates_are_not_found() {
    let app = app();
    let (_, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/dates",
        Some(&bob),
        Some(json!({"name": "Jo", "rating": 6})),
    )
    .await;
    let uri = format!("/api/dates/{}", body["date"]["id"].as_str().unwrap());

    let foreign = send(&app, "GET", &uri, Some(&alice), None).await;
    let missing = send(
        &app,
        "GET",
        &format!("/api/dates/{}", uuid::Uuid::new_v4()),
        Some(&alice),
        None,
    )
    .await;
    let malformed = send(&app, "GET", "/api/dates/123", Some(&alice), None).await;
    assert_eq!(foreign.0, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);
    assert_eq!(foreign, malformed);

    let (status, _) = send(&app, "PUT", &uri, Some(&alice), Some(json!({"rating": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"]["rating"], 6);
}

#[tokio::test]
async fn test_update_merges_and_delete_removes() {
    let app = app();
    let (_, token) = register(&app, "alice").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/dates",
        Some(&token),
        Some(json!({"name": "Sam", "rating": 8, "vibeCheck": "electric", "greenFlags": ["kind"]})),
    )
    .await;
    let uri = format!("/api/dates/{}", body["date"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({"rating": 9, "notes": "second date booked"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"]["rating"], 9);
    assert_eq!(body["date"]["notes"], "second date booked");
    assert_eq!(body["date"]["vibeCheck"], "electric");
    assert_eq!(body["date"]["greenFlags"], json!(["kind"]));

    let (status, _) = send(&app, "PUT", &uri, Some(&token), Some(json!({"rating": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Date deleted successfully");

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_validates_fields() {
    let app = app();
    let (_, token) = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/dates",
        Some(&token),
        Some(json!({"name": "Sam", "rating": 11})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(&app, "POST", "/api/dates", Some(&token), Some(json!({"rating": 5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_paginates() {
    let app = app();
    let (_, token) = register(&app, "alice").await;
    for name in ["A", "B", "C"] {
        send(&app, "POST", "/api/dates", Some(&token), Some(json!({"name": name}))).await;
    }

    let (_, body) = send(&app, "GET", "/api/dates?page=2&limit=2", Some(&token), None).await;
    assert_eq!(body["dates"].as_array().unwrap().len(), 1);
    assert_eq!(body["dates"][0]["name"], "C");
    assert_eq!(
        body["pagination"],
        json!({"page": 2, "limit": 2, "total": 3, "pages": 2})
    );

    let (status, _) = send(&app, "GET", "/api/dates?page=abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_summarize_own_dates() {
    let app = app();
    let (_, token) = register(&app, "alice").await;
    let (_, other) = register(&app, "bob").await;
    send(&app, "POST", "/api/dates", Some(&token), Some(json!({"name": "Sam", "rating": 8}))).await;
    send(&app, "POST", "/api/dates", Some(&token), Some(json!({"name": "Jo", "rating": 6}))).await;
    send(&app, "POST", "/api/dates", Some(&other), Some(json!({"name": "Kim", "rating": 1}))).await;

    let (status, body) = send(&app, "GET", "/api/users/me/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalDates"], 2);
    assert_eq!(body["stats"]["averageRating"], 7.0);
    assert_eq!(body["stats"]["averageChemistry"], Value::Null);
}

#[tokio::test]
async fn test_ai_routes() {
    let app = app();

    let (status, body) = send(&app, "POST", "/api/ai/analyze-image", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(
        &app,
        "POST",
        "/api/ai/analyze-image",
        None,
        Some(json!({"imageUrl": "/uploads/photo.jpg"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["style"], "casual-chic");
    assert_eq!(body["analysis"]["datingAppOptimized"], true);

    let (status, body) = send(&app, "POST", "/api/ai/advice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advice"]["title"], "Dating Strategy");

    let (status, _) = send(&app, "POST", "/api/ai/insights", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_insights_use_only_callers_dates() {
    let app = app();
    let (_, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    send(
        &app,
        "POST",
        "/api/dates",
        Some(&bob),
        Some(json!({"name": "Secret", "chemistryRating": 9, "vibeCheck": "electric"})),
    )
    .await;

    let (status, body) = send(&app, "POST", "/api/ai/insights", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["insights"][0]["title"], "Getting Started");
    assert!(!body.to_string().contains("Secret"));

    let (_, body) = send(&app, "POST", "/api/ai/insights", Some(&bob), None).await;
    assert!(body.to_string().contains("Secret"));
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let app = app();

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, body) = send(&app, "GET", "/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["records"], json!({"users": 0, "dates": 0}));

    let (status, body) = send(&app, "GET", "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "Cannot GET /api/nope");
}

#[tokio::test]
async fn test_down_primary_with_fallback_keeps_serving() {
    let store = FallbackStore::new(Arc::new(DownStore), Arc::new(MemoryStore::new()), true);
    let app = app_with_store(Arc::new(store));

    let (_, token) = register(&app, "alice").await;
    let (status, _) = send(&app, "POST", "/api/dates", Some(&token), Some(json!({"name": "Sam"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/readyz", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["store"], "failed");
}

#[tokio::test]
async fn test_down_primary_without_fallback_fails_loudly() {
    let store = FallbackStore::new(Arc::new(DownStore), Arc::new(MemoryStore::new()), false);
    let app = app_with_store(Arc::new(store));

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "a@x.com", "username": "alice", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "backend_unavailable");
    assert!(!body["message"].as_str().unwrap().contains("down"));
}

#[tokio::test]
async fn test_every_route_is_rate_limited() {
    let config = Config {
        rate_limit_max: 2,
        ..Config::for_tests()
    };
    let state = AppState::new(
        Arc::new(config),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingMailer::default()),
    );
    let app = build_router(state);
    let login = json!({"email": "nobody@x.com", "password": "password123"});

    for _ in 0..2 {
        let (status, _) = send(&app, "POST", "/api/auth/login", None, Some(login.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = send(&app, "POST", "/api/auth/login", None, Some(login)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");

    // Separate bucket per route.
    let (_, token) = register(&app, "alice").await;

    for _ in 0..2 {
        let (status, _) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Different ids share the route's bucket, and the limit applies before auth.
    for _ in 0..2 {
        let uri = format!("/api/dates/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let uri = format!("/api/dates/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_client_payload_round_trips() {
    let app = app();
    let (user_id, token) = register(&app, "alice").await;
    let payload = json!({
        "name": "Sam",
        "rating": 8,
        "chemistryRating": 7,
        "attractionRating": 9,
        "vibeCheck": "electric",
        "emotionalImpact": "energized",
        "conversationQuality": "deep",
        "effortLevel": "high",
        "bodyLanguage": "open",
        "greenFlags": ["kind", "funny"],
        "redFlags": ["late"],
        "notes": "coffee then a walk",
        "profileImage": "/uploads/sam.jpg",
        "imageAnalysis": {"confidence": 0.87, "style": "casual-chic"},
        "date": "1/2/2025",
    });

    let (status, created) = send(
        &app,
        "POST",
        "/api/dates",
        Some(&token),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let uri = format!("/api/dates/{}", created["date"]["id"].as_str().unwrap());

    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let stored = &body["date"];
    for (key, value) in payload.as_object().unwrap() {
        assert_eq!(&stored[key], value, "field {key}");
    }
    assert_eq!(stored["ownerId"], user_id.as_str());
    assert_eq!(stored, &created["date"]);

    let (_, body) = send(&app, "PUT", &uri, Some(&token), Some(json!({"date": "1/3/2025"}))).await;
    assert_eq!(body["date"]["date"], "1/3/2025");
    assert_eq!(body["date"]["vibeCheck"], "electric");
}

#[tokio::test]
async fn test_non_integer_ratings_report_field_messages() {
    let app = app();
    let (_, token) = register(&app, "alice").await;

    let cases = [
        (json!({"name": "Sam", "rating": 7.5}), "Rating must be 1-10"),
        (json!({"name": "Sam", "rating": "high"}), "Rating must be 1-10"),
        (json!({"name": "Sam", "chemistryRating": "7"}), "Chemistry rating must be 1-10"),
        (json!({"name": "Sam", "attractionRating": 2.25}), "Attraction rating must be 1-10"),
    ];
    for (payload, message) in cases {
        let (status, body) = send(&app, "POST", "/api/dates", Some(&token), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], message);
    }

    let (_, body) =
        send(&app, "POST", "/api/dates", Some(&token), Some(json!({"name": "Sam"}))).await;
    let uri = format!("/api/dates/{}", body["date"]["id"].as_str().unwrap());
    let (status, body) = send(&app, "PUT", &uri, Some(&token), Some(json!({"rating": 9.5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Rating must be 1-10");

    let (status, body) = send(
        &app,
        "POST",
        "/api/dates",
        Some(&token),
        Some(json!({"name": "Jo", "rating": 8.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["date"]["rating"], 8);
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = app();

    for uri in ["/health", "/api/nope", "/api/dates"] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff", "{uri}");
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN", "{uri}");
        assert_eq!(headers["referrer-policy"], "no-referrer", "{uri}");
        assert_eq!(headers["cross-origin-resource-policy"], "same-origin", "{uri}");
        assert!(headers.contains_key("strict-transport-security"), "{uri}");
        assert!(headers.contains_key("content-security-policy"), "{uri}");
    }
}
