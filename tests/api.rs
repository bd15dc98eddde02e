// End-to-end tests for the HTTP API, driving the full router in-process.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use startiers_backend::{
    api::AppState, app, auth::AdminAuth, config::SiteConfig, rate_limit::RateLimiter,
    store::PlayerStore,
};

const PASSWORD: &str = "admin123";

async fn test_state(local_mode: bool) -> AppState {
    let store = PlayerStore::open(None, true).await.unwrap();
    let auth = AdminAuth::new(PASSWORD, Some("integration-secret"), 1, local_mode).unwrap();
    AppState::new(store, auth, SiteConfig::default())
}

async fn test_app() -> Router {
    app(test_state(false).await, None)
}

async fn send(
    app: &Router,
    method: Method,
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

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/admin",
        None,
        Some(json!({ "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

fn new_player_body(name: &str, points: u32) -> Value {
    json!({
        "name": name,
        "points": points,
        "region": "OCE",
        "title": "Combat Novice",
        "titleIcon": "fas fa-shield",
        "tiers": { "axe": "LT4", "smp": "HT5" }
    })
}

fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

// ── Listing ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_seeded_players_sorted_by_points() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/players", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        names(&body),
        vec!["Marlowww", "ItzRealMe", "Swight", "coldified", "Kylaz"]
    );
    let points: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["points"].as_u64().unwrap())
        .collect();
    assert_eq!(points, vec![405, 330, 260, 226, 222]);
    assert_eq!(body[0]["titleIcon"], "fas fa-crown");
    assert_eq!(body[0]["tiers"]["vanilla"], "HT1");
}

#[tokio::test]
async fn test_list_filters() {
    let app = test_app().await;

    let (_, body) = send(&app, Method::GET, "/api/players?region=EU", None, None).await;
    assert_eq!(names(&body), vec!["coldified"]);

    let (_, body) = send(&app, Method::GET, "/api/players?search=master", None, None).await;
    assert_eq!(names(&body), vec!["Marlowww", "ItzRealMe", "Swight"]);

    let (_, body) = send(&app, Method::GET, "/api/players?category=pot", None, None).await;
    // pot: ItzRealMe HT1, Kylaz HT1, Marlowww LT1, coldified LT2, Swight HT3
    assert_eq!(
        names(&body),
        vec!["ItzRealMe", "Kylaz", "Marlowww", "coldified", "Swight"]
    );

    let (status, body) = send(&app, Method::GET, "/api/players?region=MARS", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], json!(["region"]));
}

// ── Create ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_then_list_and_fetch_roundtrip() {
    let app = test_app().await;
    let token = login(&app).await;
    let submitted = new_player_body("Notch", 250);

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/players",
        Some(&token),
        Some(submitted.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, Method::GET, &format!("/api/players/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    for field in ["name", "points", "region", "title", "titleIcon", "tiers"] {
        assert_eq!(fetched[field], submitted[field], "field {field} differs");
    }
    assert_eq!(fetched["id"], json!(id));

    let (_, list) = send(&app, Method::GET, "/api/players", None, None).await;
    // 250 sits between Swight (260) and coldified (226)
    assert_eq!(
        names(&list),
        vec!["Marlowww", "ItzRealMe", "Swight", "Notch", "coldified", "Kylaz"]
    );
}

#[tokio::test]
async fn test_create_duplicate_name_case_insensitive() {
    let app = test_app().await;
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/players",
        Some(&token),
        Some(new_player_body("marlowww", 1)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Player name already exists");

    let (_, list) = send(&app, Method::GET, "/api/players", None, None).await;
    assert_eq!(list.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_create_validation_errors_listed() {
    let app = test_app().await;
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/players",
        Some(&token),
        Some(json!({ "name": "Herobrine", "points": -5, "region": "NA", "tiers": { "sword": "GT1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid player data");
    let paths: Vec<String> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            e["path"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p.as_str().unwrap())
                .collect::<Vec<_>>()
                .join(".")
        })
        .collect();
    assert_eq!(paths, vec!["points", "title", "titleIcon", "tiers.sword"]);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app().await;
    let token = login(&app).await;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/players")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
}

// ── Update ────────────────────────────────────────────────────────────

async fn id_of(app: &Router, name: &str) -> String {
    let (_, list) = send(app, Method::GET, "/api/players", None, None).await;
    list.as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == name)
        .and_then(|p| p["id"].as_str())
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_patch_points_only_changes_points() {
    let app = test_app().await;
    let token = login(&app).await;
    let id = id_of(&app, "Kylaz").await;
    let (_, before) = send(&app, Method::GET, &format!("/api/players/{id}"), None, None).await;

    let (status, after) = send(
        &app,
        Method::PATCH,
        &format!("/api/players/{id}"),
        Some(&token),
        Some(json!({ "points": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["points"], 999);
    for field in ["id", "name", "region", "title", "titleIcon", "tiers"] {
        assert_eq!(after[field], before[field], "field {field} changed");
    }

    let (_, list) = send(&app, Method::GET, "/api/players", None, None).await;
    assert_eq!(names(&list)[0], "Kylaz");
}

#[tokio::test]
async fn test_patch_rename_conflict_and_self_rename() {
    let app = test_app().await;
    let token = login(&app).await;
    let id = id_of(&app, "Swight").await;
    let uri = format!("/api/players/{id}");

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "name": "KYLAZ" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Player name already exists");

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "name": "SWIGHT" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "SWIGHT");
}

#[tokio::test]
async fn test_patch_unknown_id_is_not_found() {
    let app = test_app().await;
    let token = login(&app).await;
    for id in ["67e55044-10b1-426f-9247-bb680e5fe0c8", "not-a-uuid"] {
        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/players/{id}"),
            Some(&token),
            Some(json!({ "points": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Player not found");
    }
}

#[tokio::test]
async fn test_patch_invalid_region_rejected() {
    let app = test_app().await;
    let token = login(&app).await;
    let id = id_of(&app, "Swight").await;
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/players/{id}"),
        Some(&token),
        Some(json!({ "region": "SA" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], json!(["region"]));
}

// ── Delete ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_then_delete_again() {
    let app = test_app().await;
    let token = login(&app).await;
    let id = id_of(&app, "coldified").await;
    let uri = format!("/api/players/{id}");

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Player deleted successfully");

    let (_, list) = send(&app, Method::GET, "/api/players", None, None).await;
    assert!(!names(&list).contains(&"coldified".to_string()));

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Admin auth ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_login_success_and_failure() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/admin",
        None,
        Some(json!({ "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Admin authenticated");
    assert!(body["token"].is_string());
    assert!(body["expiresAt"].is_string());

    for bad in [json!({ "password": "admin1234" }), json!({})] {
        let (status, body) = send(&app, Method::POST, "/api/auth/admin", None, Some(bad)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid password");
    }
}

#[tokio::test]
async fn test_admin_status_checks_token() {
    let app = test_app().await;
    let token = login(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/auth/admin", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, Method::GET, "/api/auth/admin", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mutations_require_admin_token() {
    let app = test_app().await;
    let id = id_of(&app, "Marlowww").await;
    let uri = format!("/api/players/{id}");

    let (status, _) = send(&app, Method::POST, "/api/players", None, Some(new_player_body("Alex", 1))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::PATCH, &uri, Some("forged.token.value"), Some(json!({ "points": 0 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Admin token required");

    // Nothing changed
    let (_, list) = send(&app, Method::GET, "/api/players", None, None).await;
    assert_eq!(list.as_array().unwrap().len(), 5);
    assert_eq!(list[0]["points"], 405);
}

#[tokio::test]
async fn test_local_mode_skips_token_check() {
    let app = app(test_state(true).await, None);
    let (status, _) = send(&app, Method::POST, "/api/players", None, Some(new_player_body("Alex", 1))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_login_attempts_are_throttled() {
    let mut state = test_state(false).await;
    state.login_limiter = RateLimiter::new(2, Duration::from_secs(60));
    let app = app(state, None);

    for _ in 0..2 {
        let (status, _) = send(&app, Method::POST, "/api/auth/admin", None, Some(json!({ "password": "x" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/admin",
        None,
        Some(json!({ "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/admin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"password":"admin123"}"#))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = resp.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
}

// ── Service endpoints ─────────────────────────────────────────────────

#[tokio::test]
async fn test_health_config_and_meta() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");

    let (_, body) = send(&app, Method::GET, "/api/config", None, None).await;
    assert_eq!(
        body,
        json!({ "serverIP": "mcpvp.club", "serverName": "PvP Club", "siteName": "StarTiers" })
    );

    let (_, body) = send(&app, Method::GET, "/api/meta", None, None).await;
    assert_eq!(body["regions"], json!(["NA", "EU", "AS", "OCE"]));
    assert_eq!(body["categories"].as_array().unwrap().len(), 8);
    assert_eq!(body["tiers"][0]["label"], "HT1");
    assert_eq!(body["tiers"][1]["label"], "LT1");
    assert_eq!(body["titles"][0]["minPoints"], 400);
}

#[tokio::test]
async fn test_metrics_endpoint_reports_requests() {
    let app = test_app().await;
    send(&app, Method::GET, "/api/players", None, None).await;
    let (status, body) = send(&app, Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("startiers_api_requests_total"));
}

#[tokio::test]
async fn test_unrouted_paths_share_one_metrics_label() {
    let app = test_app().await;
    for path in ["/no-such-page-0/abc", "/no-such-page-1/abc"] {
        let (status, _) = send(&app, Method::GET, path, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let id = id_of(&app, "Kylaz").await;
    send(&app, Method::GET, &format!("/api/players/{id}"), None, None).await;

    let (_, body) = send(&app, Method::GET, "/metrics", None, None).await;
    let text = body.as_str().unwrap();
    assert!(!text.contains("no-such-page"));
    assert!(!text.contains(&id));
    assert!(text.contains(r#"endpoint="unmatched""#));
    assert!(text.contains(r#"endpoint="/api/players/{id}""#));
}

#[tokio::test]
async fn test_sqlite_backend_end_to_end() {
    let store = PlayerStore::open(Some("sqlite::memory:"), true).await.unwrap();
    let auth = AdminAuth::new(PASSWORD, Some("integration-secret"), 1, false).unwrap();
    let app = app(AppState::new(store, auth, SiteConfig::default()), None);
    let token = login(&app).await;

    let (_, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(body["store"], "sqlite");

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/players",
        Some(&token),
        Some(new_player_body("Dream", 500)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/players/{}", created["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::POST, "/api/players", Some(&token), Some(new_player_body("DREAM", 1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = send(&app, Method::GET, "/api/players", None, None).await;
    assert_eq!(names(&list)[0], "Dream");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
