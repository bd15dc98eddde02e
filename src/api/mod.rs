// HTTP API routes (player CRUD, site config, metadata).

use axum::{
    extract::{rejection::JsonRejection, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{self, AdminAuth, AdminUser};
use crate::config::SiteConfig;
use crate::error::ApiError;
use crate::metrics;
use crate::ranking::ListFilter;
use crate::rate_limit::RateLimiter;
use crate::schema::{
    validate_new_player, validate_player_patch, Category, FieldError, Player, Region, TierRank,
    Title,
};
use crate::store::PlayerStore;

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PlayerStore>,
    pub auth: Arc<AdminAuth>,
    pub login_limiter: RateLimiter,
    pub site: Arc<SiteConfig>,
}

impl AppState {
    pub fn new(store: PlayerStore, auth: AdminAuth, site: SiteConfig) -> Self {
        Self {
            store: Arc::new(store),
            auth: Arc::new(auth),
            login_limiter: RateLimiter::for_logins(),
            site: Arc::new(site),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/api/config", get(get_site_config))
        .route("/api/meta", get(get_meta))
        // Admin auth
        .route(
            "/api/auth/admin",
            get(auth::admin_status).post(auth::admin_login),
        )
        // Players
        .route("/api/players", get(list_players).post(create_player))
        .route(
            "/api/players/{id}",
            get(get_player).patch(update_player).delete(delete_player),
        )
        .with_state(state)
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Unparseable ids can never match a stored player.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

fn body_value(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(v)| v).map_err(ApiError::from)
}

// ── Service handlers ──────────────────────────────────────────────────

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "startiers-backend",
        "store": state.store.backend_name(),
    }))
}

async fn get_metrics() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn get_site_config(State(state): State<AppState>) -> Json<SiteConfig> {
    Json(state.site.as_ref().clone())
}

/// Enumerations and title thresholds, so clients need not hard-code them.
async fn get_meta() -> Json<Value> {
    let mut tiers = TierRank::ALL.to_vec();
    tiers.sort_by_key(TierRank::strength_index);

    Json(json!({
        "regions": Region::ALL.iter().map(Region::as_str).collect::<Vec<_>>(),
        "categories": Category::ALL
            .iter()
            .map(|c| json!({ "key": c.key(), "name": c.display_name(), "icon": c.icon() }))
            .collect::<Vec<_>>(),
        "tiers": tiers
            .iter()
            .map(|t| json!({
                "label": t.as_str(),
                "high": t.is_high(),
                "level": t.level(),
            }))
            .collect::<Vec<_>>(),
        "titles": Title::ALL
            .iter()
            .map(|t| json!({ "label": t.label(), "icon": t.icon(), "minPoints": t.min_points() }))
            .collect::<Vec<_>>(),
    }))
}

// ── Player handlers ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListPlayersParams {
    pub search: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
}

impl ListPlayersParams {
    fn into_filter(self) -> Result<ListFilter, ApiError> {
        let mut errors = Vec::new();
        let region = self.region.filter(|r| !r.is_empty()).and_then(|r| {
            r.parse::<Region>()
                .map_err(|e| errors.push(FieldError::new(&["region"], e.to_string())))
                .ok()
        });
        let category = self.category.filter(|c| !c.is_empty()).and_then(|c| {
            c.parse::<Category>()
                .map_err(|e| errors.push(FieldError::new(&["category"], e.to_string())))
                .ok()
        });
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(ListFilter {
            search: self.search,
            region,
            category,
        })
    }
}

async fn list_players(
    State(state): State<AppState>,
    Query(params): Query<ListPlayersParams>,
) -> Result<Json<Vec<Player>>, ApiError> {
    let filter = params.into_filter()?;
    let players = state
        .store
        .list()
        .await
        .map_err(|e| ApiError::from_store("Failed to fetch players", e))?;
    Ok(Json(filter.apply(players)))
}

async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Player>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.get(id).await {
        Ok(Some(player)) => Ok(Json(player)),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::from_store("Failed to fetch player", e)),
    }
}

async fn create_player(
    State(state): State<AppState>,
    _admin: AdminUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let new = validate_new_player(&body_value(body)?).map_err(ApiError::Validation)?;

    let player = state
        .store
        .create(new)
        .await
        .map_err(|e| ApiError::from_store("Failed to create player", e))?;

    metrics::PLAYER_MUTATIONS_TOTAL.with_label_values(&["create"]).inc();
    metrics::PLAYERS.inc();
    tracing::info!(player_id = %player.id, name = %player.name, "Player created");
    Ok((StatusCode::CREATED, Json(player)))
}

async fn update_player(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Player>, ApiError> {
    let patch = validate_player_patch(&body_value(body)?).map_err(ApiError::Validation)?;
    let id = parse_id(&id)?;

    match state.store.update(id, patch).await {
        Ok(Some(player)) => {
            metrics::PLAYER_MUTATIONS_TOTAL.with_label_values(&["update"]).inc();
            tracing::info!(player_id = %player.id, name = %player.name, "Player updated");
            Ok(Json(player))
        }
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::from_store("Failed to update player", e)),
    }
}

async fn delete_player(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.delete(id).await {
        Ok(true) => {
            metrics::PLAYER_MUTATIONS_TOTAL.with_label_values(&["delete"]).inc();
            metrics::PLAYERS.dec();
            tracing::info!(player_id = %id, "Player deleted");
            Ok(Json(json!({ "message": "Player deleted successfully" })))
        }
        Ok(false) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::from_store("Failed to delete player", e)),
    }
}
