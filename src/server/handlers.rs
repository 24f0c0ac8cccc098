use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, MutexGuard};
use std::time::Instant;
use tracing::{info, warn};

use crate::cluster::{location_key, LocationGroup};
use crate::location::{
    builtin_city_list, builtin_country_list, format_coords, resolve_with_source, CityInfo,
    CountryInfo, GeoPoint, LocatableEntity,
};
use crate::source::SourceError;
use crate::viewport::{PresenterError, RenderFrame, SharedViewport, ViewChange, ViewState, ViewportPresenter};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        let status = match e {
            SourceError::Forbidden => StatusCode::FORBIDDEN,
            SourceError::CacheMiss => StatusCode::SERVICE_UNAVAILABLE,
            SourceError::Network(_) | SourceError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            SourceError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, e.to_string())
    }
}

impl From<PresenterError> for ApiError {
    fn from(e: PresenterError) -> Self {
        let status = match e {
            PresenterError::UnknownGroup(_) => StatusCode::NOT_FOUND,
            PresenterError::Surface(_) => StatusCode::CONFLICT,
        };
        api_error(status, e.to_string())
    }
}

fn lock_presenter(state: &AppState) -> MutexGuard<'_, ViewportPresenter<SharedViewport>> {
    state.presenter.lock().unwrap_or_else(|e| e.into_inner())
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub position: GeoPoint,
    pub location_key: String,
    pub formatted_coords: String,
    pub source: String,
    pub matched: Option<String>,
}

pub async fn resolve(Query(params): Query<ResolveQuery>) -> Json<ResolveResponse> {
    let r = resolve_with_source(params.city.as_deref(), params.country.as_deref());
    info!(
        city = params.city.as_deref().unwrap_or(""),
        country = params.country.as_deref().unwrap_or(""),
        source = %r.source,
        "GET /api/resolve"
    );
    Json(ResolveResponse {
        position: r.point,
        location_key: location_key(&r.point),
        formatted_coords: format_coords(r.point.lat, r.point.lng),
        source: r.source.to_string(),
        matched: r.matched,
    })
}

// ─── GET /api/cities, /api/countries ─────────────────────────────

pub async fn city_list() -> Json<Vec<CityInfo>> {
    Json(builtin_city_list())
}

pub async fn country_list() -> Json<Vec<CountryInfo>> {
    Json(builtin_country_list())
}

// ─── GET /api/map ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct MapQuery {
    pub zoom: Option<f64>,
}

pub async fn map_frame(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapQuery>,
) -> Result<Json<RenderFrame>, ApiError> {
    let start = Instant::now();
    let mut presenter = lock_presenter(&state);
    if let Some(zoom) = params.zoom {
        if !zoom.is_finite() {
            return Err(api_error(StatusCode::BAD_REQUEST, "zoom must be a finite number"));
        }
        presenter.zoom_to(zoom)?;
    }
    // Follow wherever the last fit or drill-in left the viewport.
    presenter.sync_zoom();
    let frame = presenter.frame().clone();

    info!(
        zoom = frame.zoom,
        mode = %frame.mode,
        markers = frame.markers.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/map"
    );
    Ok(Json(frame))
}

// ─── PUT /api/entities, POST /api/refresh ────────────────────────

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub position: GeoPoint,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    pub changed: bool,
    pub entities: usize,
    pub groups: Vec<GroupSummary>,
}

fn summarize(changed: bool, groups: &[LocationGroup]) -> EntitiesResponse {
    EntitiesResponse {
        changed,
        entities: groups.iter().map(LocationGroup::len).sum(),
        groups: groups
            .iter()
            .map(|g| GroupSummary {
                key: g.key.clone(),
                position: g.position,
                count: g.len(),
            })
            .collect(),
    }
}

fn replace_entities(state: &AppState, entities: Vec<LocatableEntity>) -> EntitiesResponse {
    let mut presenter = lock_presenter(state);
    let changed = presenter.set_entities(entities);
    summarize(changed, presenter.groups())
}

pub async fn put_entities(
    State(state): State<Arc<AppState>>,
    Json(entities): Json<Vec<LocatableEntity>>,
) -> Json<EntitiesResponse> {
    let count = entities.len();
    let resp = replace_entities(&state, entities);
    info!(count, changed = resp.changed, groups = resp.groups.len(), "PUT /api/entities");
    Json(resp)
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<EntitiesResponse>, ApiError> {
    let start = Instant::now();
    let loader = Arc::clone(&state);
    let loaded = tokio::task::spawn_blocking(move || {
        loader.source.lock().unwrap_or_else(|e| e.into_inner()).load()
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let entities = loaded.inspect_err(|e| warn!("Refresh failed: {}", e))?;
    let resp = replace_entities(&state, entities);
    info!(
        entities = resp.entities,
        changed = resp.changed,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "POST /api/refresh"
    );
    Ok(Json(resp))
}

// ─── Viewport ────────────────────────────────────────────────────

pub async fn viewport_state(State(state): State<Arc<AppState>>) -> Json<ViewState> {
    Json(state.viewport.snapshot().state())
}

#[derive(Deserialize)]
pub struct SizeBody {
    pub width: u32,
    pub height: u32,
}

pub async fn viewport_size(
    State(state): State<Arc<AppState>>,
    Json(size): Json<SizeBody>,
) -> Json<ViewState> {
    let was_ready = state.viewport.snapshot().is_ready();
    state.viewport.resize(size.width, size.height);
    let mounted = !was_ready && state.viewport.snapshot().is_ready();
    if mounted {
        lock_presenter(&state).remount();
    }
    info!(width = size.width, height = size.height, mounted, "POST /api/viewport/size");
    Json(state.viewport.snapshot().state())
}

#[derive(Deserialize)]
pub struct FocusQuery {
    pub key: Option<String>,
}

pub async fn focus(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FocusQuery>,
) -> Result<Json<ViewChange>, ApiError> {
    let key = params.key.as_deref().unwrap_or("").trim();
    if key.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'key' parameter"));
    }
    let change = lock_presenter(&state).activate(key)?;
    info!(key, zoom = change.zoom, "POST /api/focus");
    Ok(Json(change))
}
