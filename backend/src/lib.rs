pub mod config;
pub mod connections;
pub mod error;
pub mod external;
pub mod geometry;
pub mod gpx_export;
pub mod greedy;
pub mod index;
pub mod models;
pub mod planner;
pub mod search;
pub mod stitch;
pub mod store;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::is_valid_coordinate;
use crate::error::RouteError;
use crate::external::ConfiguredRouter;
use crate::gpx_export::encode_route_as_gpx;
use crate::models::{ApiError, RouteRequest, RouteResponse, SnapRequest, SnapResponse};
use crate::planner::RoutePlanner;
use crate::store::SegmentStore;

const GPX_TRACK_NAME: &str = "radwege route";

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<RoutePlanner<ConfiguredRouter>>,
    pub store: Arc<dyn SegmentStore>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/route", post(route_handler))
        .route("/api/snap", post(snap_handler))
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

async fn route_handler(
    State(state): State<AppState>,
    Json(req): Json<RouteRequest>,
) -> ApiResult<impl IntoResponse> {
    if !is_valid_coordinate(req.start) || !is_valid_coordinate(req.end) {
        return Err(bad_request("start and end must be valid coordinates"));
    }

    let segments = state.store.snapshot().map_err(|err| api_error(err.into()))?;
    tracing::info!(
        "route request {:?} -> {:?} ({:?}) over {} segments",
        req.start,
        req.end,
        req.preference,
        segments.len()
    );

    let planned = state
        .planner
        .plan(&segments, req.start, req.end, req.preference)
        .await;
    let gpx_base64 = encode_route_as_gpx(&planned.path, GPX_TRACK_NAME).map_err(api_error)?;

    Ok(Json(RouteResponse {
        path: planned.path,
        distance_km: planned.distance_km,
        duration_min: planned.duration_min,
        strategy: planned.strategy,
        gpx_base64,
    }))
}

async fn snap_handler(
    State(state): State<AppState>,
    Json(req): Json<SnapRequest>,
) -> ApiResult<Json<SnapResponse>> {
    if !is_valid_coordinate(req.point) {
        return Err(bad_request("point must be a valid coordinate"));
    }
    let segments = state.store.snapshot().map_err(|err| api_error(err.into()))?;
    Ok(Json(state.planner.snap(&segments, req.point)))
}

async fn health_handler() -> &'static str {
    "ok"
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            message: message.to_string(),
        }),
    )
}

fn api_error(err: RouteError) -> (StatusCode, Json<ApiError>) {
    tracing::error!("request failed: {err}");
    (
        err.status(),
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
