//! Route handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::AppState;
use crate::error::Error;
use crate::listing::ProductListing;
use crate::service::{Capability, CapabilityState, HealthReport, PriceComparison};
use crate::shopping_list::{NewItem, ShoppingListItem};

/// An [`Error`] rendered as `{"error": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Health
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime: u64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.start_time.elapsed().as_secs(),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.manager.health_check())
}

// ============================================================
// Search
// ============================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub capability: String,
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub capability: Capability,
    pub state: CapabilityState,
    pub query: String,
    pub results: Vec<ProductListing>,
}

pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let capability: Capability = request.capability.parse()?;
    let limit = request.limit.unwrap_or(state.manager.default_limit());
    debug!("search {} {:?} limit={}", capability, request.query, limit);

    let results = state
        .manager
        .search(capability, &request.query, limit)
        .await?;
    Ok(Json(SearchResponse {
        capability,
        state: state.manager.state(capability),
        query: request.query,
        results,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchAllResponse {
    pub query: String,
    pub results: BTreeMap<Capability, Vec<ProductListing>>,
}

pub async fn search_all(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchAllResponse>> {
    let limit = params.limit.unwrap_or(state.manager.default_limit());
    let results = state.manager.search_all(&params.q, limit).await?;
    Ok(Json(SearchAllResponse {
        query: params.q,
        results,
    }))
}

pub async fn price_comparison(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<PriceComparison>> {
    Ok(Json(state.manager.price_comparison(&params.q).await?))
}

// ============================================================
// Shopping lists
// ============================================================

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    pub added: bool,
    pub items: Vec<ShoppingListItem>,
}

pub async fn create_list(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let session_id = state.lists.create_session().await;
    (StatusCode::CREATED, Json(SessionResponse { session_id }))
}

pub async fn list_items(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> ApiResult<Json<Vec<ShoppingListItem>>> {
    let items = state
        .lists
        .with_list(&session, |list| list.items().to_vec())
        .await?;
    Ok(Json(items))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Json(item): Json<NewItem>,
) -> ApiResult<Json<AddItemResponse>> {
    let (added, items) = state
        .lists
        .with_list(&session, |list| {
            let added = list.add(item);
            (added, list.items().to_vec())
        })
        .await?;
    Ok(Json(AddItemResponse { added, items }))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((session, index)): Path<(String, usize)>,
) -> ApiResult<Json<ShoppingListItem>> {
    let removed = state
        .lists
        .with_list(&session, |list| list.remove(index))
        .await??;
    Ok(Json(removed))
}

pub async fn delete_list(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> ApiResult<StatusCode> {
    state.lists.remove_session(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_list(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let text = state
        .lists
        .with_list(&session, |list| list.export_text())
        .await?
        .ok_or_else(|| {
            warn!(session = %session, "No items to export");
            Error::NotFound("no items to export".to_string())
        })?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

// ============================================================
// Metrics
// ============================================================

pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let text = state
        .metrics
        .render()
        .ok_or_else(|| Error::NotFound("metrics are disabled".to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    ))
}
