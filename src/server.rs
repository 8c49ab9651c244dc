//! HTTP API for the contracts dataset
//!
//! Routes:
//! - `GET /api/health`
//! - `GET /api/states`
//! - `GET /api/descriptions`
//! - `GET /api/contracts`
//! - `GET /api/contracts/search`
//! - `POST /api/reload`

use crate::dataset::{ContractTable, RowView};
use crate::error::{ApiError, ErrorResponse, LoadError, Result};
use crate::filter::ContractFilter;
use crate::search::search_contracts;
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Behavior switches for the two historical variants of the API.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Sort the state and description lists.
    pub sort_lists: bool,
    /// Drop rows with a missing or blank contract id from listings.
    pub require_contract_id: bool,
    pub allowed_origin: HeaderValue,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            sort_lists: true,
            require_contract_id: true,
            allowed_origin: HeaderValue::from_static(DEFAULT_ALLOWED_ORIGIN),
        }
    }
}

/// Where handlers get their table from.
pub enum TableSource {
    /// Re-read the file on every request.
    PerRequest { path: PathBuf },
    /// Serve a table loaded up front until the next reload.
    Preloaded {
        path: PathBuf,
        table: RwLock<Option<Arc<ContractTable>>>,
    },
}

impl TableSource {
    pub fn per_request(path: impl Into<PathBuf>) -> Self {
        TableSource::PerRequest { path: path.into() }
    }

    /// Load the file once. A failed load is logged and leaves the source
    /// empty until a reload succeeds.
    pub async fn preloaded(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let table = match load_blocking(path.clone()).await {
            Ok(table) => {
                info!(path = %path.display(), rows = table.len(), "preloaded contract data");
                Some(Arc::new(table))
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "initial load failed");
                None
            }
        };

        TableSource::Preloaded {
            path,
            table: RwLock::new(table),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            TableSource::PerRequest { path } | TableSource::Preloaded { path, .. } => path,
        }
    }

    pub async fn table(&self) -> Result<Arc<ContractTable>> {
        match self {
            TableSource::PerRequest { path } => Ok(Arc::new(load_blocking(path.clone()).await?)),
            TableSource::Preloaded { table, .. } => table
                .read()
                .await
                .clone()
                .ok_or(ApiError::Load(LoadError::NotLoaded)),
        }
    }

    /// Re-read the file. On failure a preloaded table stays in place.
    pub async fn reload(&self) -> Result<Arc<ContractTable>> {
        let fresh = Arc::new(load_blocking(self.path().to_path_buf()).await?);
        if let TableSource::Preloaded { table, .. } = self {
            *table.write().await = Some(fresh.clone());
        }
        Ok(fresh)
    }
}

async fn load_blocking(path: PathBuf) -> Result<ContractTable> {
    let table = tokio::task::spawn_blocking(move || ContractTable::load(&path)).await??;
    Ok(table)
}

/// Server state shared between handlers
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<TableSource>,
    pub options: Arc<ApiOptions>,
}

impl AppState {
    pub fn new(source: TableSource, options: ApiOptions) -> Self {
        Self {
            source: Arc::new(source),
            options: Arc::new(options),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ReloadResponse {
    rows: usize,
    rejected: usize,
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "contracts-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_states(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let table = state.source.table().await?;
    let states = table.distinct(|row| row.state(), state.options.sort_lists);
    info!(count = states.len(), "listed states");
    Ok(Json(states))
}

async fn list_descriptions(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let table = state.source.table().await?;
    let descriptions = table.distinct(|row| row.description(), state.options.sort_lists);
    info!(count = descriptions.len(), "listed descriptions");
    Ok(Json(descriptions))
}

async fn list_contracts(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response> {
    let filter =
        ContractFilter::from_query(&params)?.require_contract_id(state.options.require_contract_id);
    let table = state.source.table().await?;

    let rows = filter.apply(&table);
    info!(total = table.len(), matched = rows.len(), "listed contracts");
    json_rows(&rows)
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    let table = state.source.table().await?;

    let rows = search_contracts(&table, &params.query, state.options.require_contract_id);
    info!(matched = rows.len(), "searched contracts");
    json_rows(&rows)
}

async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>> {
    let table = state.source.reload().await?;
    info!(rows = table.len(), rejected = table.rejected(), "reloaded contract data");
    Ok(Json(ReloadResponse {
        rows: table.len(),
        rejected: table.rejected(),
    }))
}

async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Endpoint not found: {} {}", method, uri.path()),
        }),
    )
}

// Rows borrow the table, so they are encoded here rather than returned as `Json`.
fn json_rows(rows: &[RowView<'_>]) -> Result<Response> {
    let body = serde_json::to_vec(rows)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Only a request from `origin` gets an `Access-Control-Allow-Origin` header.
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.options.allowed_origin.clone());

    Router::new()
        .route("/api/health", get(health))
        .route("/api/states", get(list_states))
        .route("/api/descriptions", get(list_descriptions))
        .route("/api/contracts", get(list_contracts))
        .route("/api/contracts/search", get(search))
        .route("/api/reload", post(reload))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
