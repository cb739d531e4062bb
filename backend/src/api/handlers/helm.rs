//! Helm chart repository HTTP handlers.
//!
//! Routes:
//!   POST|PUT /            - Upload chart package (raw .tgz body)
//!   POST|PUT /{path}      - Same; the path is ignored
//!   GET      /{key}       - Download index.yaml or a chart package
//!
//! Any other method on these paths answers 405.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::formats::helm::{parse_chart_filename, ChartArchive};
use crate::services::index_service::UpdateOutcome;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(upload_chart).put(upload_chart))
        .route(
            "/*key",
            get(download).post(upload_chart).put(upload_chart),
        )
}

// ---------------------------------------------------------------------------
// POST|PUT -- Upload chart package
// ---------------------------------------------------------------------------

async fn upload_chart(State(state): State<SharedState>, body: Bytes) -> Result<Response> {
    // Parse before touching storage so a bad package never mutates anything.
    // Decompression is CPU-bound, keep it off the async workers.
    let archive = tokio::task::spawn_blocking(move || ChartArchive::parse(body))
        .await
        .map_err(|e| AppError::Internal(format!("Archive parsing task failed: {}", e)))??;

    let outcome = state.index_service.update(&archive).await?;
    let status = match &outcome {
        UpdateOutcome::Added { name, version, .. } => {
            info!("Helm upload: {} {} added", name, version);
            StatusCode::CREATED
        }
        UpdateOutcome::AlreadyPresent { name, version } => {
            info!("Helm upload: {} {} already present", name, version);
            StatusCode::OK
        }
    };

    empty(status)
}

// ---------------------------------------------------------------------------
// GET /{key} -- Download index or chart package
// ---------------------------------------------------------------------------

async fn download(State(state): State<SharedState>, Path(key): Path<String>) -> Result<Response> {
    let key = key.trim_start_matches('/').to_string();
    if !is_servable_key(&key) {
        return Err(AppError::NotFound(key));
    }

    let content = state.storage.get(&key).await?;
    let file_name = key.rsplit('/').next().unwrap_or(&key);

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_LENGTH, content.len().to_string());

    response = if file_name.ends_with(".yaml") || file_name.ends_with(".yml") {
        response.header(CONTENT_TYPE, "application/x-yaml; charset=utf-8")
    } else if parse_chart_filename(file_name).is_ok() {
        response
            .header(CONTENT_TYPE, "application/gzip")
            .header(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            )
    } else {
        response.header(CONTENT_TYPE, "application/octet-stream")
    };

    response
        .body(Body::from(content))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

/// Keys a client may ask for: relative, no dot segments, no hidden files.
fn is_servable_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && !segment.starts_with('.'))
}

fn empty(status: StatusCode) -> Result<Response> {
    Response::builder()
        .status(status)
        .body(Body::empty())
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
