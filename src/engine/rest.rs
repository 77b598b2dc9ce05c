//! REST surface over the catalog.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::engine::emulator::EngineState;
use crate::storage::{Catalog, StorageError};

pub const LISTENER: &str = "rest";

pub fn router(state: Arc<EngineState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v2/projects", get(list_projects))
        .route("/v2/projects/{project}/datasets", get(list_datasets))
        .route("/v2/projects/{project}/datasets/{dataset}", get(get_dataset))
        .route(
            "/v2/projects/{project}/datasets/{dataset}/tables",
            get(list_tables),
        )
        .route(
            "/v2/projects/{project}/datasets/{dataset}/tables/{table}/data",
            get(list_rows),
        )
        .fallback(fallback)
        .with_state(state)
}

/// Error returned by both listeners as a JSON body.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Storage(StorageError),
    /// A catalog query task panicked or was cancelled.
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {}", what)),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "Storage error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Internal(reason) => {
                tracing::error!(error = %reason, "Catalog query task failed");
                (StatusCode::INTERNAL_SERVER_ERROR, reason)
            }
        };
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Run a catalog query on the blocking pool.
///
/// SQLite calls hold the catalog mutex and may sit in the busy handler while
/// another process holds the file lock; neither may stall an async worker.
pub(crate) async fn query<T, F>(state: &Arc<EngineState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Catalog) -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.catalog))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn fallback() -> ApiError {
    ApiError::NotFound("resource".to_string())
}

async fn list_projects(State(state): State<Arc<EngineState>>) -> Result<Json<Value>, ApiError> {
    let projects: Vec<Value> = query(&state, |catalog| catalog.project_ids())
        .await?
        .into_iter()
        .map(|id| json!({ "id": id }))
        .collect();
    Ok(Json(json!({ "projects": projects })))
}

async fn list_datasets(
    State(state): State<Arc<EngineState>>,
    Path(project): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let lookup = project.clone();
    let ids = query(&state, move |catalog| catalog.dataset_ids(&lookup))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {}", project)))?;

    let datasets: Vec<Value> = ids
        .into_iter()
        .map(|id| json!({ "id": id, "projectId": project }))
        .collect();
    Ok(Json(json!({ "datasets": datasets })))
}

async fn get_dataset(
    State(state): State<Arc<EngineState>>,
    Path((project, dataset)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let (p, d) = (project.clone(), dataset.clone());
    let found = query(&state, move |catalog| catalog.dataset(&p, &d))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dataset {}.{}", project, dataset)))?;

    let tables: Vec<&str> = found.tables.iter().map(|t| t.id.as_str()).collect();
    Ok(Json(json!({
        "id": found.id,
        "projectId": project,
        "tables": tables,
    })))
}

async fn list_tables(
    State(state): State<Arc<EngineState>>,
    Path((project, dataset)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let (p, d) = (project.clone(), dataset.clone());
    let found = query(&state, move |catalog| catalog.dataset(&p, &d))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dataset {}.{}", project, dataset)))?;

    let tables: Vec<Value> = found
        .tables
        .iter()
        .map(|t| json!({ "id": t.id, "schema": { "fields": t.columns } }))
        .collect();
    Ok(Json(json!({ "tables": tables })))
}

async fn list_rows(
    State(state): State<Arc<EngineState>>,
    Path((project, dataset, table)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let (p, d, t) = (project.clone(), dataset.clone(), table.clone());
    let rows = query(&state, move |catalog| catalog.table_rows(&p, &d, &t))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("table {}.{}.{}", project, dataset, table)))?;

    Ok(Json(json!({
        "totalRows": rows.len(),
        "rows": rows,
    })))
}
