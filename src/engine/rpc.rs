//! RPC surface: JSON procedure calls over HTTP.
//!
//! Every call is `POST /rpc/<Method>` with a JSON body. Calls that take a
//! project fall back to the engine's active project when none is given.
//! Unknown methods and malformed bodies answer with the same JSON error body
//! as the REST surface.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::emulator::EngineState;
use crate::engine::rest::{fallback, query, ApiError};

pub const LISTENER: &str = "rpc";

pub fn router(state: Arc<EngineState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rpc/GetActiveProject", post(get_active_project))
        .route("/rpc/ListDatasets", post(list_datasets))
        .route("/rpc/ReadRows", post(read_rows))
        .fallback(fallback)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDatasetsRequest {
    #[serde(default)]
    project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadRowsRequest {
    #[serde(default)]
    project_id: Option<String>,
    dataset_id: String,
    table_id: String,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_active_project(State(state): State<Arc<EngineState>>) -> Json<Value> {
    Json(json!({ "projectId": state.active_project() }))
}

async fn list_datasets(
    State(state): State<Arc<EngineState>>,
    payload: Result<Json<ListDatasetsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let project = resolve_project(&state, request.project_id)?;
    let lookup = project.clone();
    let datasets = query(&state, move |catalog| catalog.dataset_ids(&lookup))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {}", project)))?;

    Ok(Json(json!({ "projectId": project, "datasets": datasets })))
}

async fn read_rows(
    State(state): State<Arc<EngineState>>,
    payload: Result<Json<ReadRowsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let project = resolve_project(&state, request.project_id)?;
    let (p, d, t) = (
        project.clone(),
        request.dataset_id.clone(),
        request.table_id.clone(),
    );
    let rows = query(&state, move |catalog| catalog.table_rows(&p, &d, &t))
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "table {}.{}.{}",
                project, request.dataset_id, request.table_id
            ))
        })?;

    Ok(Json(json!({ "rowCount": rows.len(), "rows": rows })))
}

fn resolve_project(state: &EngineState, requested: Option<String>) -> Result<String, ApiError> {
    requested
        .filter(|p| !p.is_empty())
        .or_else(|| state.active_project())
        .ok_or_else(|| ApiError::BadRequest("no project given and no active project".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EmulatorEngine, Engine};
    use crate::seed::{Dataset, Project, Seed};
    use crate::storage::StorageHandle;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    async fn call(engine: &EmulatorEngine, method: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(format!("/rpc/{}", method))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router(engine.shared_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_defaults_to_active_project() {
        let engine = EmulatorEngine::construct(StorageHandle::ephemeral()).unwrap();
        engine
            .load(&Seed::from(Project::new("proj1").with_dataset(Dataset::new("ds1"))))
            .unwrap();
        engine.set_active_project("proj1").unwrap();

        let (_, active) = call(&engine, "GetActiveProject", json!({})).await;
        assert_eq!(active, json!({ "projectId": "proj1" }));

        let (status, datasets) = call(&engine, "ListDatasets", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(datasets, json!({ "projectId": "proj1", "datasets": ["ds1"] }));
    }

    #[tokio::test]
    async fn test_no_project_is_bad_request() {
        let engine = EmulatorEngine::construct(StorageHandle::ephemeral()).unwrap();
        let (status, body) = call(&engine, "ListDatasets", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 400);
    }

    #[tokio::test]
    async fn test_read_rows_of_unknown_table() {
        let engine = EmulatorEngine::construct(StorageHandle::ephemeral()).unwrap();
        engine.load(&Seed::from(Project::new("proj1"))).unwrap();
        let (status, _) = call(
            &engine,
            "ReadRows",
            json!({ "projectId": "proj1", "datasetId": "d", "tableId": "t" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_method_is_json_404() {
        let engine = EmulatorEngine::construct(StorageHandle::ephemeral()).unwrap();
        let (status, body) = call(&engine, "DropEverything", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 404);
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_400() {
        let engine = EmulatorEngine::construct(StorageHandle::ephemeral()).unwrap();
        engine.load(&Seed::from(Project::new("proj1"))).unwrap();

        let (status, body) = call(&engine, "ReadRows", json!({ "projectId": "proj1" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 400);
        assert!(body["error"]["message"].as_str().unwrap().contains("datasetId"));
    }
}
