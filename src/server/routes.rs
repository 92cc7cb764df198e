use axum::{
    extract::{Query, State},
    Json,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::graph::GraphView;
use crate::ingest::{BatchItem, BatchReport, MetricsSnapshot};
use crate::query::{ImpactAnalyzer, ImpactReport};
use crate::server::AppState;
use crate::Error;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub sql: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub job_id: Uuid,
    pub msg: String,
}

#[derive(Deserialize)]
pub struct ImpactParams {
    pub table: String,
    pub column: String,
}

#[derive(Deserialize)]
pub struct BulkRequest {
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        Error::Parse(_) | Error::UnsupportedStatement(_) | Error::InvalidNode(_) | Error::InvalidEdge(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

fn bad_request(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg.to_string() }))
}

fn join_failed(err: tokio::task::JoinError) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: format!("task failed: {}", err) }),
    )
}

pub async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<AnalyzeResponse> {
    if request.sql.trim().is_empty() {
        return Err(bad_request("sql must not be empty"));
    }

    let handle = state
        .coordinator
        .submit_lineage(request.sql)
        .await
        .map_err(error_response)?;

    Ok(Json(AnalyzeResponse {
        status: handle.status,
        job_id: handle.job_id,
        msg: "lineage extraction queued".to_string(),
    }))
}

pub async fn handle_graph(State(state): State<Arc<AppState>>) -> ApiResult<GraphView> {
    let store = Arc::clone(&state.store);
    let graph = tokio::task::spawn_blocking(move || store.read_all())
        .await
        .map_err(join_failed)?
        .map_err(error_response)?;

    Ok(Json(graph.view()))
}

pub async fn handle_impact(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImpactParams>,
) -> ApiResult<ImpactReport> {
    if params.table.trim().is_empty() || params.column.trim().is_empty() {
        return Err(bad_request("table and column are required"));
    }

    let store = Arc::clone(&state.store);
    let report = tokio::task::spawn_blocking(move || {
        ImpactAnalyzer::new(&*store).check_impact(&params.table, &params.column)
    })
    .await
    .map_err(join_failed)?
    .map_err(error_response)?;

    Ok(Json(report))
}

pub async fn handle_bulk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkRequest>,
) -> ApiResult<BatchReport> {
    let coordinator = Arc::clone(&state.coordinator);
    let report = tokio::task::spawn_blocking(move || coordinator.bulk_ingest(&request.items))
        .await
        .map_err(join_failed)?;

    Ok(Json(report))
}

pub async fn handle_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.coordinator.metrics())
}

pub async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
