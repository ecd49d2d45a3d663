use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use dbsweep::error::EngineError;
use dbsweep::update::CellUpdater;

use super::{require_admin, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateCellRequest {
    pub table: String,
    pub column: String,
    pub primary_key: String,
    pub primary_value: String,
    pub content: String,
}

/// POST /api/update - targeted write to one cell of one row.
pub async fn update_cell(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UpdateCellRequest>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<Value>)> {
    require_admin(&state, &headers)?;

    let updater = CellUpdater::new(state.db.clone());
    match updater
        .update_cell(
            &req.table,
            &req.column,
            &req.primary_key,
            &req.primary_value,
            &req.content,
        )
        .await
    {
        Ok(()) => Ok(Json(ApiResponse::with_message((), "Content updated successfully!"))),
        Err(EngineError::Validation(msg)) => Ok(Json(ApiResponse::error(&msg))),
        Err(EngineError::Database(e)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("failed to update content: {}", e)})),
        )),
    }
}
