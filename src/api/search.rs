use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use dbsweep::error::EngineError;
use dbsweep::search::{SearchEngine, SearchResult};

use super::{require_admin, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

/// POST /api/search - substring search across every text column.
pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SearchRequest>,
) -> Result<Json<ApiResponse<SearchResponse>>, (StatusCode, Json<Value>)> {
    require_admin(&state, &headers)?;

    let engine = SearchEngine::new(state.db.clone(), state.config.engine.clone());
    match engine.search(&req.term).await {
        Ok(results) => {
            let total = results.len();
            Ok(Json(ApiResponse::success(SearchResponse { results, total })))
        }
        Err(EngineError::Validation(msg)) => Ok(Json(ApiResponse::error(&msg))),
        Err(EngineError::Database(e)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("database error: {}", e)})),
        )),
    }
}
