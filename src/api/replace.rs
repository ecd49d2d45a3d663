use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use dbsweep::error::EngineError;
use dbsweep::replace::{MassReplaceEngine, ReplacementOutcome};

use super::{require_admin, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MassReplaceRequest {
    pub term: String,
    pub replacement: String,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
}

fn default_case_sensitive() -> bool {
    true
}

/// POST /api/replace - mass replace in published content, behind a backup.
pub async fn mass_replace(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<MassReplaceRequest>,
) -> Result<Json<ApiResponse<ReplacementOutcome>>, (StatusCode, Json<Value>)> {
    require_admin(&state, &headers)?;

    let engine = MassReplaceEngine::new(state.db.clone(), state.config.engine.clone());
    match engine
        .mass_replace(&req.term, &req.replacement, req.case_sensitive)
        .await
    {
        Ok(outcome) => {
            let message = if outcome.rows_updated > 0 {
                format!(
                    "{} rows updated successfully! Backup created in table: {}",
                    outcome.rows_updated,
                    outcome.backup_table.as_deref().unwrap_or("-"),
                )
            } else {
                "No rows were updated.".to_string()
            };
            Ok(Json(ApiResponse::with_message(outcome, message)))
        }
        Err(EngineError::Validation(msg)) => Ok(Json(ApiResponse::error(&msg))),
        Err(EngineError::Database(e)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("database error: {}", e)})),
        )),
    }
}
