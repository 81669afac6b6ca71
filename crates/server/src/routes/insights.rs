use axum::{Json, extract::State, response::Json as ResponseJson};
use insights::{FALLBACK_INSIGHT, TaskSnapshot};
use serde::Serialize;
use serde_json::Value;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize, TS)]
pub struct InsightResponse {
    pub insight: String,
}

/// Always answers 200. A missing key, a provider outage or an unreadable
/// response all degrade to the canned fallback text.
pub async fn generate_insights(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<ResponseJson<ApiResponse<InsightResponse>>, ApiError> {
    let snapshots = parse_snapshots(&payload);

    let insight = match state.insights().generate(&snapshots).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "Falling back to static insight");
            FALLBACK_INSIGHT.to_string()
        }
    };

    Ok(ResponseJson(ApiResponse::success(InsightResponse {
        insight,
    })))
}

/// A missing or non-array `tasks` field reads as an empty list, and a bad
/// element degrades to defaults rather than sinking the whole request.
fn parse_snapshots(payload: &Value) -> Vec<TaskSnapshot> {
    payload
        .get("tasks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default()
}
