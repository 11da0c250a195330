use crate::error::Result;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /stats/overview — catalog-wide totals plus view activity for the
/// current UTC day and the trailing week.
pub async fn stats_overview(State(state): State<AppState>) -> Result<Response> {
    let stats = state.store.stats_overview().await?;

    Ok(Json(json!({
        "success": true,
        "data": stats,
    }))
    .into_response())
}
