use crate::error::Result;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::info;

/// POST /sync — run one full reconciliation pass against the provider.
///
/// The pass itself fails only when the provider listing or the local
/// catalog read fails; per-item errors are carried in the report.
pub async fn run_sync(State(state): State<AppState>) -> Result<Response> {
    info!("Catalog sync requested");
    let report = state.engine.synchronize().await?;
    info!(
        "Catalog sync finished: {} remote, {} inserted, {} updated, {} deleted, {} failed",
        report.total_remote, report.inserted, report.updated, report.deleted, report.failed
    );

    Ok(Json(json!({
        "success": true,
        "data": report,
    }))
    .into_response())
}
