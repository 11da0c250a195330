use crate::error::Result;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::info;

/// GET /videos/{id}/play — resolve a playable URL.
///
/// Remote entries get a freshly signed URL from the provider on every
/// call; static entries return their stored URL directly.
pub async fn resolve_play_url(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let playback = state.resolver.resolve(id).await?;
    info!("Play URL resolved for video {} ({:?})", id, playback.source);

    Ok(Json(json!({
        "success": true,
        "data": playback,
    }))
    .into_response())
}
