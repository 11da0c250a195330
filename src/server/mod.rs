pub mod handlers;
pub mod state;

use crate::config::Config;
use crate::store::CatalogStore;
use crate::vod::HttpVodClient;
use axum::{
    Router,
    routing::{get, post},
};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Build the full route table over a prepared [`AppState`].
///
/// Split from [`start`] so integration tests can drive the router
/// directly with `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route(
            "/videos",
            get(handlers::videos::list_videos).post(handlers::videos::create_video),
        )
        .route(
            "/videos/search/{keyword}",
            get(handlers::videos::search_videos),
        )
        .route(
            "/videos/{id}",
            get(handlers::videos::get_video).delete(handlers::videos::delete_video),
        )
        .route("/videos/{id}/play", get(handlers::play::resolve_play_url))
        .route(
            "/videos/{id}/views",
            get(handlers::videos::get_view_count).patch(handlers::videos::record_view),
        )
        .route("/stats/overview", get(handlers::stats::stats_overview))
        .route("/sync", post(handlers::sync::run_sync));

    if state.config.is_dev {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let store = CatalogStore::connect(&config.database_url).await?;

    let vod = Arc::new(HttpVodClient::new(
        config.vod_endpoint.clone(),
        config.vod_access_key_id.clone(),
        config.vod_access_key_secret.clone(),
    ));

    let state = AppState::new(config, store, vod);
    let app = build_router(state);

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚀 Server listening on http://{}", addr);

    // Start serving
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
