use crate::{
    cache::UrlCache, config::Config, playback::PlaybackResolver, store::CatalogStore,
    sync::ReconciliationEngine, vod::VodClient,
};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Local catalog mirror
    pub store: CatalogStore,
    /// Catalog reconciliation engine
    pub engine: ReconciliationEngine,
    /// Playback and thumbnail URL resolution
    pub resolver: PlaybackResolver,
}

impl AppState {
    /// Wire up the state from its parts. The URL cache is created here —
    /// one instance per process, shared by every resolver clone.
    pub fn new(config: Config, store: CatalogStore, vod: Arc<dyn VodClient>) -> Self {
        let cache = UrlCache::new();
        let engine = ReconciliationEngine::new(vod.clone(), store.clone());
        let resolver = PlaybackResolver::new(vod, store.clone(), cache);

        Self {
            config: Arc::new(config),
            store,
            engine,
            resolver,
        }
    }
}
