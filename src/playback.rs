//! Playback and thumbnail URL resolution.
//!
//! Remote-hosted entries get a freshly minted signed play URL on every
//! request — the 1-hour validity window is too short for any caching
//! policy used here. Static entries return their stored URL with no
//! provider call. Thumbnails are the cache-backed path: signed cover URLs
//! live in the [`UrlCache`] for 30 minutes.

use crate::cache::{thumbnail_key, UrlCache};
use crate::error::{Result, ServiceError};
use crate::store::{CatalogEntry, CatalogStore};
use crate::vod::VodClient;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a resolved play URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackSource {
    /// Signed URL minted by the provider just now.
    Remote,
    /// Stored URL for a self-hosted asset.
    Static,
}

/// A resolved, playable URL for one catalog entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playback {
    pub id: i64,
    pub title: String,
    pub play_url: String,
    pub source: PlaybackSource,
}

/// Resolves catalog entries to playable URLs. One instance per process,
/// sharing the process-wide [`UrlCache`].
#[derive(Clone)]
pub struct PlaybackResolver {
    vod: Arc<dyn VodClient>,
    store: CatalogStore,
    cache: UrlCache,
}

impl PlaybackResolver {
    pub fn new(vod: Arc<dyn VodClient>, store: CatalogStore, cache: UrlCache) -> Self {
        Self { vod, store, cache }
    }

    /// Resolve a playable URL for the given catalog id.
    ///
    /// Fails with `NotFound` when the entry is absent or soft-deleted, and
    /// with `Validation` when the entry has neither a remote asset nor a
    /// static URL.
    pub async fn resolve(&self, catalog_id: i64) -> Result<Playback> {
        let entry = self
            .store
            .get_active(catalog_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("video {catalog_id} not found")))?;

        if let Some(remote_id) = entry.remote_asset_id.as_deref() {
            info!("Resolving signed play URL for video {} ({})", entry.id, remote_id);
            let play = self.vod.get_play_url(remote_id).await?;

            // Best-effort: keep the last resolved URL on the row for
            // fallback display. Never fails the resolution.
            if let Err(e) = self.store.update_play_url(entry.id, &play.play_url).await {
                warn!(
                    "Failed to persist resolved play URL for video {}: {}",
                    entry.id, e
                );
            }

            return Ok(Playback {
                id: entry.id,
                title: entry.title,
                play_url: play.play_url,
                source: PlaybackSource::Remote,
            });
        }

        if let Some(static_url) = entry.static_url.clone() {
            return Ok(Playback {
                id: entry.id,
                title: entry.title,
                play_url: static_url,
                source: PlaybackSource::Static,
            });
        }

        Err(ServiceError::Validation(format!(
            "video {} has no playable source",
            entry.id
        )))
    }

    /// Resolve a display thumbnail for an entry.
    ///
    /// Remote entries go through the URL cache; on a miss the provider's
    /// cover URL is fetched and cached, and on provider failure the stored
    /// thumbnail is the fallback. Static entries use the stored thumbnail
    /// directly.
    pub async fn resolve_thumbnail(&self, entry: &CatalogEntry) -> String {
        let Some(remote_id) = entry.remote_asset_id.as_deref() else {
            return entry.thumbnail_url.clone();
        };

        let key = thumbnail_key(remote_id);
        if let Some(url) = self.cache.get(&key) {
            return url;
        }

        match self.vod.get_asset_info(remote_id).await {
            Ok(info) if !info.cover_url.is_empty() => {
                self.cache.put(&key, info.cover_url.clone());
                info.cover_url
            }
            Ok(_) => entry.thumbnail_url.clone(),
            Err(e) => {
                warn!(
                    "Cover URL fetch failed for {}; using stored thumbnail: {}",
                    remote_id, e
                );
                entry.thumbnail_url.clone()
            }
        }
    }
}
