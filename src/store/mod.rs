//! Local catalog store: persisted models and the SQL repository.

pub mod catalog;

pub use catalog::CatalogStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a catalog entry.
///
/// `Deleted` is a soft delete used for directly added entries; entries
/// mirrored from the provider are hard-deleted by reconciliation instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VideoStatus {
    Active,
    Inactive,
    Processing,
    Deleted,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Active => "active",
            VideoStatus::Inactive => "inactive",
            VideoStatus::Processing => "processing",
            VideoStatus::Deleted => "deleted",
        }
    }
}

/// A locally mirrored video asset.
///
/// A well-formed entry has exactly one of `remote_asset_id` (provider
/// hosted, play URL minted on demand) or `static_url` (self-hosted, played
/// directly) set. Both may be absent only transiently, right after
/// reconciliation creates the row and before enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogEntry {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub remote_asset_id: Option<String>,
    pub static_url: Option<String>,
    /// Last play URL resolved for a remote entry. Best-effort cache only,
    /// refreshed opportunistically at playback time; may be expired.
    pub play_url: String,
    pub thumbnail_url: String,
    pub duration_seconds: i64,
    pub file_size: i64,
    pub resolution: String,
    pub view_count: i64,
    pub like_count: i64,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn is_remote(&self) -> bool {
        self.remote_asset_id.is_some()
    }
}

/// Input for direct (static) catalog insertion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaticEntry {
    pub title: String,
    pub static_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub duration_seconds: i64,
}

/// One recorded playback event.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ViewLog {
    pub id: i64,
    pub video_id: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub viewed_at: DateTime<Utc>,
    pub duration_watched: i64,
    pub device_type: String,
}

/// Aggregate catalog statistics for the overview endpoint.
///
/// Video and view totals cover active entries only; the today/week
/// windows count raw `view_logs` rows, which are append-only and survive
/// soft deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_videos: i64,
    pub total_views: i64,
    pub views_today: i64,
    pub views_this_week: i64,
}

/// Client-side context captured with a playback event.
#[derive(Debug, Clone, Default)]
pub struct ViewEvent {
    pub ip_address: String,
    pub user_agent: String,
    pub duration_watched: i64,
    pub device_type: String,
}

/// Sort order for active-catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Most viewed first (default).
    #[default]
    ViewCount,
    /// Newest first.
    Latest,
    /// Longest first.
    Duration,
}

impl SortKey {
    /// Parse the `sort` query parameter; anything unrecognized falls back
    /// to the default.
    pub fn parse(s: &str) -> Self {
        match s {
            "latest" => SortKey::Latest,
            "duration" => SortKey::Duration,
            _ => SortKey::ViewCount,
        }
    }

    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            SortKey::ViewCount => "view_count DESC",
            SortKey::Latest => "created_at DESC",
            SortKey::Duration => "duration_seconds DESC",
        }
    }
}
