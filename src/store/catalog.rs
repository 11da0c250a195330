//! SQL repository over the local catalog store.
//!
//! All writes are scoped to a single logical operation; the only
//! multi-statement transaction is [`CatalogStore::record_view`], which
//! commits the view log row and the counter increment together or not at
//! all. The increment itself is a store-level `view_count = view_count + 1`
//! so concurrent playback events never lose updates.

use super::{CatalogEntry, NewStaticEntry, SortKey, StatsOverview, VideoStatus, ViewEvent};
use crate::vod::RemoteAsset;
use chrono::{NaiveTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

/// SQL column list matching [`CatalogEntry`]'s field order.
const ENTRY_COLUMNS: &str = "id, title, description, remote_asset_id, static_url, play_url, \
     thumbnail_url, duration_seconds, file_size, resolution, view_count, \
     like_count, status, created_at, updated_at";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS catalog_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        remote_asset_id TEXT UNIQUE,
        static_url TEXT,
        play_url TEXT NOT NULL DEFAULT '',
        thumbnail_url TEXT NOT NULL DEFAULT '',
        duration_seconds INTEGER NOT NULL DEFAULT 0,
        file_size INTEGER NOT NULL DEFAULT 0,
        resolution TEXT NOT NULL DEFAULT '720p',
        view_count INTEGER NOT NULL DEFAULT 0,
        like_count INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_entries_status ON catalog_entries(status)",
    "CREATE INDEX IF NOT EXISTS idx_entries_view_count ON catalog_entries(view_count DESC)",
    "CREATE INDEX IF NOT EXISTS idx_entries_created_at ON catalog_entries(created_at DESC)",
    "CREATE TABLE IF NOT EXISTS view_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id INTEGER NOT NULL REFERENCES catalog_entries(id) ON DELETE CASCADE,
        ip_address TEXT NOT NULL DEFAULT '',
        user_agent TEXT NOT NULL DEFAULT '',
        viewed_at TEXT NOT NULL,
        duration_watched INTEGER NOT NULL DEFAULT 0,
        device_type TEXT NOT NULL DEFAULT 'unknown'
    )",
    "CREATE INDEX IF NOT EXISTS idx_view_logs_video_id ON view_logs(video_id)",
    "CREATE INDEX IF NOT EXISTS idx_view_logs_viewed_at ON view_logs(viewed_at)",
];

/// Catalog repository over a shared SQLite connection pool.
#[derive(Clone, Debug)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    /// Connect to the database named by `url` and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("Catalog store ready at {}", url);
        Ok(store)
    }

    /// In-memory store for tests. A single connection keeps every query on
    /// the same private memory database.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<CatalogEntry>, sqlx::Error> {
        sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Fetch an entry only if it is active.
    pub async fn get_active(&self, id: i64) -> Result<Option<CatalogEntry>, sqlx::Error> {
        sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE id = ? AND status = 'active'"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_active(
        &self,
        sort: SortKey,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CatalogEntry>, sqlx::Error> {
        sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries \
             WHERE status = 'active' ORDER BY {} LIMIT ? OFFSET ?",
            sort.order_by()
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_active(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM catalog_entries WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Title/description substring search over active entries, most viewed
    /// first.
    pub async fn search_active(
        &self,
        keyword: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CatalogEntry>, sqlx::Error> {
        let pattern = format!("%{}%", keyword.trim());
        sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries \
             WHERE status = 'active' AND (title LIKE ? OR description LIKE ?) \
             ORDER BY view_count DESC LIMIT ? OFFSET ?"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// All entries mirrored from the provider, regardless of status.
    /// Reconciliation diffs against this set.
    pub async fn list_remote_entries(&self) -> Result<Vec<CatalogEntry>, sqlx::Error> {
        sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries \
             WHERE remote_asset_id IS NOT NULL AND remote_asset_id != ''"
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Insert a newly sighted remote asset. Returns the new local id.
    pub async fn insert_remote(&self, asset: &RemoteAsset) -> Result<i64, sqlx::Error> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO catalog_entries \
             (title, description, remote_asset_id, thumbnail_url, duration_seconds, \
              file_size, status, view_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, 'active', 0, ?, ?)",
        )
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(&asset.remote_asset_id)
        .bind(&asset.cover_url)
        .bind(asset.duration_seconds)
        .bind(asset.size)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a directly added static entry.
    pub async fn insert_static(&self, new: &NewStaticEntry) -> Result<CatalogEntry, sqlx::Error> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO catalog_entries \
             (title, description, static_url, thumbnail_url, duration_seconds, \
              status, view_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'active', 0, ?, ?)",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.static_url)
        .bind(&new.thumbnail_url)
        .bind(new.duration_seconds)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Metadata refresh during reconciliation. Never touches view_count or
    /// created_at.
    pub async fn update_remote_metadata(
        &self,
        id: i64,
        asset: &RemoteAsset,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE catalog_entries \
             SET title = ?, description = ?, duration_seconds = ?, thumbnail_url = ?, \
                 updated_at = ? \
             WHERE id = ?",
        )
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(asset.duration_seconds)
        .bind(&asset.cover_url)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Hard delete; associated view logs cascade.
    pub async fn delete(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM catalog_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Soft delete. Returns false when no row matched.
    pub async fn soft_delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE catalog_entries SET status = 'deleted', updated_at = ? \
             WHERE id = ? AND status != 'deleted'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist the last resolved play URL. Best-effort cache for fallback
    /// display; callers log and swallow failures.
    pub async fn update_play_url(&self, id: i64, play_url: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE catalog_entries SET play_url = ?, updated_at = ? WHERE id = ?")
            .bind(play_url)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record one playback event: the log row and the counter increment
    /// commit together. Returns `(old_count, new_count)`, or `None` when
    /// the entry is absent or soft-deleted.
    pub async fn record_view(
        &self,
        id: i64,
        event: &ViewEvent,
    ) -> Result<Option<(i64, i64)>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64, VideoStatus)> =
            sqlx::query_as("SELECT view_count, status FROM catalog_entries WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let old_count = match row {
            Some((_, VideoStatus::Deleted)) | None => return Ok(None),
            Some((count, _)) => count,
        };

        // IP column is bounded at 45 chars (IPv6 max)
        let ip: String = event.ip_address.chars().take(45).collect();

        sqlx::query(
            "INSERT INTO view_logs \
             (video_id, ip_address, user_agent, viewed_at, duration_watched, device_type) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(ip)
        .bind(&event.user_agent)
        .bind(Utc::now())
        .bind(event.duration_watched)
        .bind(&event.device_type)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE catalog_entries \
             SET view_count = view_count + 1, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let (new_count,): (i64,) =
            sqlx::query_as("SELECT view_count FROM catalog_entries WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(Some((old_count, new_count)))
    }

    pub async fn count_view_logs(&self, video_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM view_logs WHERE video_id = ?")
                .bind(video_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Aggregate statistics: active entry and view totals, plus view log
    /// counts since UTC midnight and over the last seven days.
    pub async fn stats_overview(&self) -> Result<StatsOverview, sqlx::Error> {
        let (total_videos, total_views): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(view_count), 0) \
             FROM catalog_entries WHERE status = 'active'",
        )
        .fetch_one(&self.pool)
        .await?;

        let now = Utc::now();
        let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let week_start = now - chrono::Duration::days(7);

        let (views_today,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM view_logs WHERE viewed_at >= ?")
                .bind(day_start)
                .fetch_one(&self.pool)
                .await?;
        let (views_this_week,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM view_logs WHERE viewed_at >= ?")
                .bind(week_start)
                .fetch_one(&self.pool)
                .await?;

        Ok(StatsOverview {
            total_videos,
            total_views,
            views_today,
            views_this_week,
        })
    }
}
