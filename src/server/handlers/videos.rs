//! Catalog CRUD surface: listing, detail, search, direct insertion,
//! soft delete, and playback recording.
//!
//! Durations, view counts, and file sizes are stored as raw numbers and
//! formatted here, at the presentation boundary only.

use crate::error::{Result, ServiceError};
use crate::server::state::AppState;
use crate::store::{CatalogEntry, NewStaticEntry, SortKey, ViewEvent};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    sort: Option<String>,
}

impl ListQuery {
    fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// List-item projection of a catalog entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub duration: String,
    pub duration_seconds: i64,
    pub views: String,
    pub view_count: i64,
    pub likes: i64,
    pub resolution: String,
    pub created_at: String,
}

impl VideoSummary {
    fn from_entry(entry: &CatalogEntry, thumbnail: String) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            description: entry.description.clone(),
            thumbnail,
            duration: format_duration(entry.duration_seconds),
            duration_seconds: entry.duration_seconds,
            views: format_views(entry.view_count),
            view_count: entry.view_count,
            likes: entry.like_count,
            resolution: entry.resolution.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Detail projection: summary plus file size and source kind.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    #[serde(flatten)]
    pub summary: VideoSummary,
    pub file_size: String,
    pub file_size_bytes: i64,
    pub is_remote: bool,
    pub updated_at: String,
}

impl VideoDetail {
    fn from_entry(entry: &CatalogEntry, thumbnail: String) -> Self {
        Self {
            summary: VideoSummary::from_entry(entry, thumbnail),
            file_size: format_file_size(entry.file_size),
            file_size_bytes: entry.file_size,
            is_remote: entry.is_remote(),
            updated_at: entry.updated_at.to_rfc3339(),
        }
    }
}

/// GET /videos — active catalog, paginated and sorted.
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let sort = SortKey::parse(query.sort.as_deref().unwrap_or(""));
    let limit = query.limit();

    let entries = state.store.list_active(sort, limit, query.offset()).await?;
    let total = state.store.count_active().await?;

    // Thumbnails resolve concurrently; each goes through the URL cache
    let thumbnails = join_all(
        entries
            .iter()
            .map(|entry| state.resolver.resolve_thumbnail(entry)),
    )
    .await;

    let videos: Vec<VideoSummary> = entries
        .iter()
        .zip(thumbnails)
        .map(|(entry, thumb)| VideoSummary::from_entry(entry, thumb))
        .collect();

    let total_pages = (total + limit - 1) / limit;
    let page = query.page();

    Ok(Json(json!({
        "success": true,
        "data": {
            "videos": videos,
            "pagination": {
                "currentPage": page,
                "perPage": limit,
                "total": total,
                "totalPages": total_pages,
                "hasNext": page < total_pages,
                "hasPrev": page > 1,
            }
        }
    }))
    .into_response())
}

/// GET /videos/{id} — active entry detail.
pub async fn get_video(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let entry = state
        .store
        .get_active(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("video {id} not found")))?;

    let thumbnail = state.resolver.resolve_thumbnail(&entry).await;

    Ok(Json(json!({
        "success": true,
        "data": VideoDetail::from_entry(&entry, thumbnail),
    }))
    .into_response())
}

/// GET /videos/search/{keyword} — title/description substring search.
pub async fn search_videos(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let keyword = keyword.trim().to_string();
    if keyword.is_empty() {
        return Err(ServiceError::Validation(
            "search keyword must not be empty".to_string(),
        ));
    }

    let entries = state
        .store
        .search_active(&keyword, query.limit(), query.offset())
        .await?;

    let thumbnails = join_all(
        entries
            .iter()
            .map(|entry| state.resolver.resolve_thumbnail(entry)),
    )
    .await;

    let videos: Vec<VideoSummary> = entries
        .iter()
        .zip(thumbnails)
        .map(|(entry, thumb)| VideoSummary::from_entry(entry, thumb))
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "videos": videos,
            "keyword": keyword,
            "count": videos.len(),
        }
    }))
    .into_response())
}

/// POST /videos — direct insertion of a static (self-hosted) entry.
pub async fn create_video(
    State(state): State<AppState>,
    Json(new): Json<NewStaticEntry>,
) -> Result<Response> {
    if new.title.trim().is_empty() {
        return Err(ServiceError::Validation("title is required".to_string()));
    }
    if url::Url::parse(&new.static_url).is_err() {
        return Err(ServiceError::Validation(
            "staticUrl must be a valid URL".to_string(),
        ));
    }

    let entry = state.store.insert_static(&new).await?;
    info!("Catalog entry {} created directly: {}", entry.id, entry.title);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": VideoDetail::from_entry(&entry, entry.thumbnail_url.clone()),
        })),
    )
        .into_response())
}

/// DELETE /videos/{id} — soft delete (directly added entries stay in the
/// table flagged as deleted; provider-mirrored rows are removed by sync).
pub async fn delete_video(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    if !state.store.soft_delete(id).await? {
        return Err(ServiceError::NotFound(format!("video {id} not found")));
    }
    info!("Catalog entry {} soft-deleted", id);

    Ok(Json(json!({ "success": true })).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBody {
    #[serde(default)]
    duration_watched: i64,
    #[serde(default)]
    device_type: Option<String>,
}

/// PATCH /videos/{id}/views — record one playback event: view log row plus
/// atomic counter increment, committed together.
pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Option<Json<ViewBody>>,
) -> Result<Response> {
    let Json(body) = body.unwrap_or_default();

    let event = ViewEvent {
        ip_address: client_ip(&headers),
        user_agent: header_str(&headers, "user-agent").unwrap_or_default(),
        duration_watched: body.duration_watched.max(0),
        device_type: body.device_type.unwrap_or_else(|| "unknown".to_string()),
    };

    let (old_count, new_count) = state
        .store
        .record_view(id, &event)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("video {id} not found")))?;

    info!("Video {} views: {} -> {}", id, old_count, new_count);

    Ok(Json(json!({
        "success": true,
        "data": {
            "videoId": id,
            "oldViewCount": old_count,
            "newViewCount": new_count,
        }
    }))
    .into_response())
}

/// GET /videos/{id}/views — current counter, without recording anything.
pub async fn get_view_count(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let entry = state
        .store
        .get_active(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("video {id} not found")))?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "videoId": entry.id,
            "viewCount": entry.view_count,
        }
    }))
    .into_response())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Client IP, preferring the proxy-forwarded chain's first hop.
fn client_ip(headers: &HeaderMap) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next().map(|ip| ip.trim().to_string()))
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// `mm:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "00:00".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Compact view count: `847`, `1.2k`, `3.4M`.
pub fn format_views(count: i64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}k", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Human-readable file size in binary units.
pub fn format_file_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(-5), "00:00");
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(300), "05:00");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3725), "1:02:05");
    }

    #[test]
    fn view_count_formatting() {
        assert_eq!(format_views(0), "0");
        assert_eq!(format_views(847), "847");
        assert_eq!(format_views(1_250), "1.2k");
        assert_eq!(format_views(3_400_000), "3.4M");
    }

    #[test]
    fn file_size_formatting() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.0 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn list_query_clamps_inputs() {
        let q = ListQuery {
            page: Some(0),
            limit: Some(10_000),
            sort: None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_PAGE_SIZE);
        assert_eq!(q.offset(), 0);

        let q = ListQuery {
            page: Some(3),
            limit: Some(20),
            sort: None,
        };
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn forwarded_ip_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.7, 10.0.0.1".parse().unwrap(),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");

        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }
}
