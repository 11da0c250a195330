//! Remote VOD provider boundary.
//!
//! [`VodClient`] is the capability the rest of the service consumes: list
//! assets, fetch per-asset metadata, and mint short-lived signed play URLs.
//! The HTTP implementation lives in [`client`]; tests substitute their own
//! impls. No retries happen at this boundary — retry policy belongs to the
//! caller.

pub mod client;

pub use client::HttpVodClient;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

/// Provider page size for asset listing.
pub const LIST_PAGE_SIZE: u32 = 100;

/// Circuit breaker: maximum pages fetched in one `list_all_assets` call.
/// Guards against a provider reporting an inconsistent total that would
/// otherwise loop forever.
pub const MAX_LIST_PAGES: u32 = 10;

/// Signed play URLs are valid for one hour.
pub const PLAY_URL_TTL_SECS: u32 = 3600;

pub type VodResult<T> = Result<T, VodError>;

/// Errors surfaced by the provider. Each carries the provider's machine
/// code plus a human-readable message.
#[derive(Debug, Error)]
pub enum VodError {
    #[error("access key rejected ({code}): {message}")]
    Auth { code: String, message: String },

    #[error("asset not found ({code}): {message}")]
    NotFound { code: String, message: String },

    #[error("account suspended or delinquent ({code}): {message}")]
    QuotaExceeded { code: String, message: String },

    #[error("network failure reaching provider: {0}")]
    Network(String),

    #[error("provider error ({code}): {message}")]
    Unknown { code: String, message: String },
}

/// An asset as the provider describes it. Transient — consumed by the
/// reconciliation engine, never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub remote_asset_id: String,
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "duration_seconds", default)]
    pub duration_seconds: i64,
    pub cover_url: String,
    pub status: String,
    pub creation_time: String,
    pub size: i64,
}

/// One page of the provider's asset listing.
#[derive(Debug, Clone)]
pub struct AssetPage {
    pub items: Vec<RemoteAsset>,
    /// Provider-reported total across all pages. Not trusted blindly; see
    /// [`MAX_LIST_PAGES`].
    pub total: u64,
}

/// A freshly minted signed play URL and its transcode metadata.
#[derive(Debug, Clone)]
pub struct PlayInfo {
    pub play_url: String,
    pub definition: String,
    pub format: String,
}

/// The provider returns durations as fractional-second strings or numbers
/// depending on the call; normalize to whole non-negative seconds, zero on
/// anything unparseable.
fn duration_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => (n.as_f64().unwrap_or(0.0) as i64).max(0),
        serde_json::Value::String(s) => s.parse::<f64>().map(|f| (f as i64).max(0)).unwrap_or(0),
        _ => 0,
    })
}

/// Capability trait over the remote media provider.
#[async_trait]
pub trait VodClient: Send + Sync {
    /// Fetch one page of the asset listing, newest first.
    async fn list_assets(&self, page_no: u32, page_size: u32) -> VodResult<AssetPage>;

    /// Fetch one asset's full metadata. The listing may return incomplete
    /// fields, so reconciliation always goes through this call.
    async fn get_asset_info(&self, remote_asset_id: &str) -> VodResult<RemoteAsset>;

    /// Mint a signed play URL valid for [`PLAY_URL_TTL_SECS`]. Never cached
    /// by the client — freshness is the caller's responsibility.
    async fn get_play_url(&self, remote_asset_id: &str) -> VodResult<PlayInfo>;

    /// Fetch the complete asset list by paging through `list_assets`.
    ///
    /// Stops on a short page or when the running count reaches the
    /// provider-reported total. If [`MAX_LIST_PAGES`] is hit first, the
    /// partial list is returned with a logged warning, not an error.
    async fn list_all_assets(&self) -> VodResult<Vec<RemoteAsset>> {
        let mut all = Vec::new();
        let mut page_no = 1u32;

        loop {
            let page = self.list_assets(page_no, LIST_PAGE_SIZE).await?;
            let fetched = page.items.len();
            all.extend(page.items);

            let has_more = fetched == LIST_PAGE_SIZE as usize && (all.len() as u64) < page.total;
            if !has_more {
                break;
            }

            page_no += 1;
            if page_no > MAX_LIST_PAGES {
                warn!(
                    "asset listing hit the {}-page cap with {} assets fetched \
                     (provider reported {}); returning partial list",
                    MAX_LIST_PAGES,
                    all.len(),
                    page.total
                );
                break;
            }
        }

        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str) -> RemoteAsset {
        RemoteAsset {
            remote_asset_id: id.to_string(),
            title: format!("Asset {id}"),
            description: String::new(),
            duration_seconds: 60,
            cover_url: String::new(),
            status: "Normal".to_string(),
            creation_time: "2024-01-01T00:00:00Z".to_string(),
            size: 0,
        }
    }

    /// Serves a fixed-size listing split into provider pages.
    struct PagedListing {
        assets: Vec<RemoteAsset>,
        reported_total: u64,
    }

    #[async_trait]
    impl VodClient for PagedListing {
        async fn list_assets(&self, page_no: u32, page_size: u32) -> VodResult<AssetPage> {
            let start = ((page_no - 1) * page_size) as usize;
            let end = (start + page_size as usize).min(self.assets.len());
            let items = if start >= self.assets.len() {
                Vec::new()
            } else {
                self.assets[start..end].to_vec()
            };
            Ok(AssetPage {
                items,
                total: self.reported_total,
            })
        }

        async fn get_asset_info(&self, remote_asset_id: &str) -> VodResult<RemoteAsset> {
            Ok(asset(remote_asset_id))
        }

        async fn get_play_url(&self, _remote_asset_id: &str) -> VodResult<PlayInfo> {
            unimplemented!("not used in listing tests")
        }
    }

    #[tokio::test]
    async fn list_all_single_short_page() {
        let client = PagedListing {
            assets: (0..5).map(|i| asset(&format!("v{i}"))).collect(),
            reported_total: 5,
        };
        let all = client.list_all_assets().await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn list_all_spans_pages_until_total() {
        let client = PagedListing {
            assets: (0..250).map(|i| asset(&format!("v{i}"))).collect(),
            reported_total: 250,
        };
        let all = client.list_all_assets().await.unwrap();
        assert_eq!(all.len(), 250);
        assert_eq!(all[0].remote_asset_id, "v0");
        assert_eq!(all[249].remote_asset_id, "v249");
    }

    #[tokio::test]
    async fn list_all_stops_at_page_cap_on_inconsistent_total() {
        // Provider claims far more assets than the cap allows fetching; the
        // listing itself always fills every requested page.
        let client = PagedListing {
            assets: (0..2000).map(|i| asset(&format!("v{i}"))).collect(),
            reported_total: 1_000_000,
        };
        let all = client.list_all_assets().await.unwrap();
        assert_eq!(
            all.len(),
            (MAX_LIST_PAGES * LIST_PAGE_SIZE) as usize,
            "partial list capped at {} pages",
            MAX_LIST_PAGES
        );
    }

    #[test]
    fn duration_parses_from_string_and_number() {
        let a: RemoteAsset = serde_json::from_value(serde_json::json!({
            "remote_asset_id": "v1",
            "title": "t",
            "description": "",
            "duration_seconds": "135.62",
            "cover_url": "",
            "status": "Normal",
            "creation_time": "",
            "size": 0
        }))
        .unwrap();
        assert_eq!(a.duration_seconds, 135);

        let b: RemoteAsset = serde_json::from_value(serde_json::json!({
            "remote_asset_id": "v1",
            "title": "t",
            "description": "",
            "duration_seconds": 90,
            "cover_url": "",
            "status": "Normal",
            "creation_time": "",
            "size": 0
        }))
        .unwrap();
        assert_eq!(b.duration_seconds, 90);

        let c: RemoteAsset = serde_json::from_value(serde_json::json!({
            "remote_asset_id": "v1",
            "title": "t",
            "description": "",
            "duration_seconds": "not-a-number",
            "cover_url": "",
            "status": "Normal",
            "creation_time": "",
            "size": 0
        }))
        .unwrap();
        assert_eq!(c.duration_seconds, 0, "unparseable duration becomes zero");
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        let from_string: RemoteAsset = serde_json::from_value(serde_json::json!({
            "remote_asset_id": "v1",
            "title": "t",
            "description": "",
            "duration_seconds": "-5",
            "cover_url": "",
            "status": "Normal",
            "creation_time": "",
            "size": 0
        }))
        .unwrap();
        assert_eq!(from_string.duration_seconds, 0);

        let from_number: RemoteAsset = serde_json::from_value(serde_json::json!({
            "remote_asset_id": "v1",
            "title": "t",
            "description": "",
            "duration_seconds": -12.5,
            "cover_url": "",
            "status": "Normal",
            "creation_time": "",
            "size": 0
        }))
        .unwrap();
        assert_eq!(from_number.duration_seconds, 0);
    }
}
