//! Catalog reconciliation: diff the provider's asset list against the
//! local mirror and apply insert/update/delete.
//!
//! One `synchronize()` run is idempotent and safely re-runnable, so an
//! aborted run leaves nothing to repair — committed per-item changes stand
//! and unprocessed items are picked up next time. Overlapping runs are not
//! serialized here; schedule callers must hold their own lock.

use crate::error::{Result, ServiceError};
use crate::store::{CatalogStore, VideoStatus};
use crate::vod::{RemoteAsset, VodClient};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one reconciled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Inserted,
    InsertError,
    Deleted,
    DeleteError,
    Updated,
    UpdateError,
}

/// Per-item reconciliation result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<i64>,
    pub remote_asset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: SyncOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full report of one `synchronize()` run, returned to the caller for
/// observability.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub total_remote: usize,
    pub inserted: usize,
    pub deleted: usize,
    pub updated: usize,
    pub failed: usize,
    pub results: Vec<SyncItem>,
}

impl SyncReport {
    fn push(&mut self, item: SyncItem) {
        match item.status {
            SyncOutcome::Inserted => self.inserted += 1,
            SyncOutcome::Deleted => self.deleted += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::InsertError | SyncOutcome::DeleteError | SyncOutcome::UpdateError => {
                self.failed += 1
            }
        }
        self.results.push(item);
    }
}

/// Diffs remote assets against the local mirror and applies the changes.
#[derive(Clone)]
pub struct ReconciliationEngine {
    vod: Arc<dyn VodClient>,
    store: CatalogStore,
}

impl ReconciliationEngine {
    pub fn new(vod: Arc<dyn VodClient>, store: CatalogStore) -> Self {
        Self { vod, store }
    }

    /// Run one reconciliation pass.
    ///
    /// Fetching the remote list or the local mirror is fatal; everything
    /// after that is per-item — a failed insert, update, or delete is
    /// recorded in the report and never aborts the batch.
    pub async fn synchronize(&self) -> Result<SyncReport> {
        let remote_assets = self.vod.list_all_assets().await.map_err(ServiceError::from)?;
        let local_entries = self.store.list_remote_entries().await?;

        let remote_ids: HashSet<&str> = remote_assets
            .iter()
            .map(|a| a.remote_asset_id.as_str())
            .collect();
        let local_by_remote_id: HashMap<&str, _> = local_entries
            .iter()
            .filter_map(|e| e.remote_asset_id.as_deref().map(|id| (id, e)))
            .collect();

        info!(
            "Reconciling catalog: {} remote assets, {} local mirror rows",
            remote_assets.len(),
            local_entries.len()
        );

        let mut report = SyncReport {
            total_remote: remote_assets.len(),
            ..Default::default()
        };

        // Phase 1: insert assets we have never seen
        for asset in remote_assets
            .iter()
            .filter(|a| !local_by_remote_id.contains_key(a.remote_asset_id.as_str()))
        {
            report.push(self.insert_one(asset).await);
        }

        // Phase 2: hard-delete mirror rows whose asset disappeared at the
        // source (view logs cascade)
        for entry in local_entries
            .iter()
            .filter(|e| {
                e.remote_asset_id
                    .as_deref()
                    .is_some_and(|id| !remote_ids.contains(id))
            })
        {
            let remote_id = entry.remote_asset_id.clone().unwrap_or_default();
            let item = match self.store.delete(entry.id).await {
                Ok(()) => SyncItem {
                    database_id: Some(entry.id),
                    remote_asset_id: remote_id,
                    title: None,
                    status: SyncOutcome::Deleted,
                    error: None,
                },
                Err(e) => SyncItem {
                    database_id: Some(entry.id),
                    remote_asset_id: remote_id,
                    title: None,
                    status: SyncOutcome::DeleteError,
                    error: Some(e.to_string()),
                },
            };
            report.push(item);
        }

        // Phase 3: refresh metadata on the surviving intersection.
        // Soft-deleted rows are left alone: not refreshed, not re-created.
        for asset in &remote_assets {
            let Some(entry) = local_by_remote_id.get(asset.remote_asset_id.as_str()) else {
                continue;
            };
            if entry.status == VideoStatus::Deleted {
                continue;
            }
            report.push(self.update_one(entry.id, asset).await);
        }

        info!(
            "Reconciliation done: {} inserted, {} deleted, {} updated, {} failed",
            report.inserted, report.deleted, report.updated, report.failed
        );
        Ok(report)
    }

    /// Insert one newly sighted asset, enriched through `get_asset_info`
    /// because the listing may carry incomplete fields. When enrichment
    /// fails the listing's own fields are kept, with defaults for whatever
    /// is missing.
    async fn insert_one(&self, listed: &RemoteAsset) -> SyncItem {
        let asset = match self.vod.get_asset_info(&listed.remote_asset_id).await {
            Ok(info) => info,
            Err(e) => {
                warn!(
                    "Metadata fetch failed for new asset {}; inserting from listing: {}",
                    listed.remote_asset_id, e
                );
                listed.clone()
            }
        };

        match self.store.insert_remote(&asset).await {
            Ok(id) => SyncItem {
                database_id: Some(id),
                remote_asset_id: asset.remote_asset_id.clone(),
                title: Some(asset.title.clone()),
                status: SyncOutcome::Inserted,
                error: None,
            },
            Err(e) => SyncItem {
                database_id: None,
                remote_asset_id: asset.remote_asset_id.clone(),
                title: Some(asset.title.clone()),
                status: SyncOutcome::InsertError,
                error: Some(e.to_string()),
            },
        }
    }

    /// Refresh one surviving entry. A failed metadata fetch records an
    /// error instead of overwriting good fields with defaults.
    async fn update_one(&self, id: i64, listed: &RemoteAsset) -> SyncItem {
        let asset = match self.vod.get_asset_info(&listed.remote_asset_id).await {
            Ok(info) => info,
            Err(e) => {
                return SyncItem {
                    database_id: Some(id),
                    remote_asset_id: listed.remote_asset_id.clone(),
                    title: Some(listed.title.clone()),
                    status: SyncOutcome::UpdateError,
                    error: Some(e.to_string()),
                };
            }
        };

        match self.store.update_remote_metadata(id, &asset).await {
            Ok(()) => SyncItem {
                database_id: Some(id),
                remote_asset_id: asset.remote_asset_id.clone(),
                title: Some(asset.title.clone()),
                status: SyncOutcome::Updated,
                error: None,
            },
            Err(e) => SyncItem {
                database_id: Some(id),
                remote_asset_id: asset.remote_asset_id.clone(),
                title: Some(asset.title.clone()),
                status: SyncOutcome::UpdateError,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vod::{AssetPage, PlayInfo, VodError, VodResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn asset(id: &str, title: &str) -> RemoteAsset {
        RemoteAsset {
            remote_asset_id: id.to_string(),
            title: title.to_string(),
            description: format!("about {id}"),
            duration_seconds: 90,
            cover_url: format!("https://cdn.example.com/{id}.jpg"),
            status: "Normal".to_string(),
            creation_time: "2024-01-01T00:00:00Z".to_string(),
            size: 1024,
        }
    }

    /// Provider stub serving a mutable asset list from memory.
    struct FakeVod {
        assets: Mutex<Vec<RemoteAsset>>,
        fail_info_for: Option<String>,
    }

    impl FakeVod {
        fn with(assets: Vec<RemoteAsset>) -> Arc<Self> {
            Arc::new(Self {
                assets: Mutex::new(assets),
                fail_info_for: None,
            })
        }

        fn set_assets(&self, assets: Vec<RemoteAsset>) {
            *self.assets.lock().unwrap() = assets;
        }
    }

    #[async_trait]
    impl VodClient for FakeVod {
        async fn list_assets(&self, page_no: u32, page_size: u32) -> VodResult<AssetPage> {
            let assets = self.assets.lock().unwrap().clone();
            let start = ((page_no - 1) * page_size) as usize;
            let end = (start + page_size as usize).min(assets.len());
            let items = if start >= assets.len() {
                Vec::new()
            } else {
                assets[start..end].to_vec()
            };
            Ok(AssetPage {
                items,
                total: assets.len() as u64,
            })
        }

        async fn get_asset_info(&self, remote_asset_id: &str) -> VodResult<RemoteAsset> {
            if self.fail_info_for.as_deref() == Some(remote_asset_id) {
                return Err(VodError::Network("simulated outage".into()));
            }
            self.assets
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.remote_asset_id == remote_asset_id)
                .cloned()
                .ok_or_else(|| VodError::NotFound {
                    code: "InvalidVideo.NotFound".into(),
                    message: format!("{remote_asset_id} gone"),
                })
        }

        async fn get_play_url(&self, _remote_asset_id: &str) -> VodResult<PlayInfo> {
            unimplemented!("not exercised by sync tests")
        }
    }

    async fn engine_with(
        assets: Vec<RemoteAsset>,
    ) -> (ReconciliationEngine, CatalogStore, Arc<FakeVod>) {
        let store = CatalogStore::in_memory().await.unwrap();
        let vod = FakeVod::with(assets);
        let engine = ReconciliationEngine::new(vod.clone(), store.clone());
        (engine, store, vod)
    }

    #[tokio::test]
    async fn first_sighting_inserts_active_entry() {
        let (engine, store, _) = engine_with(vec![asset("v1", "Show A")]).await;

        let report = engine.synchronize().await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.updated, 0);

        let rows = store.list_remote_entries().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].remote_asset_id.as_deref(), Some("v1"));
        assert_eq!(rows[0].status, VideoStatus::Active);
        assert_eq!(rows[0].view_count, 0);
    }

    #[tokio::test]
    async fn synchronize_is_idempotent() {
        let (engine, _, _) = engine_with(vec![asset("v1", "A"), asset("v2", "B")]).await;

        let first = engine.synchronize().await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = engine.synchronize().await.unwrap();
        assert_eq!(second.inserted, 0, "second run inserts nothing");
        assert_eq!(second.deleted, 0, "second run deletes nothing");
        assert_eq!(second.updated, 2);
        assert_eq!(second.failed, 0);
    }

    #[tokio::test]
    async fn set_difference_drives_all_three_phases() {
        // Local {A,B,C}, remote {B,C,D} → insert D, delete A, update B and C
        let (engine, store, vod) =
            engine_with(vec![asset("A", "a"), asset("B", "b"), asset("C", "c")]).await;
        engine.synchronize().await.unwrap();

        vod.set_assets(vec![asset("B", "b2"), asset("C", "c2"), asset("D", "d")]);
        let report = engine.synchronize().await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.updated, 2);

        let ids: Vec<String> = store
            .list_remote_entries()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|e| e.remote_asset_id)
            .collect();
        assert!(ids.contains(&"B".to_string()));
        assert!(ids.contains(&"C".to_string()));
        assert!(ids.contains(&"D".to_string()));
        assert!(!ids.contains(&"A".to_string()));
    }

    #[tokio::test]
    async fn vanished_asset_hard_deletes_entry_and_logs() {
        let (engine, store, vod) = engine_with(vec![asset("v1", "A"), asset("v2", "B")]).await;
        engine.synchronize().await.unwrap();

        let v1 = store
            .list_remote_entries()
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.remote_asset_id.as_deref() == Some("v1"))
            .unwrap();
        store
            .record_view(v1.id, &crate::store::ViewEvent::default())
            .await
            .unwrap();

        vod.set_assets(vec![asset("v2", "B")]);
        let report = engine.synchronize().await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.updated, 1);
        assert!(store.get(v1.id).await.unwrap().is_none());
        assert_eq!(
            store.count_view_logs(v1.id).await.unwrap(),
            0,
            "view logs go with the entry"
        );
    }

    #[tokio::test]
    async fn update_refreshes_metadata_but_not_views() {
        let (engine, store, vod) = engine_with(vec![asset("v1", "Old title")]).await;
        engine.synchronize().await.unwrap();

        let entry = store.list_remote_entries().await.unwrap().remove(0);
        store
            .record_view(entry.id, &crate::store::ViewEvent::default())
            .await
            .unwrap();

        vod.set_assets(vec![asset("v1", "New title")]);
        engine.synchronize().await.unwrap();

        let refreshed = store.get(entry.id).await.unwrap().unwrap();
        assert_eq!(refreshed.title, "New title");
        assert_eq!(refreshed.view_count, 1, "reconciliation never touches views");
        assert_eq!(refreshed.created_at, entry.created_at);
    }

    #[tokio::test]
    async fn soft_deleted_entry_is_skipped_not_recreated() {
        let (engine, store, _) = engine_with(vec![asset("v1", "A")]).await;
        engine.synchronize().await.unwrap();

        let entry = store.list_remote_entries().await.unwrap().remove(0);
        store.soft_delete(entry.id).await.unwrap();

        let report = engine.synchronize().await.unwrap();
        assert_eq!(report.inserted, 0, "soft-deleted entry not re-created");
        assert_eq!(report.updated, 0, "soft-deleted entry excluded from update phase");
        assert_eq!(report.deleted, 0);

        let row = store.get(entry.id).await.unwrap().unwrap();
        assert_eq!(row.status, VideoStatus::Deleted);
        assert_eq!(row.title, "A", "metadata left untouched");
    }

    #[tokio::test]
    async fn metadata_fetch_failure_during_update_is_recorded_not_fatal() {
        let (engine, store, _) = engine_with(vec![asset("v1", "A"), asset("v2", "B")]).await;
        engine.synchronize().await.unwrap();

        let store2 = store.clone();
        let vod = Arc::new(FakeVod {
            assets: Mutex::new(vec![asset("v1", "A"), asset("v2", "B")]),
            fail_info_for: Some("v1".to_string()),
        });
        let engine = ReconciliationEngine::new(vod, store2);

        let report = engine.synchronize().await.unwrap();
        assert_eq!(report.updated, 1, "v2 still updates");
        assert_eq!(report.failed, 1, "v1 failure is captured per-item");
        let failed = report
            .results
            .iter()
            .find(|r| r.status == SyncOutcome::UpdateError)
            .unwrap();
        assert_eq!(failed.remote_asset_id, "v1");
        assert!(failed.error.is_some());

        let v1 = store
            .list_remote_entries()
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.remote_asset_id.as_deref() == Some("v1"))
            .unwrap();
        assert_eq!(v1.title, "A", "stale metadata kept, not wiped");
    }

    #[tokio::test]
    async fn insert_falls_back_to_listing_fields_when_info_fails() {
        let store = CatalogStore::in_memory().await.unwrap();
        let vod = Arc::new(FakeVod {
            assets: Mutex::new(vec![asset("v1", "From listing")]),
            fail_info_for: Some("v1".to_string()),
        });
        let engine = ReconciliationEngine::new(vod, store.clone());

        let report = engine.synchronize().await.unwrap();
        assert_eq!(report.inserted, 1);

        let entry = store.list_remote_entries().await.unwrap().remove(0);
        assert_eq!(entry.title, "From listing");
    }

    #[tokio::test]
    async fn listing_failure_is_fatal() {
        struct BrokenVod;

        #[async_trait]
        impl VodClient for BrokenVod {
            async fn list_assets(&self, _: u32, _: u32) -> VodResult<AssetPage> {
                Err(VodError::Auth {
                    code: "SignatureDoesNotMatch".into(),
                    message: "bad secret".into(),
                })
            }
            async fn get_asset_info(&self, _: &str) -> VodResult<RemoteAsset> {
                unreachable!()
            }
            async fn get_play_url(&self, _: &str) -> VodResult<PlayInfo> {
                unreachable!()
            }
        }

        let store = CatalogStore::in_memory().await.unwrap();
        let engine = ReconciliationEngine::new(Arc::new(BrokenVod), store);
        let err = engine.synchronize().await.unwrap_err();
        assert!(matches!(err, ServiceError::RemoteAuthFailure(_)));
    }
}
