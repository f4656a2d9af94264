//! One reconciliation cycle between the local store and the cloud.
//!
//! Collections sync independently: an exception in one is caught, logged
//! and reported without aborting the others. Re-running a cycle with no
//! intervening writes is a no-op — uploads are keyed by the record's own
//! id and downloads never insert over an existing local record.

use redb::WriteTransaction;
use serde::Serialize;
use serde_json::Value;
use shared::models::record::{
    DATE_FIELD, ID_FIELD, NAME_FIELD, PENDING, SYNC_STATUS_FIELD, SYNCED, SYNCED_AT_FIELD,
};
use shared::models::serde_helpers;
use shared::util;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;

use crate::cloud::{CloudError, CloudQuery, CloudStore, QueryOp, SortOrder};
use crate::store::{Collection, LocalStore, StoreError};

/// Upload batch size, under the cloud's 500-document batch limit.
const MAX_BATCH: usize = 450;

/// Bound on each side of the sandwich download.
const WINDOW_LIMIT: usize = 200;

/// Forward watermark for a device that has no local history yet.
const EPOCH_ISO: &str = "1970-01-01T00:00:00.000Z";

/// Collections uploaded by the generic pass. Sales and products have
/// dedicated passes.
const UPLOAD_GENERIC: &[Collection] = &[
    Collection::Categories,
    Collection::Brands,
    Collection::Suppliers,
    Collection::Clients,
    Collection::Shifts,
    Collection::CashMovements,
    Collection::Movements,
    Collection::Users,
    Collection::Config,
];

/// Reference collections small enough to mirror whole.
const FULL_MIRROR: &[Collection] = &[
    Collection::Categories,
    Collection::Brands,
    Collection::Suppliers,
    Collection::Products,
    Collection::Clients,
    Collection::Users,
    Collection::Config,
];

/// High-volume time series, downloaded through date windows only.
const WINDOWED: &[Collection] = &[Collection::Sales, Collection::Movements];

/// Foreign keys rewritten when duplicate fusion supersedes an identifier:
/// (fused collection, referencing collection, referencing field).
const FUSION_REWRITES: &[(Collection, Collection, &str)] = &[
    (Collection::Categories, Collection::Products, "categoryId"),
    (Collection::Brands, Collection::Products, "brandId"),
    (Collection::Suppliers, Collection::Products, "supplierId"),
    (Collection::Products, Collection::Movements, "productId"),
    (Collection::Clients, Collection::Sales, "clientId"),
];

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("cloud: {0}")]
    Cloud(#[from] CloudError),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record in '{0}' has no string 'id' field")]
    MalformedRecord(Collection),
}

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    Offline,
    CycleInProgress,
}

/// Outcome of one [`SyncEngine::sync_cycle`] call.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub uploaded: usize,
    pub downloaded: usize,
    pub fused: usize,
    /// One entry per collection pass that failed, as "collection: error"
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl SyncReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    /// Whether the cycle actually ran (was not suppressed).
    pub fn ran(&self) -> bool {
        self.skipped.is_none()
    }
}

#[derive(Debug, Default)]
struct PassStats {
    uploaded: usize,
    downloaded: usize,
    fused: usize,
}

pub struct SyncEngine {
    store: LocalStore,
    cloud: Arc<dyn CloudStore>,
    online: watch::Receiver<bool>,
    /// At-most-one cycle in flight; overlapping triggers become no-ops.
    syncing: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        store: LocalStore,
        cloud: Arc<dyn CloudStore>,
        online: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            cloud,
            online,
            syncing: AtomicBool::new(false),
        }
    }

    /// Run one full upload+download cycle. Offline or already-running
    /// cycles are suppressed silently — reconciliation resumes on the next
    /// trigger.
    pub async fn sync_cycle(&self) -> SyncReport {
        if !*self.online.borrow() {
            tracing::debug!("sync skipped: offline");
            return SyncReport::skipped(SkipReason::Offline);
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("sync skipped: cycle already in progress");
            return SyncReport::skipped(SkipReason::CycleInProgress);
        }

        let report = self.run_passes().await;
        self.syncing.store(false, Ordering::SeqCst);

        if !report.errors.is_empty() {
            tracing::warn!(
                uploaded = report.uploaded,
                downloaded = report.downloaded,
                fused = report.fused,
                failed_passes = report.errors.len(),
                "sync cycle finished with errors"
            );
        } else if report.uploaded + report.downloaded + report.fused > 0 {
            tracing::info!(
                uploaded = report.uploaded,
                downloaded = report.downloaded,
                fused = report.fused,
                "sync cycle complete"
            );
        } else {
            tracing::debug!("sync cycle complete: nothing to reconcile");
        }
        report
    }

    async fn run_passes(&self) -> SyncReport {
        let mut report = SyncReport::default();

        // Upload before download, so fresh local work is in the cloud
        // before the mirror reads it back.
        for &collection in UPLOAD_GENERIC {
            let result = self.upload_collection(collection).await;
            absorb(&mut report, collection, result);
        }
        let sales = self.upload_sales().await;
        absorb(&mut report, Collection::Sales, sales);
        let products = self.upload_products().await;
        absorb(&mut report, Collection::Products, products);

        for &collection in FULL_MIRROR {
            let result = self.download_full_mirror(collection).await;
            absorb(&mut report, collection, result);
        }
        for &collection in WINDOWED {
            let result = self.download_windowed(collection).await;
            absorb(&mut report, collection, result);
        }

        report
    }

    // ========== Upload ==========

    async fn upload_with(
        &self,
        collection: Collection,
        transform: fn(&mut Value),
    ) -> SyncResult<PassStats> {
        let pending: Vec<Value> = self
            .store
            .get_all_raw(collection)?
            .into_iter()
            .filter(|record| !is_synced(record))
            .collect();

        let mut stats = PassStats::default();
        for chunk in pending.chunks(MAX_BATCH) {
            let mut docs = Vec::with_capacity(chunk.len());
            for record in chunk {
                let id = record_key(collection, record)?;
                let mut doc = record.clone();
                strip_sync_meta(&mut doc);
                transform(&mut doc);
                docs.push((id, doc));
            }

            self.cloud.set_merge_batch(collection.name(), &docs).await?;

            // The cloud batch is committed; stamp the whole chunk SYNCED
            // in one local transaction so a crash can't leave it
            // half-marked.
            let txn = self.store.begin_write()?;
            let stamp = serde_helpers::to_wire(&util::now());
            for record in chunk {
                let mut updated = record.clone();
                updated[SYNC_STATUS_FIELD] = Value::String(SYNCED.to_string());
                updated[SYNCED_AT_FIELD] = Value::String(stamp.clone());
                self.store.put_raw_in(&txn, collection, &updated)?;
            }
            txn.commit().map_err(StoreError::from)?;
            stats.uploaded += chunk.len();
        }

        if stats.uploaded > 0 {
            tracing::debug!(collection = %collection, uploaded = stats.uploaded, "uploaded pending records");
        }
        Ok(stats)
    }

    async fn upload_collection(&self, collection: Collection) -> SyncResult<PassStats> {
        self.upload_with(collection, |_| {}).await
    }

    /// Dedicated sale pass. The payment breakdown and the fiscal
    /// sub-object are single fields of the document, so the field-level
    /// merge upsert carries them to the cloud verbatim.
    async fn upload_sales(&self) -> SyncResult<PassStats> {
        self.upload_with(Collection::Sales, |_| {}).await
    }

    /// Dedicated product pass: soft-deleted products go up as
    /// `active=false`; nothing is ever removed from the cloud catalog.
    async fn upload_products(&self) -> SyncResult<PassStats> {
        self.upload_with(Collection::Products, |doc| {
            if doc.get("deleted").and_then(Value::as_bool).unwrap_or(false) {
                doc["active"] = Value::Bool(false);
            }
        })
        .await
    }

    // ========== Download ==========

    /// Mirror a reference collection. Cloud wins on shared fields; a local
    /// record whose trimmed, case-folded name matches a cloud record under
    /// a different id is fused onto the cloud identifier.
    async fn download_full_mirror(&self, collection: Collection) -> SyncResult<PassStats> {
        let cloud_docs = self.cloud.get_all(collection.name()).await?;
        let mut stats = PassStats::default();
        if cloud_docs.is_empty() {
            return Ok(stats);
        }

        let mut by_id: HashMap<String, Value> = HashMap::new();
        let mut by_name: HashMap<String, String> = HashMap::new();
        for record in self.store.get_all_raw(collection)? {
            let Ok(id) = record_key(collection, &record) else {
                continue;
            };
            if let Some(name) = normalized_name(&record) {
                by_name.insert(name, id.clone());
            }
            by_id.insert(id, record);
        }

        let txn = self.store.begin_write()?;
        let stamp = serde_helpers::to_wire(&util::now());
        for doc in cloud_docs {
            let Ok(cloud_id) = record_key(collection, &doc) else {
                tracing::warn!(collection = %collection, "skipping cloud document without id");
                continue;
            };
            let name = normalized_name(&doc);

            if let Some(local) = by_id.get(&cloud_id) {
                let mut merged = overlay_fields(local, &doc);
                merged[SYNC_STATUS_FIELD] = Value::String(SYNCED.to_string());
                // Re-stamp only on an actual change, so an unchanged
                // mirror pass performs zero writes.
                if &merged != local {
                    merged[SYNCED_AT_FIELD] = Value::String(stamp.clone());
                    self.store.put_raw_in(&txn, collection, &merged)?;
                    stats.downloaded += 1;
                }
                by_id.insert(cloud_id, merged);
            } else if let Some(old_id) = name.as_ref().and_then(|n| by_name.get(n)).cloned()
                && let Some(old) = by_id.remove(&old_id)
            {
                // Duplicate fusion: two devices created the same entity
                // under different generated ids. Canonicalize on the cloud
                // identifier without losing local-only fields.
                self.store.delete_in(&txn, collection, &old_id)?;
                let mut merged = overlay_fields(&old, &doc);
                merged[SYNC_STATUS_FIELD] = Value::String(SYNCED.to_string());
                merged[SYNCED_AT_FIELD] = Value::String(stamp.clone());
                self.store.put_raw_in(&txn, collection, &merged)?;
                let rewritten = self.rewrite_foreign_keys(&txn, collection, &old_id, &cloud_id)?;
                tracing::warn!(
                    collection = %collection,
                    old_id = %old_id,
                    canonical_id = %cloud_id,
                    rewritten,
                    "fused duplicate record by name"
                );
                if let Some(n) = name {
                    by_name.insert(n, cloud_id.clone());
                }
                by_id.insert(cloud_id, merged);
                stats.fused += 1;
            } else {
                let mut incoming = doc;
                stamp_synced(&mut incoming);
                self.store.put_raw_in(&txn, collection, &incoming)?;
                if let Some(n) = name {
                    by_name.insert(n, cloud_id.clone());
                }
                by_id.insert(cloud_id, incoming);
                stats.downloaded += 1;
            }
        }
        txn.commit().map_err(StoreError::from)?;
        Ok(stats)
    }

    /// Repoint references at the canonical id so fusion doesn't strand
    /// foreign keys. Rewritten records go back to PENDING so the repair
    /// reaches the cloud on the next upload.
    fn rewrite_foreign_keys(
        &self,
        txn: &WriteTransaction,
        fused_in: Collection,
        old_id: &str,
        canonical_id: &str,
    ) -> SyncResult<usize> {
        let mut rewritten = 0;
        for (_, target, field) in FUSION_REWRITES.iter().filter(|(s, _, _)| *s == fused_in) {
            for mut record in self.store.get_all_raw_in(txn, *target)? {
                if record.get(*field).and_then(Value::as_str) != Some(old_id) {
                    continue;
                }
                record[*field] = Value::String(canonical_id.to_string());
                record[SYNC_STATUS_FIELD] = Value::String(PENDING.to_string());
                self.store.put_raw_in(txn, *target, &record)?;
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    /// Sandwich download for a time-series collection: fetch forward of
    /// the newest local date to catch up, and backward of the oldest to
    /// backfill. Never the whole collection, and never over an existing
    /// local record — a pending local edit must not be clobbered by a
    /// stale cloud read.
    async fn download_windowed(&self, collection: Collection) -> SyncResult<PassStats> {
        let newest = self.store.index_max(collection, DATE_FIELD)?;
        let oldest = self.store.index_min(collection, DATE_FIELD)?;

        let mut incoming = Vec::new();
        let forward_after = newest.unwrap_or_else(|| EPOCH_ISO.to_string());
        incoming.extend(
            self.cloud
                .query(
                    collection.name(),
                    CloudQuery::range(
                        DATE_FIELD,
                        QueryOp::Gt,
                        forward_after,
                        SortOrder::Asc,
                        WINDOW_LIMIT,
                    ),
                )
                .await?,
        );
        if let Some(oldest) = oldest {
            incoming.extend(
                self.cloud
                    .query(
                        collection.name(),
                        CloudQuery::range(
                            DATE_FIELD,
                            QueryOp::Lt,
                            oldest,
                            SortOrder::Desc,
                            WINDOW_LIMIT,
                        ),
                    )
                    .await?,
            );
        }
        if incoming.is_empty() {
            return Ok(PassStats::default());
        }

        let mut stats = PassStats::default();
        let txn = self.store.begin_write()?;
        for doc in incoming {
            let Ok(id) = record_key(collection, &doc) else {
                tracing::warn!(collection = %collection, "skipping cloud document without id");
                continue;
            };
            if self.store.get_raw_in(&txn, collection, &id)?.is_some() {
                continue;
            }
            let mut incoming_doc = doc;
            stamp_synced(&mut incoming_doc);
            self.store.put_raw_in(&txn, collection, &incoming_doc)?;
            stats.downloaded += 1;
        }
        txn.commit().map_err(StoreError::from)?;
        Ok(stats)
    }
}

fn absorb(report: &mut SyncReport, collection: Collection, result: SyncResult<PassStats>) {
    match result {
        Ok(stats) => {
            report.uploaded += stats.uploaded;
            report.downloaded += stats.downloaded;
            report.fused += stats.fused;
        }
        Err(e) => {
            tracing::error!(collection = %collection, error = %e, "collection sync failed");
            report.errors.push(format!("{collection}: {e}"));
        }
    }
}

fn is_synced(record: &Value) -> bool {
    record.get(SYNC_STATUS_FIELD).and_then(Value::as_str) == Some(SYNCED)
}

fn record_key(collection: Collection, record: &Value) -> SyncResult<String> {
    record
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(SyncError::MalformedRecord(collection))
}

/// Sync metadata is local bookkeeping; the cloud never holds PENDING.
fn strip_sync_meta(doc: &mut Value) {
    if let Some(fields) = doc.as_object_mut() {
        fields.remove(SYNC_STATUS_FIELD);
        fields.remove(SYNCED_AT_FIELD);
    }
}

fn stamp_synced(doc: &mut Value) {
    doc[SYNC_STATUS_FIELD] = Value::String(SYNCED.to_string());
    doc[SYNCED_AT_FIELD] = Value::String(serde_helpers::to_wire(&util::now()));
}

/// Local record with every cloud field overlaid (cloud wins on conflict;
/// local-only fields survive). Sync metadata is the caller's business.
fn overlay_fields(local: &Value, cloud: &Value) -> Value {
    let mut merged = local.clone();
    if let (Some(target), Some(fields)) = (merged.as_object_mut(), cloud.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Fusion key: trimmed, case-folded `name`.
fn normalized_name(record: &Value) -> Option<String> {
    record
        .get(NAME_FIELD)
        .and_then(Value::as_str)
        .map(|name| name.trim().to_lowercase())
}
