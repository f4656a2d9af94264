//! In-process [`CloudStore`] with the same merge semantics as the real
//! service. Backs the sync-engine test suites: it counts writes (to assert
//! idempotence) and can be told to fail individual collections (to assert
//! per-collection error isolation).

use super::{CloudError, CloudQuery, CloudResult, CloudStore, QueryOp, SortOrder};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

#[derive(Default)]
pub struct MemoryCloudStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    failing: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl MemoryCloudStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total documents written so far (batch writes count per document).
    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    /// Make every operation on `collection` fail until healed.
    pub fn fail_collection(&self, collection: &str) {
        self.locked(&self.failing).insert(collection.to_string());
    }

    pub fn heal_collection(&self, collection: &str) {
        self.locked(&self.failing).remove(collection);
    }

    /// Number of documents currently held for `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.locked(&self.collections)
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.locked(&self.collections)
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
    }

    /// Seed a document directly, bypassing the write counter. Tests use
    /// this to stage "another device already uploaded" scenarios.
    pub fn seed(&self, collection: &str, id: &str, data: Value) {
        self.locked(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    fn locked<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, collection: &str) -> CloudResult<()> {
        if self.locked(&self.failing).contains(collection) {
            return Err(CloudError::Unavailable(collection.to_string()));
        }
        Ok(())
    }

    fn merge_into(target: &mut Value, incoming: &Value) {
        match (target, incoming) {
            (Value::Object(existing), Value::Object(fields)) => {
                for (key, value) in fields {
                    existing.insert(key.clone(), value.clone());
                }
            }
            (target, incoming) => *target = incoming.clone(),
        }
    }
}

#[async_trait]
impl CloudStore for MemoryCloudStore {
    async fn set_merge(&self, collection: &str, id: &str, data: Value) -> CloudResult<()> {
        self.check(collection)?;
        let mut collections = self.locked(&self.collections);
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) => Self::merge_into(existing, &data),
            None => {
                docs.insert(id.to_string(), data);
            }
        }
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn set_merge_batch(
        &self,
        collection: &str,
        batch: &[(String, Value)],
    ) -> CloudResult<()> {
        // All-or-nothing: the availability check precedes any mutation.
        self.check(collection)?;
        let mut collections = self.locked(&self.collections);
        let docs = collections.entry(collection.to_string()).or_default();
        for (id, data) in batch {
            match docs.get_mut(id) {
                Some(existing) => Self::merge_into(existing, data),
                None => {
                    docs.insert(id.clone(), data.clone());
                }
            }
        }
        self.writes.fetch_add(batch.len(), AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn get_all(&self, collection: &str) -> CloudResult<Vec<Value>> {
        self.check(collection)?;
        Ok(self
            .locked(&self.collections)
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query(&self, collection: &str, query: CloudQuery) -> CloudResult<Vec<Value>> {
        self.check(collection)?;
        let mut hits: Vec<Value> = self
            .locked(&self.collections)
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| {
                        doc.get(&query.field)
                            .and_then(|v| compare(v, &query.value))
                            .is_some_and(|ord| matches_op(ord, query.op))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        hits.sort_by(|a, b| {
            let ord = match (a.get(&query.field), b.get(&query.field)) {
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        hits.truncate(query.limit);
        Ok(hits)
    }
}

fn matches_op(ord: Ordering, op: QueryOp) -> bool {
    match op {
        QueryOp::Gt => ord == Ordering::Greater,
        QueryOp::Lt => ord == Ordering::Less,
        QueryOp::Ge => ord != Ordering::Less,
        QueryOp::Le => ord != Ordering::Greater,
        QueryOp::Eq => ord == Ordering::Equal,
    }
}

/// Compare two JSON scalars of the same kind; mixed kinds don't match.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_merge_preserves_cloud_only_fields() {
        let cloud = MemoryCloudStore::new();
        cloud.seed("products", "p1", json!({"id": "p1", "name": "Vino", "cloudOnly": 1}));

        cloud
            .set_merge("products", "p1", json!({"id": "p1", "price": 900.0}))
            .await
            .unwrap();

        let doc = cloud.document("products", "p1").unwrap();
        assert_eq!(doc["cloudOnly"], 1);
        assert_eq!(doc["price"], 900.0);
    }

    #[tokio::test]
    async fn failing_collection_rejects_without_writing() {
        let cloud = MemoryCloudStore::new();
        cloud.fail_collection("sales");

        let err = cloud
            .set_merge_batch("sales", &[("v1".into(), json!({"id": "v1"}))])
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Unavailable(_)));
        assert_eq!(cloud.write_count(), 0);
        assert_eq!(cloud.len("sales"), 0);
    }

    #[tokio::test]
    async fn query_orders_and_limits() {
        let cloud = MemoryCloudStore::new();
        for (id, date) in [
            ("a", "2025-01-01T00:00:00.000Z"),
            ("b", "2025-01-02T00:00:00.000Z"),
            ("c", "2025-01-03T00:00:00.000Z"),
        ] {
            cloud.seed("sales", id, json!({"id": id, "date": date}));
        }

        let hits = cloud
            .query(
                "sales",
                CloudQuery::range(
                    "date",
                    QueryOp::Gt,
                    "2025-01-01T00:00:00.000Z",
                    SortOrder::Asc,
                    1,
                ),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], "b");
    }
}
