use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::manifest::BundleManifest;

use super::ManifestStore;

/// In-process manifest store.
///
/// Counts every query it answers, which makes cache behaviour observable.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    records: RwLock<HashMap<String, BundleManifest>>,
    queries: AtomicUsize,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bundle_id: impl Into<String>, manifest: BundleManifest) {
        self.records.write().insert(bundle_id.into(), manifest);
    }

    pub fn remove(&self, bundle_id: &str) -> Option<BundleManifest> {
        self.records.write().remove(bundle_id)
    }

    /// Number of `get` calls answered so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManifestStore for MemoryManifestStore {
    async fn get(&self, bundle_id: &str) -> Result<Option<BundleManifest>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.read().get(bundle_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_counts_hits_and_misses() {
        let store = MemoryManifestStore::new();
        store.insert("demo", BundleManifest::default());

        assert!(store.get("demo").await.unwrap().is_some());
        assert!(store.get("missing").await.unwrap().is_none());
        assert_eq!(store.query_count(), 2);

        store.remove("demo");
        assert!(store.get("demo").await.unwrap().is_none());
        assert_eq!(store.query_count(), 3);
    }
}
