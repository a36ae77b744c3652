//! # Manifest Cache
//!
//! Process-wide memory of manifests already read from the store. Entries
//! never expire and are never evicted one by one; the only way out is
//! [`ManifestCache::clear`].

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::{debug, info};

use crate::error::Result;
use crate::manifest::BundleManifest;
use crate::store::ManifestStore;

/// Caches manifests in front of a [`ManifestStore`].
///
/// Misses are not remembered, so a bundle that shows up in the store later
/// is picked up on the next lookup. Concurrent misses for the same id each
/// query the store; the first insert wins.
#[derive(Clone)]
pub struct ManifestCache {
    store: Arc<dyn ManifestStore>,
    entries: MokaCache<String, Arc<BundleManifest>>,
}

impl ManifestCache {
    pub fn new(store: Arc<dyn ManifestStore>) -> Self {
        // Unbounded and without TTL: entries live until `clear`
        let entries = MokaCache::builder().build();
        Self { store, entries }
    }

    /// Return the manifest for `bundle_id`, reading the store on a miss.
    pub async fn lookup(&self, bundle_id: &str) -> Result<Option<Arc<BundleManifest>>> {
        if let Some(manifest) = self.entries.get(bundle_id).await {
            debug!(bundle_id, "Manifest cache hit");
            return Ok(Some(manifest));
        }

        debug!(bundle_id, "Manifest cache miss, querying store");
        let Some(manifest) = self.store.get(bundle_id).await? else {
            return Ok(None);
        };

        let manifest = self
            .entries
            .entry(bundle_id.to_owned())
            .or_insert(Arc::new(manifest))
            .await
            .into_value();

        Ok(Some(manifest))
    }

    /// Drop every cached manifest.
    ///
    /// A lookup that is already waiting on the store may still insert its
    /// result right after this returns.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        info!("Manifest cache cleared");
    }

    /// Whether `bundle_id` currently has a cached manifest
    pub async fn contains(&self, bundle_id: &str) -> bool {
        self.entries.get(bundle_id).await.is_some()
    }
}
