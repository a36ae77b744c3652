use async_trait::async_trait;

use crate::error::Result;
use crate::manifest::BundleManifest;

/// A source of bundle manifests keyed by bundle id
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Read the manifest stored for `bundle_id`.
    ///
    /// `Ok(None)` means no record exists. Failures of the underlying store
    /// are returned as-is and never retried.
    async fn get(&self, bundle_id: &str) -> Result<Option<BundleManifest>>;
}
