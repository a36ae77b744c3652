use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::manifest::BundleManifest;

use super::ManifestStore;

/// Manifest store backed by a versioned SQLite file.
///
/// No connection is held between calls: every `get` opens the file, brings
/// the schema up to the configured version if needed, reads one record and
/// closes the connection again.
#[derive(Debug, Clone)]
pub struct SqliteManifestStore {
    path: PathBuf,
    name: String,
    version: i64,
    table: String,
}

impl SqliteManifestStore {
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            path: config.store_path(),
            name: config.store_name.clone(),
            version: config.store_version,
            table: config.table_name.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection to the store, upgrading the schema when the file is
    /// older than the configured version.
    pub async fn open(&self) -> Result<SqliteConnection> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            // Concurrent first opens may race on the upgrade below
            .busy_timeout(Duration::from_secs(5));

        let mut conn = SqliteConnection::connect_with(&options).await?;
        self.upgrade(&mut conn).await?;
        Ok(conn)
    }

    async fn upgrade(&self, conn: &mut SqliteConnection) -> Result<()> {
        let found: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&mut *conn)
            .await?;

        if found > self.version {
            return Err(LoaderError::VersionMismatch {
                name: self.name.clone(),
                found,
                expected: self.version,
            });
        }

        if found < self.version {
            info!(
                store = %self.name,
                from = found,
                to = self.version,
                "Upgrading manifest store schema"
            );
            let create = format!(
                "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY NOT NULL, record TEXT NOT NULL)",
                quote_ident(&self.table)
            );
            sqlx::query(&create).execute(&mut *conn).await?;

            // PRAGMA does not accept bound parameters
            let stamp = format!("PRAGMA user_version = {}", self.version);
            sqlx::query(&stamp).execute(&mut *conn).await?;
        }

        Ok(())
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[async_trait]
impl ManifestStore for SqliteManifestStore {
    async fn get(&self, bundle_id: &str) -> Result<Option<BundleManifest>> {
        debug!(bundle_id, path = %self.path.display(), "Reading manifest from store");

        let mut conn = self.open().await.inspect_err(|e| {
            warn!(bundle_id, error = %e, "Failed to open manifest store");
        })?;

        let select = format!(
            "SELECT record FROM {} WHERE id = ?",
            quote_ident(&self.table)
        );
        let record: Option<String> = sqlx::query_scalar(&select)
            .bind(bundle_id)
            .fetch_optional(&mut conn)
            .await?;

        conn.close().await?;

        match record {
            Some(json) => BundleManifest::parse(&json),
            None => Ok(None),
        }
    }
}
