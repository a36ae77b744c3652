//! # Manifest Store
//!
//! Read access to the durable store that holds one manifest record per
//! bundle id. The store is populated by an external writer; nothing in this
//! crate writes bundle records.

mod memory;
mod provider;
mod sqlite;

pub use memory::MemoryManifestStore;
pub use provider::ManifestStore;
pub use sqlite::SqliteManifestStore;
