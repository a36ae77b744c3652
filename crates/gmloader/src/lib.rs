//! # gmloader engine
//!
//! A client-side virtual file server. Requests of the form
//! `/game/<bundle id>/<file path>` are resolved against a bundle manifest read
//! from a local store and answered with a synthesized HTTP response.
//!
//! ## Pipeline
//!
//! - [`router::RequestRouter`] parses the request path and answers preflights
//! - [`cache::ManifestCache`] keeps manifests in memory in front of a
//!   [`store::ManifestStore`]
//! - [`resolver`] finds the file, tolerating sloppy path conventions
//! - [`content`] picks MIME type and disposition and decodes the body
//!
//! The [`control`] module carries the host-facing signals: take over
//! immediately, and clear the cache.

pub mod cache;
pub mod config;
pub mod content;
pub mod control;
pub mod error;
pub mod manifest;
pub mod resolver;
pub mod router;
pub mod store;

pub use cache::ManifestCache;
pub use config::LoaderConfig;
pub use control::{
    ControlChannel, ControlHandle, ControlMessage, ControlReply, Lifecycle, LifecycleState,
};
pub use error::{LoaderError, Result};
pub use manifest::{BundleManifest, FileEntry, FileMap, StructuredEntry};
pub use resolver::{MatchTier, Resolved, resolve};
pub use router::{GameRequest, RequestRouter, parse_game_path};
pub use store::{ManifestStore, MemoryManifestStore, SqliteManifestStore};
