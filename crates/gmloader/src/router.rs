//! # Request Router
//!
//! Entry point for every intercepted request. Claims `/game/<bundle>/<path>`
//! requests and answers CORS preflights; everything else is left to the
//! host's normal network handling.

use std::time::Duration;

use bytes::Bytes;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue,
    X_CONTENT_TYPE_OPTIONS,
};
use http::{Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::cache::ManifestCache;
use crate::config::LoaderConfig;
use crate::content::type_of;
use crate::error::Result;
use crate::resolver::resolve;

const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// The bundle id and file path carried by a `/game/...` request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRequest<'a> {
    pub bundle_id: &'a str,
    /// Everything after the bundle id; may contain further `/`
    pub file_path: &'a str,
}

/// Split `/game/<bundle_id>/<file_path>`. Both parts must be non-empty.
pub fn parse_game_path(path: &str) -> Option<GameRequest<'_>> {
    let rest = path.strip_prefix("/game/")?;
    let (bundle_id, file_path) = rest.split_once('/')?;
    if bundle_id.is_empty() || file_path.is_empty() {
        return None;
    }
    Some(GameRequest {
        bundle_id,
        file_path,
    })
}

/// Turns intercepted requests into synthesized responses.
///
/// Holds no per-request state; the manifest cache handle is the only shared
/// state it touches.
#[derive(Clone)]
pub struct RequestRouter {
    cache: ManifestCache,
    preflight_max_age: Duration,
}

impl RequestRouter {
    pub fn new(cache: ManifestCache, config: &LoaderConfig) -> Self {
        Self {
            cache,
            preflight_max_age: config.preflight_max_age,
        }
    }

    pub fn cache(&self) -> &ManifestCache {
        &self.cache
    }

    /// Handle one intercepted request.
    ///
    /// Returns `None` when the request is not claimed. A claimed request
    /// always gets a response: failures become `404` or `500` here and never
    /// propagate to the caller.
    pub async fn handle<B>(&self, request: &Request<B>) -> Option<Response<Bytes>> {
        if request.method() == Method::OPTIONS {
            return Some(self.preflight());
        }

        let game = parse_game_path(request.uri().path())?;
        debug!(
            method = %request.method(),
            bundle_id = game.bundle_id,
            file_path = game.file_path,
            "Intercepted game request"
        );
        Some(self.serve(game).await)
    }

    /// `200` with permissive CORS headers and no body
    pub fn preflight(&self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::new());
        let headers = response.headers_mut();
        insert_cors(headers);
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from(self.preflight_max_age.as_secs()),
        );
        response
    }

    async fn serve(&self, game: GameRequest<'_>) -> Response<Bytes> {
        match self.try_serve(game).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    bundle_id = game.bundle_id,
                    file_path = game.file_path,
                    error = %e,
                    "Failed to serve game file"
                );
                text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("internal error: {e}"),
                )
            }
        }
    }

    async fn try_serve(&self, game: GameRequest<'_>) -> Result<Response<Bytes>> {
        let manifest = self.cache.lookup(game.bundle_id).await?;
        let Some(files) = manifest.as_ref().and_then(|m| m.files.as_ref()) else {
            debug!(bundle_id = game.bundle_id, "Game not found");
            return Ok(text_response(StatusCode::NOT_FOUND, "game not found"));
        };

        let Some(resolved) = resolve(files, game.file_path) else {
            debug!(
                bundle_id = game.bundle_id,
                file_path = game.file_path,
                "File not found in manifest"
            );
            return Ok(text_response(
                StatusCode::NOT_FOUND,
                format!("file not found: {}", game.file_path),
            ));
        };

        let typed = type_of(resolved.entry, resolved.matched_path);
        let body = typed.decode()?;

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, typed.content_type())
            .header(CACHE_CONTROL, NO_CACHE)
            .header(X_CONTENT_TYPE_OPTIONS, "nosniff")
            .body(body)?;
        insert_cors(response.headers_mut());

        Ok(response)
    }
}

fn insert_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT));
    response
}
