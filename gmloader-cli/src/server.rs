//! HTTP front of the intercepting host.
//!
//! Every request first goes through the engine's router. Claimed requests
//! get the synthesized response; the rest fall through to the upstream
//! origin, if one is configured.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use gmloader_engine::{
    ControlChannel, ControlHandle, ControlMessage, Lifecycle, ManifestCache, ManifestStore,
    RequestRouter, SqliteManifestStore,
};
use http::StatusCode;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::passthrough::Passthrough;

/// Path of the control endpoint
pub const CONTROL_PATH: &str = "/__gmloader/control";

#[derive(Clone)]
pub struct AppState {
    pub router: RequestRouter,
    pub lifecycle: Lifecycle,
    pub control: ControlHandle,
    pub upstream: Option<Passthrough>,
}

/// Build the axum application around `state`
pub fn app(state: AppState) -> Router {
    Router::new()
        .route(CONTROL_PATH, post(control))
        .fallback(intercept)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn intercept(State(state): State<AppState>, request: Request) -> Response {
    // Only the head is used; passthrough forwards GET and HEAD without a body
    let (parts, _body) = request.into_parts();
    let head = http::Request::from_parts(parts, ());

    if state.lifecycle.is_controlling() {
        if let Some(response) = state.router.handle(&head).await {
            return response.map(Body::from);
        }
    }

    match &state.upstream {
        Some(upstream) => upstream.forward(head).await,
        None => (StatusCode::NOT_FOUND, "not handled").into_response(),
    }
}

async fn control(State(state): State<AppState>, Json(message): Json<ControlMessage>) -> Response {
    match state.control.send(message).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            warn!(?message, error = %e, "Control message not delivered");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// Wire the engine together and serve until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<()> {
    let loader_config = config.loader_config();
    let store = SqliteManifestStore::new(&loader_config);
    info!(store = %store.path().display(), "Using manifest store");

    let store: Arc<dyn ManifestStore> = Arc::new(store);
    let cache = ManifestCache::new(store);
    let router = RequestRouter::new(cache.clone(), &loader_config);

    let lifecycle = Lifecycle::new();
    let (control, control_task) = ControlChannel::spawn(cache, lifecycle.clone());

    let upstream = match config.upstream_url()? {
        Some(origin) => {
            info!(%origin, "Unclaimed requests fall through to upstream");
            Some(Passthrough::new(origin)?)
        }
        None => None,
    };

    let state = AppState {
        router,
        lifecycle: lifecycle.clone(),
        control,
        upstream,
    };

    let listener = TcpListener::bind(config.listen).await?;
    info!(address = %listener.local_addr()?, "Listening");

    lifecycle.install(config.take_over_on_install);
    if !lifecycle.is_controlling() {
        info!("Waiting for SKIP_WAITING before claiming requests");
    }

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The last control handle went away with the server
    let _ = control_task.await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
