//! # Control Channel
//!
//! Signals the intercepting host accepts from whoever embeds it: take over
//! immediately, and clear the manifest cache. Also tracks the activation
//! lifecycle that decides whether intercepted requests are claimed at all.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ManifestCache;
use crate::error::{LoaderError, Result};

/// Activation state of the intercepting layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    /// Installed, waiting for the previous layer's sessions to end
    Waiting,
    /// Active and controlling every client
    Controlling,
}

/// Shared activation lifecycle.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: Arc<watch::Sender<LifecycleState>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(LifecycleState::Installing)),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn is_controlling(&self) -> bool {
        self.state() == LifecycleState::Controlling
    }

    /// Finish installation. With `take_over` set the layer skips waiting and
    /// activates straight away.
    pub fn install(&self, take_over: bool) {
        self.state.send_if_modified(|state| {
            if *state == LifecycleState::Installing {
                *state = LifecycleState::Waiting;
                true
            } else {
                false
            }
        });
        info!(take_over, "Interception layer installed");

        if take_over {
            self.skip_waiting();
        }
    }

    /// Activate without waiting for existing sessions, then claim all clients.
    pub fn skip_waiting(&self) {
        let activated = self.state.send_if_modified(|state| {
            if *state == LifecycleState::Controlling {
                false
            } else {
                *state = LifecycleState::Controlling;
                true
            }
        });

        if activated {
            info!("Interception layer activated and controlling clients");
        }
    }

    /// Resolve once the layer controls its clients.
    pub async fn controlling(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx
            .wait_for(|state| *state == LifecycleState::Controlling)
            .await;
    }
}

/// A control signal from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Take over immediately
    SkipWaiting,
    /// Drop every cached manifest
    ClearCache,
}

/// Acknowledgement sent back for every control message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReply {
    pub success: bool,
}

struct Envelope {
    message: ControlMessage,
    reply: oneshot::Sender<ControlReply>,
}

/// Sending half of the control channel
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<Envelope>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl ControlHandle {
    /// Deliver `message` and wait for its acknowledgement.
    pub async fn send(&self, message: ControlMessage) -> Result<ControlReply> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { message, reply })
            .await
            .map_err(|_| LoaderError::ControlClosed)?;
        rx.await.map_err(|_| LoaderError::ControlClosed)
    }
}

/// The task that applies control messages in arrival order.
pub struct ControlChannel;

impl ControlChannel {
    /// Spawn the control task. It stops once every [`ControlHandle`] is
    /// dropped.
    pub fn spawn(cache: ManifestCache, lifecycle: Lifecycle) -> (ControlHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Envelope>(16);

        let task = tokio::spawn(async move {
            while let Some(Envelope { message, reply }) = rx.recv().await {
                debug!(?message, "Control message received");
                match message {
                    ControlMessage::SkipWaiting => lifecycle.skip_waiting(),
                    ControlMessage::ClearCache => cache.clear(),
                }
                // The sender may have given up waiting
                let _ = reply.send(ControlReply { success: true });
            }
            debug!("Control channel closed");
        });

        (ControlHandle { tx }, task)
    }
}
