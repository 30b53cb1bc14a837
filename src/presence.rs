//! Backend presence indicator.
//!
//! A `PresenceView` is activated into an `ActiveView` scope. Activation runs
//! the status probe exactly once in the background; its outcome settles the
//! connection state, which every render reads. Dropping the scope cancels an
//! outstanding probe and its result is thrown away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::ProbeError;
use crate::probe::StatusProbe;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unverified,
    Verified,
    Failed(String),
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Unverified
    }
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Verified)
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ConnectionState::Unverified)
    }

    /// Record the probe outcome. Only the first outcome is kept; returns
    /// whether the state moved.
    pub fn settle(&mut self, outcome: Result<(), ProbeError>) -> bool {
        if self.is_settled() {
            tracing::debug!("ignoring probe outcome, state already {:?}", self);
            return false;
        }
        *self = match outcome {
            Ok(()) => ConnectionState::Verified,
            Err(e) => ConnectionState::Failed(e.reason),
        };
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    Yellow,
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRow {
    pub light: Light,
    pub name: String,
    pub status: String,
    pub detail: Option<String>,
}

impl IndicatorRow {
    fn running(name: &str) -> Self {
        IndicatorRow {
            light: Light::Green,
            name: name.to_string(),
            status: "running".to_string(),
            detail: None,
        }
    }
}

/// The three rows of the status screen. Only the first depends on `state`.
pub fn render_rows(state: &ConnectionState, table: &str) -> [IndicatorRow; 3] {
    let (light, status, detail) = match state {
        ConnectionState::Unverified => (Light::Yellow, "connecting…", None),
        ConnectionState::Verified => (Light::Green, "connected", None),
        ConnectionState::Failed(reason) => (Light::Red, "unreachable", Some(reason.clone())),
    };

    [
        IndicatorRow {
            light,
            name: format!("Backend ({})", table),
            status: status.to_string(),
            detail,
        },
        IndicatorRow::running("Runtime (tokio)"),
        IndicatorRow::running("Interface"),
    ]
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresenceError {
    #[error("presence view is already active")]
    AlreadyActive,
}

pub struct PresenceView {
    probe: StatusProbe,
    runtime: Handle,
    active: Arc<AtomicBool>,
}

impl PresenceView {
    pub fn new(probe: StatusProbe, runtime: Handle) -> Self {
        PresenceView {
            probe,
            runtime,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a display scope and launch its probe.
    pub fn activate(&self) -> Result<ActiveView, PresenceError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PresenceError::AlreadyActive);
        }

        let (state_tx, state_rx) = watch::channel(ConnectionState::Unverified);
        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let probe = self.probe.clone();

        tracing::info!("presence view activated; probing `{}`", probe.table());
        let handle = self.runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token_clone.cancelled() => {
                    tracing::debug!("presence view released before the probe settled");
                    return;
                }
                outcome = probe.check() => outcome,
            };

            if token_clone.is_cancelled() {
                tracing::debug!("discarding probe outcome for a released view");
                return;
            }
            state_tx.send_modify(|state| {
                state.settle(outcome);
            });
        });

        Ok(ActiveView {
            table: self.probe.table().to_string(),
            state: state_rx,
            cancel_token,
            handle: Some(handle),
            active: self.active.clone(),
        })
    }
}

/// A live activation of the presence view. Dropping it releases the scope.
pub struct ActiveView {
    table: String,
    state: watch::Receiver<ConnectionState>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    active: Arc<AtomicBool>,
}

impl ActiveView {
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Current state, marked as seen so `changed` only wakes for later writes.
    pub fn current(&mut self) -> ConnectionState {
        self.state.borrow_and_update().clone()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn rows(&self) -> [IndicatorRow; 3] {
        render_rows(&self.state.borrow(), &self.table)
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait for the next state change. Returns false once no change can
    /// arrive any more.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Wait until the probe has settled the state. Never resolves if the
    /// probe never does.
    pub async fn settled(&mut self) -> ConnectionState {
        if let Ok(state) = self.state.wait_for(|s| s.is_settled()).await {
            return state.clone();
        }
        self.state()
    }

    /// Release the scope and wait for the probe task to wind down.
    pub async fn deactivate(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("probe task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ActiveView {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self.active.store(false, Ordering::SeqCst);
        tracing::debug!("presence view released");
    }
}
