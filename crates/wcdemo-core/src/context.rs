//! WalletContext - the handle the view layer uses to reach the coordinator.
//!
//! A context is handed out by a running
//! [`SessionCoordinator`](crate::session::SessionCoordinator) and is cheap to
//! clone. It reads state from a watch channel and sends operations into the
//! coordinator's queue:
//!
//! ```text
//!      ┌──────────────┐   connect / disconnect   ┌──────────────────────┐
//!      │ WalletContext│ ───────────────────────▶ │  SessionCoordinator  │
//!      │   (clones)   │ ◀─────────────────────── │  (one task, 1 queue) │
//!      └──────────────┘     ConnectionState      └──────────────────────┘
//! ```
//!
//! Once the coordinator is shut down every operation fails fast with
//! [`ContextError::Detached`].

use tokio::sync::{mpsc, oneshot, watch};

use crate::error::ContextError;
use crate::session::coordinator::Command;
use crate::session::ConnectionState;

/// Shared access to the wallet session.
#[derive(Clone)]
pub struct WalletContext {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl WalletContext {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        state: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self { commands, state }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Full address of the tracked session, empty when disconnected.
    pub fn address(&self) -> String {
        self.state.borrow().address().to_string()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Whether the owning coordinator is still running.
    pub fn is_attached(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Start a new pairing. Returns once the proposal is out and the modal
    /// shows its URI; the session itself settles later.
    pub async fn connect(&self) -> Result<(), ContextError> {
        self.request(|done| Command::Connect { done }).await
    }

    /// End the tracked session. Returns once local state is cleared.
    pub async fn disconnect(&self) -> Result<(), ContextError> {
        self.request(|done| Command::Disconnect { done }).await
    }

    /// Wait until the state satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&ConnectionState) -> bool,
    ) -> Result<ConnectionState, ContextError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| ContextError::Detached)?
            .clone();
        Ok(state)
    }

    /// Wait until initialization finished.
    pub async fn ready(&self) -> Result<ConnectionState, ContextError> {
        self.wait_for(|state| !state.is_loading()).await
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<()>) -> Command,
    ) -> Result<(), ContextError> {
        let (done, finished) = oneshot::channel();
        self.commands
            .send(command(done))
            .map_err(|_| ContextError::Detached)?;
        finished.await.map_err(|_| ContextError::Detached)
    }
}
