//! Scoped registration of client event listeners.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::coordinator::Command;
use crate::client::ClientEvent;

/// Forwards client events into the coordinator's queue while alive.
///
/// The forwarding task owns the broadcast receiver, so stopping the task
/// unregisters from the client. `detach` waits for that to happen; a plain
/// drop only requests it.
pub(crate) struct ListenerGuard {
    task: Option<JoinHandle<()>>,
}

impl ListenerGuard {
    pub(crate) fn attach(
        mut events: broadcast::Receiver<ClientEvent>,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if commands.send(Command::Client(event)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("Missed {} WalletConnect event(s)", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        log::debug!("Attached WalletConnect event listeners");
        Self { task: Some(task) }
    }

    /// Stop forwarding and wait until the receiver is gone.
    pub(crate) async fn detach(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            log::debug!("Detached WalletConnect event listeners");
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
