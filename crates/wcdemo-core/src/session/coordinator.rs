//! SessionCoordinator - owns the client and modal and serializes every state
//! change through one queue.
//!
//! Producers of the queue:
//! - [`WalletContext`] operations (`connect`, `disconnect`)
//! - the client event listener (`session_proposal`, `session_delete`)
//! - tasks waiting on a connect approval or a proposal acknowledgement,
//!   which post `Settled` once their session exists (or `PairingFailed`)
//!
//! Both the connect approval and the proposal handler settle the same session.
//! The connect approval is the primary path and the proposal handler confirms
//! it; a settle is applied only while the client still knows the session, and
//! re-settling the tracked topic changes nothing. Whichever arrives first wins
//! and a late one for an ended session is dropped, including one the client
//! still knows because a local disconnect failed.
//!
//! Only the latest connect attempt may close the modal when its approval fails.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::listener::ListenerGuard;
use super::state::{ConnectionState, SessionTopic};
use crate::client::{
    self, ApproveParams, ClientEvent, ConnectParams, DisconnectParams, DisconnectReason, Session,
    SessionProposal, SignClient,
};
use crate::config::WalletConfig;
use crate::context::WalletContext;
use crate::error::{
    ApprovalError, ClientError, ConnectError, DisconnectError, InitializationError,
};
use crate::logging::{self, log_json, log_line, LogHandle};
use crate::modal::{self, Modal};
use crate::namespaces::required_namespaces;

/// Which path reported a settled session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SettleSource {
    Connect,
    Proposal,
}

pub(crate) enum Command {
    Connect { done: oneshot::Sender<()> },
    Disconnect { done: oneshot::Sender<()> },
    Client(ClientEvent),
    Settled {
        topic: SessionTopic,
        source: SettleSource,
    },
    /// The approval of connect attempt `attempt` failed.
    PairingFailed { attempt: u64 },
    Shutdown,
}

struct Adapters<C, M> {
    client: Arc<C>,
    modal: Arc<M>,
}

impl<C, M> Clone for Adapters<C, M> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            modal: Arc::clone(&self.modal),
        }
    }
}

/// Projection of the most recent session the client returned.
pub(crate) fn restore(sessions: &[Session]) -> ConnectionState {
    let Some(session) = sessions.last() else {
        return ConnectionState::Disconnected;
    };
    match session.address() {
        Some(address) => ConnectionState::Connected {
            topic: session.topic.clone(),
            address,
        },
        None => {
            log::warn!("Stored session {} has no accounts", session.topic);
            ConnectionState::Disconnected
        }
    }
}

/// Owner of the wallet session for as long as it is mounted.
///
/// Dropping the coordinator shuts it down; [`SessionCoordinator::shutdown`]
/// does the same and waits for listeners to detach.
pub struct SessionCoordinator {
    context: WalletContext,
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
}

impl SessionCoordinator {
    /// Initialize client `C` and modal `M` from `config` and start.
    pub fn start<C: SignClient, M: Modal>(config: WalletConfig) -> Self {
        let trace = logging::open_log_file(config.log_dir.as_deref(), "wallet-session");
        Self::spawn(
            async move {
                let client = client::initialize::<C>(&config).await?;
                let modal = modal::create::<M>(&config);
                Ok::<_, InitializationError>((client, modal))
            },
            trace,
        )
    }

    /// Start with a custom initializer.
    ///
    /// State is `Loading` until `init` resolves. An error leaves the
    /// coordinator running without a client: state becomes `Disconnected` and
    /// operations are no-ops.
    pub fn spawn<C, M, F>(init: F, trace: LogHandle) -> Self
    where
        C: SignClient,
        M: Modal,
        F: Future<Output = Result<(C, M), InitializationError>> + Send + 'static,
    {
        let (commands, queue) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(ConnectionState::Loading);

        let actor = Coordinator::<C, M> {
            adapters: None,
            state,
            commands: commands.clone(),
            listener: None,
            trace,
            attempt: 0,
            ended: None,
        };
        let task = tokio::spawn(actor.run(init, queue));

        Self {
            context: WalletContext::new(commands.clone(), state_rx),
            commands,
            task: Some(task),
        }
    }

    /// A handle for the view layer.
    pub fn context(&self) -> WalletContext {
        self.context.clone()
    }

    /// Stop processing, detach listeners and wait for the task to end.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.commands.send(Command::Shutdown);
            if let Err(e) = task.await {
                log::error!("Session coordinator task failed: {}", e);
            }
        }
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if self.task.take().is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

struct Coordinator<C, M> {
    adapters: Option<Adapters<C, M>>,
    state: watch::Sender<ConnectionState>,
    commands: mpsc::UnboundedSender<Command>,
    listener: Option<ListenerGuard>,
    trace: LogHandle,
    /// Number of the latest connect attempt.
    attempt: u64,
    /// Topic cleared by a local disconnect; late settles for it are dropped.
    ended: Option<SessionTopic>,
}

impl<C: SignClient, M: Modal> Coordinator<C, M> {
    async fn run<F>(mut self, init: F, mut queue: mpsc::UnboundedReceiver<Command>)
    where
        F: Future<Output = Result<(C, M), InitializationError>> + Send,
    {
        self.initialize(init).await;

        while let Some(command) = queue.recv().await {
            match command {
                Command::Connect { done } => {
                    self.connect().await;
                    let _ = done.send(());
                }
                Command::Disconnect { done } => {
                    self.disconnect().await;
                    let _ = done.send(());
                }
                Command::Client(event) => self.on_client_event(event),
                Command::Settled { topic, source } => self.settle(topic, source),
                Command::PairingFailed { attempt } => self.on_pairing_failed(attempt),
                Command::Shutdown => break,
            }
        }

        if let Some(listener) = self.listener.take() {
            listener.detach().await;
        }
        log::debug!("Session coordinator stopped");
    }

    async fn initialize<F>(&mut self, init: F)
    where
        F: Future<Output = Result<(C, M), InitializationError>>,
    {
        match init.await {
            Ok((client, modal)) => {
                let client = Arc::new(client);
                // Listen before restoring so nothing emitted meanwhile is lost;
                // queued events are applied after the restored state.
                self.listener = Some(ListenerGuard::attach(
                    client.subscribe(),
                    self.commands.clone(),
                ));
                let restored = restore(&client.sessions());
                self.adapters = Some(Adapters {
                    client,
                    modal: Arc::new(modal),
                });
                self.transition(restored);
            }
            Err(e) => {
                log::error!("Error initializing WalletConnect: {}", e);
                log_line(&self.trace, "ERROR", &e.to_string());
                self.transition(ConnectionState::Disconnected);
            }
        }
    }

    fn tracked_topic(&self) -> Option<SessionTopic> {
        self.state.borrow().topic().cloned()
    }

    fn transition(&mut self, next: ConnectionState) {
        if *self.state.borrow() == next {
            return;
        }
        match &next {
            ConnectionState::Connected { topic, address } => {
                log::info!("Wallet connected: {} (session {})", address, topic)
            }
            ConnectionState::Disconnected => log::info!("Wallet disconnected"),
            ConnectionState::Loading => {}
        }
        log_json(&self.trace, "STATE", &next);
        self.state.send_replace(next);
    }

    async fn connect(&mut self) {
        let Some(adapters) = self.adapters.clone() else {
            log::error!("{}", ConnectError::NotInitialized);
            return;
        };

        let params = ConnectParams {
            required_namespaces: required_namespaces(),
            ..Default::default()
        };
        let pending = match adapters.client.connect(params).await {
            Ok(pending) => pending,
            Err(e) => {
                let error = ConnectError::Proposal(e);
                log::error!("Error connecting: {}", error);
                log_line(&self.trace, "ERROR", &error.to_string());
                adapters.modal.close();
                return;
            }
        };

        self.attempt += 1;
        let attempt = self.attempt;
        if let Some(uri) = pending.uri.as_deref() {
            log_line(&self.trace, "PAIRING", uri);
            adapters.modal.open(uri);
        }

        let commands = self.commands.clone();
        let trace = self.trace.clone();
        tokio::spawn(async move {
            match pending.approval.wait().await {
                Ok(session) => {
                    log::info!("Session established: {}", session.topic);
                    let _ = commands.send(Command::Settled {
                        topic: session.topic,
                        source: SettleSource::Connect,
                    });
                }
                Err(ClientError::Superseded(topic)) => {
                    log::debug!("Connect attempt {} superseded (pairing {})", attempt, topic);
                }
                Err(e) => {
                    let error = ConnectError::Approval(e);
                    log::error!("Error connecting: {}", error);
                    log_line(&trace, "ERROR", &error.to_string());
                    let _ = commands.send(Command::PairingFailed { attempt });
                }
            }
        });
    }

    fn on_pairing_failed(&self, attempt: u64) {
        if attempt != self.attempt {
            log::debug!("Ignoring failure of stale connect attempt {}", attempt);
            return;
        }
        if let Some(adapters) = &self.adapters {
            adapters.modal.close();
        }
    }

    async fn disconnect(&mut self) {
        let Some(topic) = self.tracked_topic() else {
            log::debug!("Disconnect ignored: no tracked session");
            return;
        };
        let Some(adapters) = self.adapters.clone() else {
            return;
        };

        let params = DisconnectParams {
            topic: topic.clone(),
            reason: DisconnectReason::user_disconnected(),
        };
        if let Err(source) = adapters.client.disconnect(params).await {
            let error = DisconnectError {
                topic: topic.clone(),
                source,
            };
            log::error!("Error disconnecting: {}", error);
            log_line(&self.trace, "ERROR", &error.to_string());
        }

        self.ended = Some(topic);
        self.transition(ConnectionState::Disconnected);
    }

    fn on_client_event(&mut self, event: ClientEvent) {
        log_json(&self.trace, "EVENT", &event);
        match event {
            ClientEvent::SessionProposal(proposal) => self.on_session_proposal(proposal),
            ClientEvent::SessionDelete { topic, .. } => self.on_session_delete(&topic),
        }
    }

    fn on_session_proposal(&self, proposal: SessionProposal) {
        log::info!("Session proposal received: {}", proposal.id);
        let Some(adapters) = self.adapters.clone() else {
            return;
        };

        let commands = self.commands.clone();
        let trace = self.trace.clone();
        tokio::spawn(async move {
            match approve(adapters.client.as_ref(), &proposal).await {
                Ok(topic) => {
                    let _ = commands.send(Command::Settled {
                        topic,
                        source: SettleSource::Proposal,
                    });
                }
                Err(e) => {
                    log::error!("Error approving session: {}", e);
                    log_line(&trace, "ERROR", &e.to_string());
                }
            }
        });
    }

    fn on_session_delete(&mut self, topic: &SessionTopic) {
        log::info!("Session deleted: {}", topic);
        if self.tracked_topic().as_ref() == Some(topic) {
            self.transition(ConnectionState::Disconnected);
        } else {
            log::debug!("Ignoring deletion of untracked session {}", topic);
        }
    }

    fn settle(&mut self, topic: SessionTopic, source: SettleSource) {
        let Some(adapters) = self.adapters.clone() else {
            return;
        };

        if self.tracked_topic().as_ref() == Some(&topic) {
            log::debug!("Session {} already tracked ({:?})", topic, source);
            adapters.modal.close();
            return;
        }

        if self.ended.as_ref() == Some(&topic) {
            log::debug!("Ignoring settle of disconnected session {} ({:?})", topic, source);
            return;
        }

        let Some(session) = adapters.client.session(&topic) else {
            log::warn!("Ignoring settled session {}: unknown to the client", topic);
            return;
        };
        let Some(address) = session.address() else {
            log::warn!("Ignoring settled session {}: no accounts", topic);
            return;
        };

        adapters.modal.close();
        self.transition(ConnectionState::Connected { topic, address });
    }
}

/// Approve `proposal` with the fixed namespaces and wait for the ack.
async fn approve<C: SignClient>(
    client: &C,
    proposal: &SessionProposal,
) -> Result<SessionTopic, ApprovalError> {
    let approved = client
        .approve(ApproveParams {
            id: proposal.id,
            namespaces: required_namespaces(),
        })
        .await
        .map_err(|source| ApprovalError::Approve {
            id: proposal.id,
            source,
        })?;

    let topic = approved.topic;
    approved
        .acknowledged
        .wait()
        .await
        .map_err(|source| ApprovalError::Acknowledge {
            topic: topic.clone(),
            source,
        })?;
    Ok(topic)
}
