//! Protocol client capability and its adapter.
//!
//! [`SignClient`] describes exactly what the session coordinator needs from a
//! WalletConnect sign client: construction, proposing, approving, ending
//! sessions, subscribing to inbound events and looking sessions up. Anything
//! implementing it can back the coordinator; [`loopback::LoopbackSignClient`]
//! is the in-process implementation shipped with this crate.

pub mod loopback;
pub mod store;
pub mod uri;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::{broadcast, oneshot};

use crate::config::{AppMetadata, WalletConfig};
use crate::error::{ClientError, InitializationError};
use crate::namespaces::{extract_address, ProposalNamespaces, SessionNamespaces};
use crate::session::SessionTopic;

pub use loopback::{LoopbackSignClient, WalletPeer};

/// Options passed to [`SignClient::init`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub project_id: String,
    pub metadata: AppMetadata,
    /// Where the client keeps its sessions between runs.
    pub storage_path: Option<PathBuf>,
}

/// A settled session as stored by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub topic: SessionTopic,
    pub namespaces: SessionNamespaces,
    /// Metadata of the wallet on the other side.
    pub peer: AppMetadata,
    pub expiry: DateTime<Utc>,
}

impl Session {
    /// Address of the first account across all namespaces.
    pub fn address(&self) -> Option<String> {
        extract_address(&self.namespaces)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

/// Parameters of an inbound session proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalParams {
    pub pairing_topic: String,
    pub proposer: AppMetadata,
    pub required_namespaces: ProposalNamespaces,
    #[serde(default)]
    pub optional_namespaces: ProposalNamespaces,
}

/// An inbound `session_proposal` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProposal {
    pub id: u64,
    pub params: ProposalParams,
}

/// Events a client delivers to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    SessionProposal(SessionProposal),
    SessionDelete { id: u64, topic: SessionTopic },
}

impl ClientEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionProposal(_) => "session_proposal",
            Self::SessionDelete { .. } => "session_delete",
        }
    }
}

/// Request for a new session proposal.
#[derive(Debug, Clone, Default)]
pub struct ConnectParams {
    pub required_namespaces: ProposalNamespaces,
    pub optional_namespaces: ProposalNamespaces,
}

/// Answer to an inbound proposal.
#[derive(Debug, Clone)]
pub struct ApproveParams {
    pub id: u64,
    pub namespaces: ProposalNamespaces,
}

/// Reason sent to the peer when a session is ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectReason {
    pub code: u32,
    pub message: String,
}

impl DisconnectReason {
    /// Code 6000, the reason sent on every explicit disconnect.
    pub fn user_disconnected() -> Self {
        Self {
            code: 6000,
            message: "User disconnected".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisconnectParams {
    pub topic: SessionTopic,
    pub reason: DisconnectReason,
}

/// A result the client will deliver later.
#[derive(Debug)]
pub struct Pending<T>(oneshot::Receiver<Result<T, ClientError>>);

impl<T> Pending<T> {
    /// Create a pending result and the sender that resolves it.
    pub fn channel() -> (oneshot::Sender<Result<T, ClientError>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self(rx))
    }

    /// A pending result that is already resolved.
    pub fn ready(result: Result<T, ClientError>) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(result);
        pending
    }

    /// Wait for the result. A dropped sender reads as [`ClientError::Closed`].
    pub async fn wait(self) -> Result<T, ClientError> {
        self.0.await.unwrap_or(Err(ClientError::Closed))
    }
}

/// Resolves to the settled session once the wallet approves.
pub type Approval = Pending<Session>;

/// Resolves once the peer acknowledged an approved session.
pub type Acknowledgement = Pending<()>;

/// Result of [`SignClient::connect`].
#[derive(Debug)]
pub struct PendingConnection {
    /// Pairing URI to show the user. `None` when an existing pairing is reused.
    pub uri: Option<String>,
    pub approval: Approval,
}

/// Result of [`SignClient::approve`].
#[derive(Debug)]
pub struct ApprovedSession {
    pub topic: SessionTopic,
    pub acknowledged: Acknowledgement,
}

/// The operations the coordinator uses on a WalletConnect sign client.
pub trait SignClient: Send + Sync + Sized + 'static {
    /// Construct the client.
    fn init(options: ClientOptions) -> impl Future<Output = Result<Self, ClientError>> + Send;

    /// Create a session proposal.
    fn connect(
        &self,
        params: ConnectParams,
    ) -> impl Future<Output = Result<PendingConnection, ClientError>> + Send;

    /// Approve an inbound proposal.
    fn approve(
        &self,
        params: ApproveParams,
    ) -> impl Future<Output = Result<ApprovedSession, ClientError>> + Send;

    /// End a session.
    fn disconnect(
        &self,
        params: DisconnectParams,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Register for inbound events. Dropping the receiver unregisters.
    fn subscribe(&self) -> broadcast::Receiver<ClientEvent>;

    /// All sessions, in the order the client returns them.
    fn sessions(&self) -> Vec<Session>;

    fn session(&self, topic: &SessionTopic) -> Option<Session>;
}

/// Initialize a client with the fixed application metadata.
///
/// Failures are returned, not logged; the caller reports them once.
pub async fn initialize<C: SignClient>(config: &WalletConfig) -> Result<C, InitializationError> {
    let options = ClientOptions {
        project_id: config.project_id.clone(),
        metadata: AppMetadata::fixed(),
        storage_path: config.storage_path.clone(),
    };

    let client = C::init(options)
        .await
        .map_err(InitializationError::Client)?;
    log::info!("WalletConnect client initialized");
    Ok(client)
}
