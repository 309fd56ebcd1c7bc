//! Error taxonomy.
//!
//! `ClientError` is what a [`SignClient`](crate::client::SignClient) reports.
//! The coordinator wraps it into one error per operation boundary; none of
//! these reach the rendering layer, they are logged and turned into a safe
//! state.

use thiserror::Error;

use crate::session::SessionTopic;

/// Failure reported by the protocol client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("Session storage failed: {0}")]
    Storage(String),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Pairing not found: {0}")]
    PairingNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionTopic),

    #[error("Invalid pairing URI: {0}")]
    InvalidUri(String),

    #[error("Unsupported namespaces: {0}")]
    UnsupportedNamespaces(String),

    #[error("Proposal rejected by wallet: {0}")]
    Rejected(String),

    #[error("Pairing {0} was replaced by a newer one")]
    Superseded(String),

    #[error("Client shut down before the request completed")]
    Closed,
}

/// Client or modal construction failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitializationError {
    #[error("Failed to initialize WalletConnect client: {0}")]
    Client(#[source] ClientError),
}

/// Approving an inbound session proposal failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Failed to approve proposal {id}: {source}")]
    Approve { id: u64, source: ClientError },

    #[error("Session {topic} was not acknowledged: {source}")]
    Acknowledge {
        topic: SessionTopic,
        source: ClientError,
    },
}

/// Creating a proposal or waiting for its approval failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("WalletConnect is not initialized")]
    NotInitialized,

    #[error("Failed to create session proposal: {0}")]
    Proposal(#[source] ClientError),

    #[error("Session approval failed: {0}")]
    Approval(#[source] ClientError),
}

/// Terminating a session failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to disconnect session {topic}: {source}")]
pub struct DisconnectError {
    pub topic: SessionTopic,
    pub source: ClientError,
}

/// A [`WalletContext`](crate::context::WalletContext) was used outside its
/// owning coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Wallet context used after its coordinator was shut down")]
    Detached,
}
