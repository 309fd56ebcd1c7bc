//! In-process sign client.
//!
//! `LoopbackSignClient` plays both ends of the pairing without a relay: the
//! application side proposes sessions and receives events, and a
//! [`WalletPeer`] handle plays the wallet that scans the pairing URI, grants
//! accounts and may end the session. Sessions are kept in creation order and,
//! when a storage path is configured, persisted to disk so a later run
//! restores them.

use chrono::{Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, oneshot};

use super::store::SessionStore;
use super::uri::PairingUri;
use super::{
    ApproveParams, ApprovedSession, ClientEvent, ClientOptions, ConnectParams, DisconnectParams,
    DisconnectReason, Pending, PendingConnection, ProposalParams, Session, SessionProposal,
    SignClient,
};
use crate::config::AppMetadata;
use crate::error::ClientError;
use crate::event_bus::EventBus;
use crate::namespaces::{AccountId, ProposalNamespaces, SessionNamespace, SessionNamespaces};
use crate::session::SessionTopic;

/// Lifetime of a settled session.
const SESSION_TTL_DAYS: i64 = 7;

/// A pairing URI handed out by `connect` and not yet approved or rejected.
struct PendingPairing {
    metadata: AppMetadata,
    required: ProposalNamespaces,
    optional: ProposalNamespaces,
    approval: Option<oneshot::Sender<Result<Session, ClientError>>>,
}

/// A proposal raised by the wallet peer, waiting for `approve`.
struct PendingProposal {
    pairing_topic: String,
    wallet: AppMetadata,
    addresses: Vec<String>,
}

#[derive(Default)]
struct Inner {
    sessions: Vec<Session>,
    pairings: HashMap<String, PendingPairing>,
    proposals: HashMap<u64, PendingProposal>,
    disconnects: Vec<(SessionTopic, DisconnectReason)>,
}

/// Sign client that pairs with an in-process wallet peer.
#[derive(Clone)]
pub struct LoopbackSignClient {
    inner: Arc<Mutex<Inner>>,
    events: EventBus<ClientEvent>,
    metadata: AppMetadata,
    store: Option<SessionStore>,
}

fn validate_project_id(project_id: &str) -> Result<(), ClientError> {
    let valid = project_id.len() == 32 && project_id.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ClientError::InvalidProjectId(project_id.to_string()))
    }
}

/// JSON-RPC style payload id: milliseconds since epoch times 1000 plus noise.
fn payload_id() -> u64 {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    millis * 1000 + rand::thread_rng().gen_range(0..1000)
}

fn check_supported(namespaces: &ProposalNamespaces) -> Result<(), ClientError> {
    if namespaces.is_empty() {
        return Err(ClientError::UnsupportedNamespaces(
            "no required namespaces".to_string(),
        ));
    }
    for (key, ns) in namespaces {
        if let Some(chain) = ns
            .chains
            .iter()
            .find(|chain| chain.split_once(':').map(|(n, _)| n) != Some(key.as_str()))
        {
            return Err(ClientError::UnsupportedNamespaces(format!(
                "chain {chain} does not belong to namespace {key}"
            )));
        }
    }
    Ok(())
}

/// Every required namespace must be granted with all of its chains.
fn check_covers(granted: &ProposalNamespaces, required: &ProposalNamespaces) -> Result<(), ClientError> {
    for (key, ns) in required {
        let covered = granted
            .get(key)
            .map(|g| ns.chains.iter().all(|chain| g.chains.contains(chain)))
            .unwrap_or(false);
        if !covered {
            return Err(ClientError::UnsupportedNamespaces(format!(
                "namespace {key} is not fully approved"
            )));
        }
    }
    Ok(())
}

fn settle_namespaces(granted: &ProposalNamespaces, addresses: &[String]) -> SessionNamespaces {
    granted
        .iter()
        .map(|(key, ns)| {
            let accounts = ns
                .chains
                .iter()
                .flat_map(|chain| {
                    addresses
                        .iter()
                        .filter_map(move |address| AccountId::for_chain(chain, address))
                })
                .map(|account| account.to_string())
                .collect();
            let settled = SessionNamespace {
                accounts,
                methods: ns.methods.clone(),
                events: ns.events.clone(),
            };
            (key.clone(), settled)
        })
        .collect()
}

impl LoopbackSignClient {
    fn new(options: ClientOptions) -> Result<Self, ClientError> {
        validate_project_id(&options.project_id)?;

        let store = options.storage_path.map(SessionStore::new);
        let mut sessions = match &store {
            Some(store) => store
                .load()
                .map_err(|e| ClientError::Storage(e.to_string()))?,
            None => Vec::new(),
        };

        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|session| !session.is_expired(now));
        if sessions.len() != before {
            log::info!("Dropped {} expired session(s)", before - sessions.len());
        }

        let client = Self {
            inner: Arc::new(Mutex::new(Inner {
                sessions,
                ..Default::default()
            })),
            events: EventBus::new(),
            metadata: options.metadata,
            store,
        };
        if before != client.sessions().len() {
            client.persist();
        }
        Ok(client)
    }

    /// A handle playing the wallet side of this client.
    pub fn wallet_peer(&self, metadata: AppMetadata) -> WalletPeer {
        WalletPeer {
            client: self.clone(),
            metadata,
        }
    }

    /// Number of registered event listeners.
    pub fn listener_count(&self) -> usize {
        self.events.subscriber_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let sessions = self.lock().sessions.clone();
        if let Err(e) = store.save(&sessions) {
            log::warn!("Failed to persist sessions to {}: {}", store.path().display(), e);
        }
    }

    fn propose(&self, params: ConnectParams) -> Result<PendingConnection, ClientError> {
        check_supported(&params.required_namespaces)?;

        let uri = PairingUri::generate();
        let (approval_tx, approval) = Pending::channel();

        // Only the newest pairing URI stays valid.
        let mut inner = self.lock();
        for (topic, mut stale) in inner.pairings.drain() {
            if let Some(tx) = stale.approval.take() {
                let _ = tx.send(Err(ClientError::Superseded(topic.clone())));
            }
            log::debug!("Dropped superseded pairing {}", topic);
        }
        inner.proposals.clear();
        inner.pairings.insert(
            uri.topic.clone(),
            PendingPairing {
                metadata: self.metadata.clone(),
                required: params.required_namespaces,
                optional: params.optional_namespaces,
                approval: Some(approval_tx),
            },
        );
        drop(inner);

        log::debug!("Created pairing {}", uri.topic);
        Ok(PendingConnection {
            uri: Some(uri.to_string()),
            approval,
        })
    }

    fn settle(&self, params: ApproveParams) -> Result<ApprovedSession, ClientError> {
        let session = {
            let mut inner = self.lock();
            let proposal = inner
                .proposals
                .get(&params.id)
                .ok_or(ClientError::ProposalNotFound(params.id))?;
            let pairing = inner
                .pairings
                .get(&proposal.pairing_topic)
                .ok_or_else(|| ClientError::PairingNotFound(proposal.pairing_topic.clone()))?;
            check_covers(&params.namespaces, &pairing.required)?;

            let session = Session {
                topic: SessionTopic::random(),
                namespaces: settle_namespaces(&params.namespaces, &proposal.addresses),
                peer: proposal.wallet.clone(),
                expiry: Utc::now() + Duration::days(SESSION_TTL_DAYS),
            };

            let proposal = inner.proposals.remove(&params.id);
            let pairing = proposal.and_then(|p| inner.pairings.remove(&p.pairing_topic));
            if let Some(tx) = pairing.and_then(|mut p| p.approval.take()) {
                let _ = tx.send(Ok(session.clone()));
            }
            inner.sessions.push(session.clone());
            session
        };

        self.persist();
        log::info!("Approved proposal {} as session {}", params.id, session.topic);
        Ok(ApprovedSession {
            topic: session.topic,
            acknowledged: Pending::ready(Ok(())),
        })
    }

    fn end(&self, params: DisconnectParams) -> Result<(), ClientError> {
        {
            let mut inner = self.lock();
            let index = inner
                .sessions
                .iter()
                .position(|s| s.topic == params.topic)
                .ok_or_else(|| ClientError::SessionNotFound(params.topic.clone()))?;
            inner.sessions.remove(index);
            inner.disconnects.push((params.topic.clone(), params.reason));
        }
        self.persist();
        Ok(())
    }
}

impl SignClient for LoopbackSignClient {
    async fn init(options: ClientOptions) -> Result<Self, ClientError> {
        Self::new(options)
    }

    async fn connect(&self, params: ConnectParams) -> Result<PendingConnection, ClientError> {
        self.propose(params)
    }

    async fn approve(&self, params: ApproveParams) -> Result<ApprovedSession, ClientError> {
        self.settle(params)
    }

    async fn disconnect(&self, params: DisconnectParams) -> Result<(), ClientError> {
        self.end(params)
    }

    fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn sessions(&self) -> Vec<Session> {
        self.lock().sessions.clone()
    }

    fn session(&self, topic: &SessionTopic) -> Option<Session> {
        self.lock().sessions.iter().find(|s| &s.topic == topic).cloned()
    }
}

/// The wallet side of a [`LoopbackSignClient`].
#[derive(Clone)]
pub struct WalletPeer {
    client: LoopbackSignClient,
    metadata: AppMetadata,
}

impl WalletPeer {
    /// Scan a pairing URI and propose a session granting `address`.
    ///
    /// Emits `session_proposal` to the client's listeners and returns the
    /// proposal id.
    pub fn pair(&self, uri: &str, address: &str) -> Result<u64, ClientError> {
        let uri: PairingUri = uri.parse()?;
        let id = payload_id();

        let proposal = {
            let mut inner = self.client.lock();
            let pairing = inner
                .pairings
                .get(&uri.topic)
                .ok_or_else(|| ClientError::PairingNotFound(uri.topic.clone()))?;
            let params = ProposalParams {
                pairing_topic: uri.topic.clone(),
                proposer: pairing.metadata.clone(),
                required_namespaces: pairing.required.clone(),
                optional_namespaces: pairing.optional.clone(),
            };
            inner.proposals.insert(
                id,
                PendingProposal {
                    pairing_topic: uri.topic,
                    wallet: self.metadata.clone(),
                    addresses: vec![address.to_string()],
                },
            );
            SessionProposal { id, params }
        };

        log::debug!("Wallet raised proposal {}", id);
        self.client
            .events
            .emit(ClientEvent::SessionProposal(proposal));
        Ok(id)
    }

    /// Refuse the pairing; the application's pending approval fails.
    pub fn reject(&self, uri: &str, reason: &str) -> Result<(), ClientError> {
        let uri: PairingUri = uri.parse()?;
        let mut inner = self.client.lock();
        let mut pairing = inner
            .pairings
            .remove(&uri.topic)
            .ok_or_else(|| ClientError::PairingNotFound(uri.topic.clone()))?;
        inner.proposals.retain(|_, p| p.pairing_topic != uri.topic);
        if let Some(tx) = pairing.approval.take() {
            let _ = tx.send(Err(ClientError::Rejected(reason.to_string())));
        }
        Ok(())
    }

    /// End a session from the wallet side; emits `session_delete`.
    pub fn delete_session(&self, topic: &SessionTopic) -> Result<(), ClientError> {
        {
            let mut inner = self.client.lock();
            let before = inner.sessions.len();
            inner.sessions.retain(|s| &s.topic != topic);
            if inner.sessions.len() == before {
                return Err(ClientError::SessionNotFound(topic.clone()));
            }
        }
        self.client.persist();
        self.client.events.emit(ClientEvent::SessionDelete {
            id: payload_id(),
            topic: topic.clone(),
        });
        Ok(())
    }

    /// Disconnect reasons the application sent, oldest first.
    pub fn disconnect_reasons(&self) -> Vec<(SessionTopic, DisconnectReason)> {
        self.client.lock().disconnects.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::required_namespaces;
    use tempfile::tempdir;

    const PROJECT_ID: &str = "0123456789abcdef0123456789abcdef";

    fn options() -> ClientOptions {
        ClientOptions {
            project_id: PROJECT_ID.to_string(),
            metadata: AppMetadata::fixed(),
            storage_path: None,
        }
    }

    fn wallet() -> AppMetadata {
        AppMetadata {
            name: "Test Wallet".to_string(),
            description: "wallet".to_string(),
            url: "https://wallet.example".to_string(),
            icons: vec![],
        }
    }

    fn connect_params() -> ConnectParams {
        ConnectParams {
            required_namespaces: required_namespaces(),
            optional_namespaces: ProposalNamespaces::new(),
        }
    }

    async fn settled(client: &LoopbackSignClient, address: &str) -> Session {
        let mut events = client.subscribe();
        let pending = client.connect(connect_params()).await.unwrap();
        let peer = client.wallet_peer(wallet());
        let id = peer.pair(pending.uri.as_deref().unwrap(), address).unwrap();

        match events.recv().await.unwrap() {
            ClientEvent::SessionProposal(p) => assert_eq!(p.id, id),
            other => panic!("unexpected event {other:?}"),
        }
        client
            .approve(ApproveParams {
                id,
                namespaces: required_namespaces(),
            })
            .await
            .unwrap();
        pending.approval.wait().await.unwrap()
    }

    mod init {
        use super::*;

        #[tokio::test]
        async fn rejects_bad_project_ids() {
            for id in ["", "short", "zz23456789abcdef0123456789abcdef"] {
                let result = LoopbackSignClient::init(ClientOptions {
                    project_id: id.to_string(),
                    ..options()
                })
                .await;
                assert!(matches!(result, Err(ClientError::InvalidProjectId(_))));
            }
        }

        #[tokio::test]
        async fn restores_sessions_from_store() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("sessions.json");
            let opts = ClientOptions {
                storage_path: Some(path.clone()),
                ..options()
            };

            let first = LoopbackSignClient::init(opts.clone()).await.unwrap();
            let session = settled(&first, "0xABCDEF").await;

            let second = LoopbackSignClient::init(opts).await.unwrap();
            assert_eq!(second.sessions(), vec![session]);
        }

        #[tokio::test]
        async fn drops_expired_sessions() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("sessions.json");
            let opts = ClientOptions {
                storage_path: Some(path.clone()),
                ..options()
            };

            let first = LoopbackSignClient::init(opts.clone()).await.unwrap();
            let mut session = settled(&first, "0xABCDEF").await;
            session.expiry = Utc::now() - Duration::minutes(1);
            SessionStore::new(path.clone()).save(&[session]).unwrap();

            let second = LoopbackSignClient::init(opts).await.unwrap();
            assert!(second.sessions().is_empty());
            assert!(SessionStore::new(path).load().unwrap().is_empty());
        }

        #[tokio::test]
        async fn corrupt_store_fails_init() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("sessions.json");
            std::fs::write(&path, "garbage").unwrap();

            let result = LoopbackSignClient::init(ClientOptions {
                storage_path: Some(path),
                ..options()
            })
            .await;
            assert!(matches!(result, Err(ClientError::Storage(_))));
        }
    }

    mod pairing {
        use super::*;

        #[tokio::test]
        async fn connect_returns_pairing_uri() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let pending = client.connect(connect_params()).await.unwrap();
            let uri: PairingUri = pending.uri.unwrap().parse().unwrap();
            assert_eq!(uri.relay_protocol, "irn");
        }

        #[tokio::test]
        async fn connect_requires_namespaces() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let result = client.connect(ConnectParams::default()).await;
            assert!(matches!(result, Err(ClientError::UnsupportedNamespaces(_))));
        }

        #[tokio::test]
        async fn connect_rejects_foreign_chain() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let mut required = required_namespaces();
            required
                .get_mut("eip155")
                .unwrap()
                .chains
                .push("solana:mainnet".to_string());
            let result = client
                .connect(ConnectParams {
                    required_namespaces: required,
                    ..Default::default()
                })
                .await;
            assert!(matches!(result, Err(ClientError::UnsupportedNamespaces(_))));
        }

        #[tokio::test]
        async fn approval_grants_account_on_every_chain() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let session = settled(&client, "0xABCDEF").await;

            let accounts = &session.namespaces["eip155"].accounts;
            assert_eq!(
                accounts,
                &vec![
                    "eip155:1:0xABCDEF".to_string(),
                    "eip155:56:0xABCDEF".to_string(),
                    "eip155:137:0xABCDEF".to_string(),
                ]
            );
            assert_eq!(session.address().as_deref(), Some("0xABCDEF"));
            assert_eq!(session.peer.name, "Test Wallet");
            assert_eq!(client.session(&session.topic), Some(session));
        }

        #[tokio::test]
        async fn approve_unknown_proposal_fails() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let result = client
                .approve(ApproveParams {
                    id: 99,
                    namespaces: required_namespaces(),
                })
                .await;
            assert!(matches!(result, Err(ClientError::ProposalNotFound(99))));
        }

        #[tokio::test]
        async fn approve_must_cover_required_chains() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let pending = client.connect(connect_params()).await.unwrap();
            let peer = client.wallet_peer(wallet());
            let id = peer.pair(pending.uri.as_deref().unwrap(), "0xABC").unwrap();

            let mut partial = required_namespaces();
            partial.get_mut("eip155").unwrap().chains.truncate(1);
            let result = client
                .approve(ApproveParams {
                    id,
                    namespaces: partial,
                })
                .await;
            assert!(matches!(result, Err(ClientError::UnsupportedNamespaces(_))));
            assert!(client.sessions().is_empty());
        }

        #[tokio::test]
        async fn pair_unknown_uri_fails() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let peer = client.wallet_peer(wallet());
            let uri = PairingUri::generate().to_string();
            assert!(matches!(
                peer.pair(&uri, "0xABC"),
                Err(ClientError::PairingNotFound(_))
            ));
        }

        #[tokio::test]
        async fn reject_fails_pending_approval() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let pending = client.connect(connect_params()).await.unwrap();
            let peer = client.wallet_peer(wallet());

            peer.reject(pending.uri.as_deref().unwrap(), "user declined")
                .unwrap();

            assert_eq!(
                pending.approval.wait().await,
                Err(ClientError::Rejected("user declined".to_string()))
            );
        }

        #[tokio::test]
        async fn sessions_keep_creation_order() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let first = settled(&client, "0x01").await;
            let second = settled(&client, "0x02").await;

            let topics: Vec<_> = client.sessions().into_iter().map(|s| s.topic).collect();
            assert_eq!(topics, vec![first.topic, second.topic]);
        }
        #[tokio::test]
        async fn new_connect_supersedes_older_pairings() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let peer = client.wallet_peer(wallet());
            let first = client.connect(connect_params()).await.unwrap();
            let first_uri = first.uri.clone().unwrap();
            for _ in 0..99 {
                client.connect(connect_params()).await.unwrap();
            }

            assert_eq!(client.lock().pairings.len(), 1);
            assert!(matches!(
                first.approval.wait().await,
                Err(ClientError::Superseded(_))
            ));
            assert!(matches!(
                peer.pair(&first_uri, "0xABC"),
                Err(ClientError::PairingNotFound(_))
            ));
        }

        #[tokio::test]
        async fn latest_pairing_still_settles() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            client.connect(connect_params()).await.unwrap();
            let session = settled(&client, "0xLATEST").await;
            assert_eq!(session.address().as_deref(), Some("0xLATEST"));
            assert!(client.lock().pairings.is_empty());
        }
    }

    mod teardown {
        use super::*;

        #[tokio::test]
        async fn disconnect_records_reason() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let session = settled(&client, "0xABC").await;

            client
                .disconnect(DisconnectParams {
                    topic: session.topic.clone(),
                    reason: DisconnectReason::user_disconnected(),
                })
                .await
                .unwrap();

            assert!(client.sessions().is_empty());
            let reasons = client.wallet_peer(wallet()).disconnect_reasons();
            assert_eq!(
                reasons,
                vec![(session.topic, DisconnectReason::user_disconnected())]
            );
        }

        #[tokio::test]
        async fn disconnect_unknown_topic_fails() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let result = client
                .disconnect(DisconnectParams {
                    topic: SessionTopic::from("missing"),
                    reason: DisconnectReason::user_disconnected(),
                })
                .await;
            assert!(matches!(result, Err(ClientError::SessionNotFound(_))));
        }

        #[tokio::test]
        async fn wallet_delete_emits_event() {
            let client = LoopbackSignClient::init(options()).await.unwrap();
            let session = settled(&client, "0xABC").await;
            let mut events = client.subscribe();

            client
                .wallet_peer(wallet())
                .delete_session(&session.topic)
                .unwrap();

            match events.recv().await.unwrap() {
                ClientEvent::SessionDelete { topic, .. } => assert_eq!(topic, session.topic),
                other => panic!("unexpected event {other:?}"),
            }
            assert!(client.session(&session.topic).is_none());
        }

        #[test]
        fn listener_count_tracks_receivers() {
            let client = LoopbackSignClient::new(options()).unwrap();
            let rx = client.subscribe();
            assert_eq!(client.listener_count(), 1);
            drop(rx);
            assert_eq!(client.listener_count(), 0);
        }
    }
}
