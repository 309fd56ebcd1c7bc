//! Application configuration and fixed negotiation parameters.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable holding the WalletConnect Cloud project id.
pub const PROJECT_ID_ENV: &str = "WALLETCONNECT_PROJECT_ID";

/// The only namespace this application negotiates.
pub const REQUIRED_NAMESPACE: &str = "eip155";

/// Ethereum mainnet, BNB Smart Chain, Polygon.
pub const REQUIRED_CHAINS: &[&str] = &["eip155:1", "eip155:56", "eip155:137"];

pub const REQUIRED_METHODS: &[&str] = &[
    "eth_sendTransaction",
    "eth_signTransaction",
    "eth_sign",
    "personal_sign",
    "eth_signTypedData",
];

pub const REQUIRED_EVENTS: &[&str] = &["chainChanged", "accountsChanged"];

/// Wallets pinned at the top of the picker (Socios.com).
pub const RECOMMENDED_WALLET_IDS: &[&str] =
    &["225affb176778569276e484e1b92637ad061b01e13a048b35a9d280c3b58970f"];

/// Metadata announced to wallets during pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icons: Vec<String>,
}

impl AppMetadata {
    /// The static metadata of this application.
    pub fn fixed() -> Self {
        Self {
            name: "Parc des Princes".to_string(),
            description: "Connect with Socios".to_string(),
            url: "https://socios.com".to_string(),
            icons: vec!["https://socios.com/favicon.ico".to_string()],
        }
    }
}

/// Runtime configuration for the wallet session.
#[derive(Debug, Clone, Default)]
pub struct WalletConfig {
    /// WalletConnect Cloud project id. Empty when not configured.
    pub project_id: String,
    /// File where the client persists its sessions.
    pub storage_path: Option<PathBuf>,
    /// Directory for the diagnostic trace log.
    pub log_dir: Option<PathBuf>,
}

impl WalletConfig {
    /// Create a builder.
    pub fn builder() -> WalletConfigBuilder {
        WalletConfigBuilder::default()
    }

    /// Read the project id from `WALLETCONNECT_PROJECT_ID`.
    ///
    /// A missing id is logged and left empty; client initialization will
    /// reject it later.
    pub fn from_env() -> Self {
        let project_id = env::var(PROJECT_ID_ENV).unwrap_or_default();
        let config = Self {
            project_id,
            ..Default::default()
        };
        config.warn_if_missing_project_id();
        config
    }

    pub fn has_project_id(&self) -> bool {
        !self.project_id.trim().is_empty()
    }

    pub(crate) fn warn_if_missing_project_id(&self) {
        if !self.has_project_id() {
            log::warn!(
                "WalletConnect project id is missing. Set {} (get one at https://cloud.walletconnect.com)",
                PROJECT_ID_ENV
            );
        }
    }
}

/// Builder for [`WalletConfig`].
#[derive(Default)]
pub struct WalletConfigBuilder {
    project_id: Option<String>,
    storage_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
}

impl WalletConfigBuilder {
    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    pub fn storage_path(mut self, path: PathBuf) -> Self {
        self.storage_path = Some(path);
        self
    }

    pub fn log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    /// Build the config, falling back to the environment for the project id.
    pub fn build(self) -> WalletConfig {
        let project_id = self
            .project_id
            .or_else(|| env::var(PROJECT_ID_ENV).ok())
            .unwrap_or_default();
        let config = WalletConfig {
            project_id,
            storage_path: self.storage_path,
            log_dir: self.log_dir,
        };
        config.warn_if_missing_project_id();
        config
    }
}
