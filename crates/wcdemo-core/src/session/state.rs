//! Coordinator state.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::namespaces::truncate_address;

/// Opaque session identifier issued by the protocol client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionTopic(pub String);

impl SessionTopic {
    /// 32 random bytes, hex encoded.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionTopic {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for SessionTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locally cached projection of the wallet session.
///
/// `Connected` carries the topic and the full address, so a topic is tracked
/// exactly when the state is connected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ConnectionState {
    #[default]
    Loading,
    Disconnected,
    Connected {
        topic: SessionTopic,
        address: String,
    },
}

impl ConnectionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn topic(&self) -> Option<&SessionTopic> {
        match self {
            Self::Connected { topic, .. } => Some(topic),
            _ => None,
        }
    }

    /// Full address, empty unless connected.
    pub fn address(&self) -> &str {
        match self {
            Self::Connected { address, .. } => address,
            _ => "",
        }
    }

    /// Address shortened for display.
    pub fn display_address(&self) -> String {
        truncate_address(self.address())
    }
}
