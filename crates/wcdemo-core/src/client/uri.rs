//! Pairing URI format.
//!
//! ```text
//! wc:<topic>@2?relay-protocol=irn&symKey=<hex>
//! ```

use rand::RngCore;
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

pub const PROTOCOL_VERSION: u32 = 2;
pub const RELAY_PROTOCOL: &str = "irn";

/// A parsed `wc:` pairing URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingUri {
    pub topic: String,
    pub version: u32,
    pub relay_protocol: String,
    pub sym_key: String,
}

impl PairingUri {
    /// Fresh pairing with a random topic and symmetric key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut topic = [0u8; 32];
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut topic);
        rng.fill_bytes(&mut key);
        Self {
            topic: hex::encode(topic),
            version: PROTOCOL_VERSION,
            relay_protocol: RELAY_PROTOCOL.to_string(),
            sym_key: hex::encode(key),
        }
    }
}

impl fmt::Display for PairingUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wc:{}@{}?relay-protocol={}&symKey={}",
            self.topic, self.version, self.relay_protocol, self.sym_key
        )
    }
}

/// Topics and symmetric keys are 32 bytes, hex encoded.
fn is_key_32(value: &str) -> bool {
    hex::decode(value).map_or(false, |bytes| bytes.len() == 32)
}

impl FromStr for PairingUri {
    type Err = ClientError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ClientError::InvalidUri(format!("{reason}: {value}"));

        let rest = value
            .trim()
            .strip_prefix("wc:")
            .ok_or_else(|| invalid("missing wc: scheme"))?;
        let (path, query) = rest.split_once('?').ok_or_else(|| invalid("missing query"))?;
        let (topic, version) = path.split_once('@').ok_or_else(|| invalid("missing version"))?;

        let version: u32 = version.parse().map_err(|_| invalid("bad version"))?;
        if version != PROTOCOL_VERSION {
            return Err(invalid("unsupported version"));
        }
        if !is_key_32(topic) {
            return Err(invalid("bad topic"));
        }

        let mut relay_protocol = None;
        let mut sym_key = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("relay-protocol", v)) => relay_protocol = Some(v.to_string()),
                Some(("symKey", v)) => sym_key = Some(v.to_string()),
                _ => {}
            }
        }

        let sym_key = sym_key
            .filter(|k| is_key_32(k))
            .ok_or_else(|| invalid("bad symKey"))?;
        let relay_protocol = relay_protocol.ok_or_else(|| invalid("missing relay-protocol"))?;

        Ok(Self {
            topic: topic.to_string(),
            version,
            relay_protocol,
            sym_key,
        })
    }
}
