//! Namespace types and account helpers.
//!
//! A namespace groups the chains, methods and events negotiated together for
//! one blockchain family (e.g. `eip155`). Proposals carry the namespaces the
//! application requires; settled sessions carry the accounts the wallet
//! granted for each namespace.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{REQUIRED_CHAINS, REQUIRED_EVENTS, REQUIRED_METHODS, REQUIRED_NAMESPACE};

/// Namespace requested in a session proposal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProposalNamespace {
    pub chains: Vec<String>,
    pub methods: Vec<String>,
    pub events: Vec<String>,
}

/// Namespace granted in a settled session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionNamespace {
    /// CAIP-10 account ids (`<namespace>:<chainId>:<address>`).
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

/// Namespaces keyed by namespace name.
pub type ProposalNamespaces = BTreeMap<String, ProposalNamespace>;

/// Granted namespaces keyed by namespace name.
pub type SessionNamespaces = BTreeMap<String, SessionNamespace>;

/// The fixed required-namespace set sent with every proposal.
pub fn required_namespaces() -> ProposalNamespaces {
    let mut namespaces = ProposalNamespaces::new();
    namespaces.insert(
        REQUIRED_NAMESPACE.to_string(),
        ProposalNamespace {
            chains: REQUIRED_CHAINS.iter().map(|c| c.to_string()).collect(),
            methods: REQUIRED_METHODS.iter().map(|m| m.to_string()).collect(),
            events: REQUIRED_EVENTS.iter().map(|e| e.to_string()).collect(),
        },
    );
    namespaces
}

/// First account across all namespaces' account lists.
pub fn first_account(namespaces: &SessionNamespaces) -> Option<&str> {
    namespaces
        .values()
        .flat_map(|ns| ns.accounts.iter())
        .map(String::as_str)
        .next()
}

/// Trailing colon-delimited segment of an account id.
///
/// `"eip155:1:0xabc"` yields `"0xabc"`. A value without colons is returned
/// unchanged.
pub fn address_from_account(account: &str) -> &str {
    account.rsplit(':').next().unwrap_or(account)
}

/// Address of the first account in `namespaces`, if any.
pub fn extract_address(namespaces: &SessionNamespaces) -> Option<String> {
    first_account(namespaces)
        .map(address_from_account)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
}

/// Shorten an address for display: first 6 and last 4 characters.
///
/// Addresses of 10 characters or fewer are returned whole.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// A parsed CAIP-10 account id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountId {
    pub namespace: String,
    pub reference: String,
    pub address: String,
}

impl AccountId {
    /// Build an account id from a CAIP-2 chain id (`eip155:1`) and an address.
    pub fn for_chain(chain: &str, address: &str) -> Option<Self> {
        let (namespace, reference) = chain.split_once(':')?;
        if namespace.is_empty() || reference.is_empty() || address.is_empty() {
            return None;
        }
        Some(Self {
            namespace: namespace.to_string(),
            reference: reference.to_string(),
            address: address.to_string(),
        })
    }

    /// Parse `<namespace>:<reference>:<address>`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.splitn(3, ':');
        let namespace = parts.next()?;
        let reference = parts.next()?;
        let address = parts.next()?;
        Self::for_chain(&format!("{namespace}:{reference}"), address)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.reference, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted(accounts: &[&str]) -> SessionNamespaces {
        let mut namespaces = SessionNamespaces::new();
        namespaces.insert(
            "eip155".to_string(),
            SessionNamespace {
                accounts: accounts.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            },
        );
        namespaces
    }

    mod required {
        use super::*;

        #[test]
        fn contains_only_eip155() {
            let namespaces = required_namespaces();
            assert_eq!(namespaces.len(), 1);
            assert!(namespaces.contains_key("eip155"));
        }

        #[test]
        fn lists_three_chains() {
            let ns = &required_namespaces()["eip155"];
            assert_eq!(ns.chains, vec!["eip155:1", "eip155:56", "eip155:137"]);
        }

        #[test]
        fn lists_methods_and_events() {
            let ns = &required_namespaces()["eip155"];
            assert_eq!(ns.methods.len(), 5);
            assert!(ns.methods.contains(&"personal_sign".to_string()));
            assert!(ns.methods.contains(&"eth_signTypedData".to_string()));
            assert_eq!(ns.events, vec!["chainChanged", "accountsChanged"]);
        }

        #[test]
        fn serializes_with_expected_keys() {
            let json = serde_json::to_value(required_namespaces()).unwrap();
            assert!(json["eip155"]["chains"].is_array());
            assert!(json["eip155"]["methods"].is_array());
            assert!(json["eip155"]["events"].is_array());
        }
    }

    mod addresses {
        use super::*;

        #[test]
        fn extracts_trailing_segment() {
            assert_eq!(address_from_account("eip155:1:0xABCDEF"), "0xABCDEF");
        }

        #[test]
        fn value_without_colons_is_unchanged() {
            assert_eq!(address_from_account("0xABCDEF"), "0xABCDEF");
        }

        #[test]
        fn extract_uses_first_account() {
            let namespaces = granted(&["eip155:1:0xFIRST", "eip155:56:0xSECOND"]);
            assert_eq!(extract_address(&namespaces).as_deref(), Some("0xFIRST"));
        }

        #[test]
        fn extract_skips_empty_namespaces() {
            let mut namespaces = granted(&["eip155:137:0xPOLY"]);
            namespaces.insert("cosmos".to_string(), SessionNamespace::default());
            assert_eq!(extract_address(&namespaces).as_deref(), Some("0xPOLY"));
        }

        #[test]
        fn extract_returns_none_without_accounts() {
            assert!(extract_address(&granted(&[])).is_none());
            assert!(extract_address(&SessionNamespaces::new()).is_none());
        }

        #[test]
        fn extract_rejects_trailing_colon() {
            assert!(extract_address(&granted(&["eip155:1:"])).is_none());
        }
    }

    mod truncation {
        use super::*;

        #[test]
        fn keeps_first_six_and_last_four() {
            assert_eq!(truncate_address("0x1234567890abcdef1234"), "0x1234...1234");
        }

        #[test]
        fn short_address_is_unchanged() {
            assert_eq!(truncate_address("0x12345678"), "0x12345678");
            assert_eq!(truncate_address(""), "");
        }

        #[test]
        fn eleven_characters_are_truncated() {
            assert_eq!(truncate_address("0x123456789"), "0x1234...6789");
        }
    }

    mod account_id {
        use super::*;

        #[test]
        fn parse_splits_three_parts() {
            let id = AccountId::parse("eip155:56:0xabc").unwrap();
            assert_eq!(id.namespace, "eip155");
            assert_eq!(id.reference, "56");
            assert_eq!(id.address, "0xabc");
        }

        #[test]
        fn parse_rejects_missing_parts() {
            assert!(AccountId::parse("eip155:1").is_none());
            assert!(AccountId::parse("eip155::0xabc").is_none());
        }

        #[test]
        fn for_chain_formats_caip10() {
            let id = AccountId::for_chain("eip155:137", "0xabc").unwrap();
            assert_eq!(id.to_string(), "eip155:137:0xabc");
        }

        #[test]
        fn for_chain_rejects_bad_chain() {
            assert!(AccountId::for_chain("eip155", "0xabc").is_none());
            assert!(AccountId::for_chain("eip155:1", "").is_none());
        }
    }
}
