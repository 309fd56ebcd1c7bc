//! # wcdemo-core
//!
//! Core logic of the WalletConnect demo: a single "connect wallet" control
//! backed by a v2 sign client and a pairing modal.
//!
//! The crate is front-end agnostic and can be driven by:
//! - the `wcdemo` terminal binary
//! - any other view that renders [`ButtonView`] from a [`WalletContext`]
//!
//! ## Key Concepts
//!
//! - **Session**: An approved connection between this app and a wallet
//! - **Proposal**: A pending request for a session, shown as a pairing URI
//! - **ConnectionState**: Loading, Disconnected or Connected with an address

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod event_bus;
pub mod logging;
pub mod modal;
pub mod namespaces;
pub mod presentation;
pub mod session;

// Re-export commonly used types
pub use client::{LoopbackSignClient, SignClient, WalletPeer};
pub use config::WalletConfig;
pub use context::WalletContext;
pub use modal::{Modal, TerminalModal};
pub use presentation::ButtonView;
pub use session::{ConnectionState, SessionCoordinator, SessionTopic};
