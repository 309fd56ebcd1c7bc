//! The wallet session: coordinator, listener lifecycle and state.
//!
//! One [`SessionCoordinator`] owns the protocol client and modal for as long
//! as it runs. Views read [`ConnectionState`] and trigger operations through a
//! [`WalletContext`](crate::context::WalletContext).

pub(crate) mod coordinator;
mod listener;
pub(crate) mod state;

pub use coordinator::SessionCoordinator;
pub use state::{ConnectionState, SessionTopic};
