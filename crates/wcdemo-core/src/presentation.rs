//! Connect button rendering.
//!
//! The view is a pure function of [`ConnectionState`]; it holds no state of
//! its own. [`press`] wires a click to the matching coordinator operation.

use std::fmt;

use crate::context::WalletContext;
use crate::error::ContextError;
use crate::session::ConnectionState;

/// What clicking the button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Connect,
    Disconnect,
}

/// The rendered connect button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonView {
    /// Disabled placeholder while initializing.
    Loading,
    /// Truncated address plus a disconnect control.
    Connected { display_address: String },
    /// A single connect control.
    Disconnected,
}

impl ButtonView {
    pub fn from_state(state: &ConnectionState) -> Self {
        match state {
            ConnectionState::Loading => Self::Loading,
            ConnectionState::Connected { .. } => Self::Connected {
                display_address: state.display_address(),
            },
            ConnectionState::Disconnected => Self::Disconnected,
        }
    }

    /// Button label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "Loading...",
            Self::Connected { .. } => "Disconnect",
            Self::Disconnected => "Connect Wallet",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    pub fn action(&self) -> Option<Action> {
        match self {
            Self::Loading => None,
            Self::Connected { .. } => Some(Action::Disconnect),
            Self::Disconnected => Some(Action::Connect),
        }
    }
}

impl fmt::Display for ButtonView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "[ {} ] (disabled)", self.label()),
            Self::Connected { display_address } => {
                write!(f, "Connected: {}  [ {} ]", display_address, self.label())
            }
            Self::Disconnected => write!(f, "[ {} ]", self.label()),
        }
    }
}

/// Click the button as currently rendered for `ctx`.
///
/// Returns the action that ran, `None` while the button is disabled.
pub async fn press(ctx: &WalletContext) -> Result<Option<Action>, ContextError> {
    let action = ButtonView::from_state(&ctx.state()).action();
    match action {
        Some(Action::Connect) => ctx.connect().await?,
        Some(Action::Disconnect) => ctx.disconnect().await?,
        None => {}
    }
    Ok(action)
}
