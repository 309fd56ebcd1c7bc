//! Dispatches interactive commands to the button and the loopback wallet.

use std::ops::ControlFlow;

use wcdemo_core::config::AppMetadata;
use wcdemo_core::error::ContextError;
use wcdemo_core::presentation::{self, ButtonView};
use wcdemo_core::{TerminalModal, WalletContext, WalletPeer};

use crate::commands::{Command, HELP};

/// Metadata the loopback wallet presents when it approves a session.
pub fn wallet_metadata() -> AppMetadata {
    AppMetadata {
        name: "Loopback Wallet".to_string(),
        description: "In-process wallet for the WalletConnect demo".to_string(),
        url: "https://walletconnect.com".to_string(),
        icons: Vec::new(),
    }
}

pub struct App {
    ctx: WalletContext,
    modal: TerminalModal,
    /// Absent when the client failed to initialize.
    wallet: Option<WalletPeer>,
}

impl App {
    pub fn new(ctx: WalletContext, modal: TerminalModal, wallet: Option<WalletPeer>) -> Self {
        Self { ctx, modal, wallet }
    }

    pub fn view(&self) -> ButtonView {
        ButtonView::from_state(&self.ctx.state())
    }

    pub async fn dispatch(&self, command: Command) -> ControlFlow<()> {
        let result = match command {
            Command::Quit => return ControlFlow::Break(()),
            Command::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Command::Status => {
                println!("{}", self.view());
                Ok(())
            }
            Command::Click => presentation::press(&self.ctx).await.map(|action| {
                if action.is_none() {
                    println!("(button is disabled)");
                }
            }),
            Command::Connect => self.ctx.connect().await,
            Command::Disconnect => self.ctx.disconnect().await,
            Command::WalletPair { address, uri } => {
                self.on_wallet(uri, |wallet, uri| wallet.pair(uri, &address).map(drop));
                Ok(())
            }
            Command::WalletReject { uri } => {
                self.on_wallet(uri, |wallet, uri| {
                    wallet.reject(uri, "User rejected the request")
                });
                Ok(())
            }
            Command::WalletDelete => {
                match (&self.wallet, self.ctx.state().topic()) {
                    (Some(wallet), Some(topic)) => {
                        if let Err(e) = wallet.delete_session(topic) {
                            log::warn!("Wallet could not delete session: {}", e);
                        }
                    }
                    (None, _) => println!("(no wallet available)"),
                    (_, None) => println!("(no session to delete)"),
                }
                Ok(())
            }
        };

        match result {
            Ok(()) => ControlFlow::Continue(()),
            Err(ContextError::Detached) => {
                log::error!("Session coordinator is gone");
                ControlFlow::Break(())
            }
        }
    }

    fn on_wallet<F, E>(&self, uri: Option<String>, action: F)
    where
        F: FnOnce(&WalletPeer, &str) -> Result<(), E>,
        E: std::fmt::Display,
    {
        let Some(wallet) = &self.wallet else {
            println!("(no wallet available)");
            return;
        };
        let Some(uri) = uri.or_else(|| self.modal.current_uri()) else {
            println!("(no pairing URI; run `connect` first or pass one)");
            return;
        };
        if let Err(e) = action(wallet, &uri) {
            log::warn!("Wallet action failed: {}", e);
        }
    }
}
