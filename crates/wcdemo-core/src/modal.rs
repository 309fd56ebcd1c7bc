//! Wallet-picker modal adapter.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::config::{WalletConfig, RECOMMENDED_WALLET_IDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

/// Picker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalOptions {
    pub project_id: String,
    pub recommended_wallet_ids: Vec<String>,
    pub theme: Theme,
}

impl ModalOptions {
    /// Recommended wallets and dark theme.
    pub fn fixed(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            recommended_wallet_ids: RECOMMENDED_WALLET_IDS
                .iter()
                .map(|id| id.to_string())
                .collect(),
            theme: Theme::Dark,
        }
    }
}

/// A widget that shows a pairing URI to the user.
pub trait Modal: Send + Sync + Sized + 'static {
    fn create(options: ModalOptions) -> Self;

    /// Show the pairing URI.
    fn open(&self, uri: &str);

    /// Hide the modal. Closing a closed modal does nothing.
    fn close(&self);

    fn is_open(&self) -> bool;
}

/// Create the modal for `config`.
pub fn create<M: Modal>(config: &WalletConfig) -> M {
    M::create(ModalOptions::fixed(&config.project_id))
}

struct ModalInner {
    out: Box<dyn Write + Send>,
    uri: Option<String>,
}

/// Modal that prints to a terminal.
#[derive(Clone)]
pub struct TerminalModal {
    options: ModalOptions,
    inner: Arc<Mutex<ModalInner>>,
}

impl TerminalModal {
    /// Modal printing to `out` instead of stdout.
    pub fn with_writer(options: ModalOptions, out: Box<dyn Write + Send>) -> Self {
        Self {
            options,
            inner: Arc::new(Mutex::new(ModalInner { out, uri: None })),
        }
    }

    pub fn options(&self) -> &ModalOptions {
        &self.options
    }

    /// The URI currently shown, if open.
    pub fn current_uri(&self) -> Option<String> {
        self.lock().uri.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ModalInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Modal for TerminalModal {
    fn create(options: ModalOptions) -> Self {
        Self::with_writer(options, Box::new(std::io::stdout()))
    }

    fn open(&self, uri: &str) {
        let mut inner = self.lock();
        inner.uri = Some(uri.to_string());

        let theme = match self.options.theme {
            Theme::Dark => "dark",
            Theme::Light => "light",
        };
        let mut text = format!("┌─ Connect your wallet ({theme}) ─\n│ Scan or paste this URI in your wallet:\n│   {uri}\n");
        for id in &self.options.recommended_wallet_ids {
            text.push_str(&format!("│ Recommended wallet: {id}\n"));
        }
        text.push_str("└─\n");

        if let Err(e) = inner.out.write_all(text.as_bytes()).and_then(|_| inner.out.flush()) {
            log::warn!("Failed to render wallet modal: {}", e);
        }
    }

    fn close(&self) {
        let mut inner = self.lock();
        if inner.uri.take().is_none() {
            return;
        }
        if let Err(e) = writeln!(inner.out, "(wallet modal closed)") {
            log::warn!("Failed to render wallet modal: {}", e);
        }
    }

    fn is_open(&self) -> bool {
        self.lock().uri.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writer whose contents tests can read back.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn buffered_modal() -> (TerminalModal, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let modal = TerminalModal::with_writer(
            ModalOptions::fixed("0123456789abcdef0123456789abcdef"),
            Box::new(buffer.clone()),
        );
        (modal, buffer)
    }

    #[test]
    fn fixed_options_use_dark_theme_and_socios() {
        let options = ModalOptions::fixed("pid");
        assert_eq!(options.theme, Theme::Dark);
        assert_eq!(options.project_id, "pid");
        assert_eq!(
            options.recommended_wallet_ids,
            vec!["225affb176778569276e484e1b92637ad061b01e13a048b35a9d280c3b58970f"]
        );
    }

    #[test]
    fn create_uses_config_project_id() {
        let config = WalletConfig {
            project_id: "abc".to_string(),
            ..Default::default()
        };
        let modal: TerminalModal = create(&config);
        assert_eq!(modal.options().project_id, "abc");
        assert!(!modal.is_open());
    }

    #[test]
    fn open_renders_uri_and_wallets() {
        let (modal, buffer) = buffered_modal();
        modal.open("wc:abc@2?relay-protocol=irn&symKey=def");

        assert!(modal.is_open());
        assert_eq!(
            modal.current_uri().as_deref(),
            Some("wc:abc@2?relay-protocol=irn&symKey=def")
        );
        let text = buffer.contents();
        assert!(text.contains("wc:abc@2"));
        assert!(text.contains("225affb1"));
        assert!(text.contains("dark"));
    }

    #[test]
    fn close_is_idempotent() {
        let (modal, buffer) = buffered_modal();
        modal.open("wc:x");
        modal.close();
        modal.close();

        assert!(!modal.is_open());
        assert_eq!(buffer.contents().matches("closed").count(), 1);
    }

    #[test]
    fn clones_share_state() {
        let (modal, _buffer) = buffered_modal();
        let clone = modal.clone();
        modal.open("wc:x");
        assert!(clone.is_open());
    }
}
