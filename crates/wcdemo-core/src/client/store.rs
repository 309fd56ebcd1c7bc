//! Client-side session storage.
//!
//! Sessions live in a single JSON file. Saves use write-then-rename so a
//! crash never leaves a truncated file behind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::Session;

/// Error type for session storage.
#[derive(Debug)]
pub enum StoreError {
    /// IO error
    Io(std::io::Error),
    /// JSON error
    Json(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {e}"),
            StoreError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    sessions: Vec<Session>,
}

/// JSON file holding the client's sessions in creation order.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all stored sessions from `{ "sessions": [...] }`.
    ///
    /// A missing or empty file is an empty store.
    pub fn load(&self) -> Result<Vec<Session>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: SessionFile = serde_json::from_str(&contents)?;
        Ok(file.sessions)
    }

    /// Replace the stored sessions.
    pub fn save(&self, sessions: &[Session]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&SessionFile {
            sessions: sessions.to_vec(),
        })?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppMetadata;
    use crate::namespaces::{SessionNamespace, SessionNamespaces};
    use crate::session::SessionTopic;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn session(topic: &str) -> Session {
        let mut namespaces = SessionNamespaces::new();
        namespaces.insert(
            "eip155".to_string(),
            SessionNamespace {
                accounts: vec![format!("eip155:1:0x{topic}")],
                ..Default::default()
            },
        );
        Session {
            topic: SessionTopic::from(topic),
            namespaces,
            peer: AppMetadata::fixed(),
            expiry: Utc::now() + Duration::days(7),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_keeps_order() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));

        store.save(&[session("a"), session("b")]).unwrap();
        let loaded = store.load().unwrap();

        let topics: Vec<_> = loaded.iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(topics, vec!["a", "b"]);
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested/deeper/sessions.json"));
        store.save(&[session("a")]).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));
        store.save(&[session("a")]).unwrap();
        assert!(!dir.path().join("sessions.json.tmp").exists());
    }

    #[test]
    fn bare_array_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, serde_json::to_string(&vec![session("bare")]).unwrap()).unwrap();

        assert!(matches!(
            SessionStore::new(path).load(),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "{ not json").unwrap();

        let result = SessionStore::new(path).load();
        assert!(matches!(result, Err(StoreError::Json(_))));
    }
}
