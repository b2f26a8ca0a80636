use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use godisk_core::write_text_atomic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

/// Storage key holding the serialized session record.
pub const SESSION_STORAGE_KEY: &str = "godisk.session";

#[derive(Debug, Error)]
/// Enumerates supported `SessionStoreError` values.
pub enum SessionStoreError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write state file {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("state file {path} is not a JSON object: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable string key-value storage backing the session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionStoreError>;
    fn remove(&self, key: &str) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Clone)]
/// JSON object file of string entries, rewritten atomically on every change.
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, SessionStoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new())
            }
            Err(source) => {
                return Err(SessionStoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| SessionStoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionStoreError> {
        let mut encoded = serde_json::to_string_pretty(entries)?;
        encoded.push('\n');
        write_text_atomic(&self.path, &encoded).map_err(|error| SessionStoreError::Write {
            path: self.path.clone(),
            message: format!("{error:#}"),
        })
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionStoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), SessionStoreError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
/// In-process storage; contents vanish with the process.
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionStoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionStoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// The logged-in user and the partition they logged into.
pub struct Session {
    pub user: String,
    pub mount_id: String,
    pub is_root: bool,
}

impl Session {
    pub fn new(user: impl Into<String>, mount_id: impl Into<String>) -> Self {
        let user = user.into();
        let is_root = is_root_user(&user);
        Self {
            user,
            mount_id: mount_id.into(),
            is_root,
        }
    }
}

fn is_root_user(user: &str) -> bool {
    user.trim().eq_ignore_ascii_case("root")
}

// Partial or corrupt records count as no session.
fn decode_session(raw: &str) -> Option<Session> {
    let value = serde_json::from_str::<Value>(raw).ok()?;
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToOwned::to_owned)
    };
    let user = text("user")?;
    let mount_id = text("mountId")?;
    let is_root = value
        .get("isRoot")
        .and_then(Value::as_bool)
        .unwrap_or_else(|| is_root_user(&user));
    Some(Session {
        user,
        mount_id,
        is_root,
    })
}

/// Observable session state mirrored into a [`KeyValueStore`].
pub struct SessionStore {
    storage: Box<dyn KeyValueStore>,
    sender: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Builds the store and restores any persisted session.
    pub fn open(storage: Box<dyn KeyValueStore>) -> Self {
        let (sender, _) = watch::channel(None);
        let store = Self { storage, sender };
        store.restore();
        store
    }

    pub fn in_memory() -> Self {
        Self::open(Box::<MemoryKeyValueStore>::default())
    }

    pub fn get(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.sender.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }

    /// Publishes `session`, then persists it. Subscribers see the new session
    /// even when persistence fails.
    pub fn set(&self, session: Session) -> Result<(), SessionStoreError> {
        let encoded = serde_json::to_string(&session)?;
        self.sender.send_replace(Some(session));
        self.storage.set(SESSION_STORAGE_KEY, &encoded)
    }

    pub fn clear(&self) -> Result<(), SessionStoreError> {
        self.sender.send_replace(None);
        self.storage.remove(SESSION_STORAGE_KEY)
    }

    /// Re-reads storage and publishes whatever valid session it holds.
    pub fn restore(&self) -> Option<Session> {
        let restored = match self.storage.get(SESSION_STORAGE_KEY) {
            Ok(raw) => raw.as_deref().and_then(decode_session),
            Err(error) => {
                tracing::warn!(error = %error, "session restore failed; starting logged out");
                None
            }
        };
        self.sender.send_replace(restored.clone());
        restored
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{
        decode_session, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, Session,
        SessionStore, SESSION_STORAGE_KEY,
    };

    #[test]
    fn unit_session_flags_root_user() {
        assert!(Session::new("root", "391A").is_root);
        assert!(!Session::new("ana", "391A").is_root);
    }

    #[test]
    fn regression_root_detection_ignores_case() {
        assert!(Session::new("ROOT", "391A").is_root);
        assert!(Session::new("Root", "391A").is_root);
        assert_eq!(
            decode_session(r#"{"user":"Root","mountId":"391A"}"#).map(|session| session.is_root),
            Some(true)
        );
        assert!(!Session::new("rooted", "391A").is_root);
    }

    #[test]
    fn unit_decode_session_rejects_partial_or_corrupt_records() {
        assert_eq!(
            decode_session(r#"{"user":"root","mountId":"391A","isRoot":true}"#),
            Some(Session::new("root", "391A"))
        );
        assert_eq!(decode_session(r#"{"user":"root"}"#), None);
        assert_eq!(decode_session(r#"{"user":"","mountId":"391A"}"#), None);
        assert_eq!(decode_session("{not json"), None);
    }

    #[test]
    fn functional_file_store_survives_simulated_reload() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state").join("storage.json");

        let store = SessionStore::open(Box::new(FileKeyValueStore::new(&path)));
        assert_eq!(store.get(), None);
        store
            .set(Session::new("ana", "391A"))
            .expect("persist session");

        let reloaded = SessionStore::open(Box::new(FileKeyValueStore::new(&path)));
        assert_eq!(reloaded.get(), Some(Session::new("ana", "391A")));

        reloaded.clear().expect("clear session");
        let after_logout = SessionStore::open(Box::new(FileKeyValueStore::new(&path)));
        assert_eq!(after_logout.get(), None);
    }

    #[test]
    fn functional_file_store_keeps_unrelated_keys() {
        let dir = tempdir().expect("tempdir");
        let store = FileKeyValueStore::new(dir.path().join("storage.json"));
        store.set("theme", "dark").expect("set theme");
        store.set(SESSION_STORAGE_KEY, "{}").expect("set session");
        store.remove(SESSION_STORAGE_KEY).expect("remove session");
        assert_eq!(store.get("theme").expect("get"), Some("dark".to_string()));
        assert_eq!(store.get(SESSION_STORAGE_KEY).expect("get"), None);
    }

    #[test]
    fn regression_corrupt_storage_restores_as_logged_out() {
        let storage = MemoryKeyValueStore::default();
        storage
            .set(SESSION_STORAGE_KEY, r#"{"mountId":"391A"}"#)
            .expect("seed");
        let store = SessionStore::open(Box::new(storage));
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn functional_subscribers_observe_login_and_logout() {
        let store = SessionStore::in_memory();
        let mut receiver = store.subscribe();
        store.set(Session::new("root", "391A")).expect("set");
        receiver.changed().await.expect("changed");
        assert_eq!(receiver.borrow_and_update().clone(), Some(Session::new("root", "391A")));
        store.clear().expect("clear");
        receiver.changed().await.expect("changed");
        assert_eq!(*receiver.borrow_and_update(), None);
    }
}
