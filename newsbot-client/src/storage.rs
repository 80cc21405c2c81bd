//! Persistent session storage.
//!
//! Two keys survive between runs: the bearer token and the JSON-serialized user record.
//! The transport reads the token on every request and clears both keys on a 401; the
//! session store writes them on login.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::models::UserProfile;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// String key/value store shared by the transport and the session store.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local storage, used by tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten on every change with 0600 permissions.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`. A missing file is an empty store; it is created on first write.
    /// A file that does not parse is treated as empty and replaced by the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session file {}", path.display()))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&contents) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "session file is corrupt; starting anonymous");
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "session storage opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
        }

        let contents = serde_json::to_string_pretty(entries).context("Failed to serialize session")?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    // Memory only changes once the new contents are on disk.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Token and user as persisted. Both keys must be present and the user must parse.
pub fn load_credentials(storage: &dyn SessionStorage) -> Option<(UserProfile, String)> {
    let token = storage.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
    let raw_user = storage.get(USER_KEY)?;
    match serde_json::from_str::<UserProfile>(&raw_user) {
        Ok(user) => Some((user, token)),
        Err(e) => {
            warn!(error = %e, "stored user record is unreadable; ignoring persisted session");
            None
        }
    }
}

pub fn persist_credentials(storage: &dyn SessionStorage, user: &UserProfile, token: &str) -> Result<()> {
    storage.set(TOKEN_KEY, token)?;
    persist_user(storage, user)
}

pub fn persist_user(storage: &dyn SessionStorage, user: &UserProfile) -> Result<()> {
    let raw = serde_json::to_string(user).context("Failed to serialize user record")?;
    storage.set(USER_KEY, &raw)
}

pub fn clear_credentials(storage: &dyn SessionStorage) -> Result<()> {
    storage.remove(TOKEN_KEY)?;
    storage.remove(USER_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn sample_user() -> UserProfile {
        UserProfile {
            id: 7,
            email: Some("reader@example.org".to_string()),
            role: Role::User,
            ..Default::default()
        }
    }

    #[test]
    fn credentials_require_both_keys() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "T").unwrap();
        assert!(load_credentials(&storage).is_none());

        persist_user(&storage, &sample_user()).unwrap();
        let (user, token) = load_credentials(&storage).expect("credentials");
        assert_eq!(user.id, 7);
        assert_eq!(token, "T");

        clear_credentials(&storage).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn garbage_user_record_is_ignored() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "T").unwrap();
        storage.set(USER_KEY, "{not json").unwrap();
        assert!(load_credentials(&storage).is_none());
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");

        let storage = FileStorage::open(&path).expect("open");
        assert!(storage.get(TOKEN_KEY).is_none());
        persist_credentials(&storage, &sample_user(), "secret-token").expect("persist");
        drop(storage);

        let reopened = FileStorage::open(&path).expect("reopen");
        let (user, token) = load_credentials(&reopened).expect("credentials");
        assert_eq!(user, sample_user());
        assert_eq!(token, "secret-token");

        clear_credentials(&reopened).expect("clear");
        let reopened = FileStorage::open(&path).expect("reopen after clear");
        assert!(reopened.get(TOKEN_KEY).is_none());
        assert!(reopened.get(USER_KEY).is_none());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"token": "T", "#).expect("write");

        let storage = FileStorage::open(&path).expect("open corrupt file");
        assert!(storage.get(TOKEN_KEY).is_none());
        assert!(load_credentials(&storage).is_none());

        persist_credentials(&storage, &sample_user(), "fresh").expect("persist");
        let reopened = FileStorage::open(&path).expect("reopen");
        assert_eq!(reopened.get(TOKEN_KEY).as_deref(), Some("fresh"));
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).expect("open");
        storage.set(TOKEN_KEY, "T").expect("set");

        // A directory in place of the file makes every write fail.
        fs::remove_file(&path).expect("remove");
        fs::create_dir(&path).expect("mkdir");

        assert!(storage.set(TOKEN_KEY, "U").is_err());
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("T"));
        assert!(storage.remove(TOKEN_KEY).is_err());
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("T"));
        assert_eq!(storage.path(), path.as_path());
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).expect("open");
        storage.set(TOKEN_KEY, "T").expect("set");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
