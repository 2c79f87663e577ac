//! Locally persisted session state (credentials and the bootstrap role hint).

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keys the resolver reads and purges.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKey {
    /// Bearer credential sent to the identity endpoint.
    #[serde(rename = "token")]
    AccessToken,
    #[serde(rename = "refresh_token")]
    RefreshToken,
    /// Role recorded at login, used only for optimistic rendering.
    #[serde(rename = "user_role")]
    RoleHint,
}

impl SessionKey {
    pub const ALL: [SessionKey; 3] = [
        SessionKey::AccessToken,
        SessionKey::RefreshToken,
        SessionKey::RoleHint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::AccessToken => "token",
            SessionKey::RefreshToken => "refresh_token",
            SessionKey::RoleHint => "user_role",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("session storage lock poisoned")]
    Poisoned,
}

/// Key/value storage for session artifacts.
pub trait SessionStorage: Send + Sync + core::fmt::Debug {
    fn get(&self, key: SessionKey) -> Option<String>;
    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: SessionKey) -> Result<(), SessionError>;

    /// Remove every session key.
    fn clear(&self) -> Result<(), SessionError> {
        for key in SessionKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

impl<S> SessionStorage for Arc<S>
where
    S: SessionStorage + ?Sized,
{
    fn get(&self, key: SessionKey) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: SessionKey) -> Result<(), SessionError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

/// In-memory session storage for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySessionStorage {
    inner: RwLock<HashMap<SessionKey, String>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor holding just an access token.
    pub fn with_token(token: &str) -> Self {
        let storage = Self::new();
        if let Ok(mut map) = storage.inner.write() {
            map.insert(SessionKey::AccessToken, token.to_string());
        }
        storage
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().map(|m| m.is_empty()).unwrap_or(true)
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn get(&self, key: SessionKey) -> Option<String> {
        let map = self.inner.read().ok()?;
        map.get(&key).cloned()
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionError> {
        let mut map = self.inner.write().map_err(|_| SessionError::Poisoned)?;
        map.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<(), SessionError> {
        let mut map = self.inner.write().map_err(|_| SessionError::Poisoned)?;
        map.remove(&key);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut map = self.inner.write().map_err(|_| SessionError::Poisoned)?;
        map.clear();
        Ok(())
    }
}

/// Session storage persisted as a JSON object in a single file.
///
/// Keys use their persisted names (`token`, `refresh_token`, `user_role`);
/// unrelated keys already in the file are left alone. A missing file is an
/// empty session. Writes go to a private (mode `0600` on Unix) sibling temp
/// file that is renamed over the target, so readers never see a half-written
/// file and other local users cannot read the credential.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: RwLock<()>,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, SessionError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if data.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&data).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn store(&self, map: &HashMap<String, String>) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let data = serde_json::to_string_pretty(map).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.temp_path();
        let written = write_private(&tmp, data.as_bytes()).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(source) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(source));
        }
        Ok(())
    }

    /// Per-writer sibling temp file, so concurrent writers never share one.
    fn temp_path(&self) -> PathBuf {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let seq = NEXT.fetch_add(1, Ordering::Relaxed);
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(format!(".{}.{seq}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }

    fn update<F>(&self, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self.lock.write().map_err(|_| SessionError::Poisoned)?;
        let mut map = self.load()?;
        f(&mut map);
        self.store(&map)
    }
}

/// Create `path` readable by the owner only, then write `data` to it.
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

impl SessionStorage for FileSessionStorage {
    fn get(&self, key: SessionKey) -> Option<String> {
        let _guard = self.lock.read().ok()?;
        match self.load() {
            Ok(mut map) => map.remove(key.as_str()),
            Err(err) => {
                tracing::warn!("failed to read session file: {err}");
                None
            }
        }
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionError> {
        self.update(|map| {
            map.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: SessionKey) -> Result<(), SessionError> {
        self.update(|map| {
            map.remove(key.as_str());
        })
    }

    fn clear(&self) -> Result<(), SessionError> {
        let _guard = self.lock.write().map_err(|_| SessionError::Poisoned)?;
        let mut map = match self.load() {
            Ok(map) => map,
            // A corrupt session must still be purgeable.
            Err(SessionError::Corrupt { .. }) => HashMap::new(),
            Err(err) => return Err(err),
        };
        for key in SessionKey::ALL {
            map.remove(key.as_str());
        }

        if !map.is_empty() {
            return self.store(&map);
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
