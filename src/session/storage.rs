//! Session-scoped key-value storage
//!
//! The session core never touches the filesystem directly. Everything it
//! persists (token mirror, cached profile fields, logout reason, refresh
//! cookie) goes through [`SessionStorage`], so the same logic runs against an
//! in-memory map in tests and a private file in the CLI.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Storage keys shared by the session components.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const LOGOUT_REASON: &str = "logoutReason";
    pub const COOKIES: &str = "cookies";
}

/// Port for persisted session state. All operations are total.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Volatile storage, used by tests and as a fallback when no data
/// directory is available.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(key);
    }
}

/// Write-through TOML file storage.
///
/// The whole map is rewritten on every mutation. Write failures are logged
/// and swallowed; the in-memory copy stays authoritative for this process.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse session file {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        if let Err(e) = self.write_file(entries) {
            tracing::warn!("Failed to persist session state: {:#}", e);
        }
    }

    fn write_file(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("Failed to create session directory")?;
        }

        let content = toml::to_string(entries).context("Failed to serialize session state")?;
        fs::write(&self.path, content).context("Failed to write session file")?;

        // Session file holds bearer tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms)
                .context("Failed to set session file permissions")?;
        }

        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard);
    }

    fn remove(&self, key: &str) {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if guard.remove(key).is_some() {
            self.persist(&guard);
        }
    }
}
