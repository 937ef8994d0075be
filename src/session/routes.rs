//! Route classification and current location

use std::sync::RwLock;

/// Which routes are reachable without a session, where a forced logout
/// lands, and where the UI currently is.
pub struct Routes {
    public: Vec<String>,
    entry: String,
    current: RwLock<String>,
}

impl Routes {
    pub fn new(public: Vec<String>, entry: impl Into<String>) -> Self {
        let entry = entry.into();
        Self {
            public: public.iter().map(|p| normalize(p)).collect(),
            current: RwLock::new(entry.clone()),
            entry,
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(path);
        self.public.iter().any(|p| *p == path)
    }

    pub fn entry_path(&self) -> &str {
        &self.entry
    }

    pub fn current(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_current(&self, path: &str) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = path.to_string();
    }

    pub fn is_current_public(&self) -> bool {
        self.is_public(&self.current())
    }
}

/// Drop query/fragment and trailing slashes; the root stays `/`.
pub(crate) fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
