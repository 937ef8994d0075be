//! Cached user profile fields
//!
//! A denormalized copy of the profile carried by the last login/refresh
//! response. Not authoritative: it drives display and the bootstrapper's
//! "was somebody logged in here" check, nothing else.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::storage::SessionStorage;

const NAME: &str = "nombre";
const ROLE: &str = "rol";
const EMAIL: &str = "email";
const NATIONAL_ID: &str = "dni";
const LEVEL: &str = "nivelAlumno";
const GRADE: &str = "gradoAlumno";

/// Storage keys (and response field names) of the cached profile.
pub const PROFILE_KEYS: [&str; 6] = [NAME, ROLE, EMAIL, NATIONAL_ID, LEVEL, GRADE];

/// Platform role, as far as the client cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Teacher,
    Student,
}

impl Role {
    /// Parse the backend's role string. Accepts the Spanish and English
    /// spellings the backend has used.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "admin" | "administrador" | "administrator" => Some(Role::Administrator),
            "docente" | "profesor" | "teacher" => Some(Role::Teacher),
            "alumno" | "estudiante" | "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Landing route of the role's dashboard.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Administrator => "/admin",
            Role::Teacher => "/docente",
            Role::Student => "/alumno",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProfile {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub level: Option<String>,
    pub grade: Option<String>,
}

impl SessionProfile {
    /// Pick the profile fields out of a login/refresh response body.
    /// Numeric fields (grade, level) are stringified.
    pub fn from_response(body: &Value) -> Self {
        Self {
            name: field_string(body, NAME),
            role: field_string(body, ROLE),
            email: field_string(body, EMAIL),
            national_id: field_string(body, NATIONAL_ID),
            level: field_string(body, LEVEL),
            grade: field_string(body, GRADE),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }

    pub fn parsed_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }

    fn fields(&self) -> [(&'static str, &Option<String>); 6] {
        [
            (NAME, &self.name),
            (ROLE, &self.role),
            (EMAIL, &self.email),
            (NATIONAL_ID, &self.national_id),
            (LEVEL, &self.level),
            (GRADE, &self.grade),
        ]
    }
}

fn field_string(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Persisted mirror of [`SessionProfile`].
pub struct ProfileCache {
    storage: Arc<dyn SessionStorage>,
}

impl ProfileCache {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Replace the cached profile. An empty profile (a response without any
    /// profile fields) leaves the cache untouched.
    pub fn store(&self, profile: &SessionProfile) {
        if profile.is_empty() {
            return;
        }
        for (key, value) in profile.fields() {
            match value {
                Some(v) => self.storage.set(key, v),
                None => self.storage.remove(key),
            }
        }
    }

    pub fn load(&self) -> SessionProfile {
        SessionProfile {
            name: self.storage.get(NAME),
            role: self.storage.get(ROLE),
            email: self.storage.get(EMAIL),
            national_id: self.storage.get(NATIONAL_ID),
            level: self.storage.get(LEVEL),
            grade: self.storage.get(GRADE),
        }
    }

    /// Any cached field suggests a previous login in this session.
    pub fn has_hints(&self) -> bool {
        PROFILE_KEYS.iter().any(|key| self.storage.get(key).is_some())
    }

    pub fn clear(&self) {
        for key in PROFILE_KEYS {
            self.storage.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn test_from_response_picks_profile_fields() {
        let body = json!({
            "accessToken": "abc",
            "nombre": "Ana Pérez",
            "rol": "ALUMNO",
            "email": "ana@colegio.edu",
            "dni": "40111222",
            "nivelAlumno": "Secundaria",
            "gradoAlumno": 3
        });

        let profile = SessionProfile::from_response(&body);
        assert_eq!(profile.name.as_deref(), Some("Ana Pérez"));
        assert_eq!(profile.grade.as_deref(), Some("3"));
        assert_eq!(profile.parsed_role(), Some(Role::Student));
    }

    #[test]
    fn test_store_and_hints() {
        let cache = ProfileCache::new(Arc::new(MemoryStorage::new()));
        assert!(!cache.has_hints());

        let profile = SessionProfile {
            name: Some("Luis".into()),
            role: Some("DOCENTE".into()),
            ..Default::default()
        };
        cache.store(&profile);

        assert!(cache.has_hints());
        assert_eq!(cache.load(), profile);

        cache.clear();
        assert!(!cache.has_hints());
        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_token_only_response_keeps_cache() {
        let cache = ProfileCache::new(Arc::new(MemoryStorage::new()));
        cache.store(&SessionProfile {
            email: Some("a@b.c".into()),
            ..Default::default()
        });

        cache.store(&SessionProfile::from_response(&json!({ "token": "t" })));
        assert_eq!(cache.load().email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Administrator));
        assert_eq!(Role::parse(" profesor "), Some(Role::Teacher));
        assert_eq!(Role::parse("Estudiante"), Some(Role::Student));
        assert_eq!(Role::parse("tutor"), None);
        assert_eq!(Role::Teacher.dashboard_path(), "/docente");
    }
}
