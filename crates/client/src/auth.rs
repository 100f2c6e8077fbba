//! Session credential lookup
//!
//! The bearer token is read from a persisted session user on every
//! request. Any lookup failure means the request goes out without an
//! `Authorization` header; the server decides whether that is allowed.

use std::path::PathBuf;

use dashmap::DashMap;
use serde_json::Value as JsonValue;

/// Read-only key/value store holding persisted session users
pub trait CredentialStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
}

/// In-memory store, used by tests and embedders that manage sessions themselves
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    items: DashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_item(&self, key: impl Into<String>, value: impl Into<String>) {
        self.items.insert(key.into(), value.into());
    }

    pub fn remove_item(&self, key: &str) {
        self.items.remove(key);
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|v| v.value().clone())
    }
}

/// Store backed by a JSON object file, re-read on every lookup so a
/// refreshed session is picked up without restarting
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "Session store unreadable"
                );
                return None;
            }
        };

        let items: JsonValue = match serde_json::from_str(&contents) {
            Ok(items) => items,
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "Session store is not JSON"
                );
                return None;
            }
        };

        match items.get(key)? {
            JsonValue::String(value) => Some(value.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Bearer token of the session user stored under `key`.
///
/// Stored values are session-user JSON documents carrying `access_token`;
/// a value that is not JSON is taken as the token itself.
pub fn bearer_token(store: &dyn CredentialStore, key: &str) -> Option<String> {
    let raw = store.get_item(key)?;

    let token = match serde_json::from_str::<JsonValue>(&raw) {
        Ok(JsonValue::Object(user)) => user.get("access_token")?.as_str()?.to_string(),
        Ok(_) | Err(_) => raw,
    };

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "oidc.user:https://id.example.org:emr-web";

    #[test]
    fn token_comes_from_session_user() {
        let store = MemoryCredentialStore::new();
        store.set_item(KEY, r#"{"access_token":"tok-123","token_type":"Bearer"}"#);
        assert_eq!(bearer_token(&store, KEY).as_deref(), Some("tok-123"));
    }

    #[test]
    fn raw_value_is_used_verbatim() {
        let store = MemoryCredentialStore::new();
        store.set_item(KEY, "raw-token");
        assert_eq!(bearer_token(&store, KEY).as_deref(), Some("raw-token"));
    }

    #[test]
    fn missing_or_empty_token_means_none() {
        let store = MemoryCredentialStore::new();
        assert_eq!(bearer_token(&store, KEY), None);

        store.set_item(KEY, r#"{"profile":{"sub":"u1"}}"#);
        assert_eq!(bearer_token(&store, KEY), None);

        store.set_item(KEY, r#"{"access_token":"  "}"#);
        assert_eq!(bearer_token(&store, KEY), None);
    }

    #[test]
    fn file_store_rereads_on_each_lookup() {
        let path = std::env::temp_dir().join(format!("emr-session-{}.json", uuid::Uuid::new_v4()));
        let store = FileCredentialStore::new(&path);
        assert_eq!(store.get_item(KEY), None);

        let mut file = std::fs::File::create(&path).unwrap();
        let user = serde_json::json!({"access_token": "from-file"}).to_string();
        write!(file, "{}", serde_json::json!({ KEY: user })).unwrap();
        drop(file);

        assert_eq!(bearer_token(&store, KEY).as_deref(), Some("from-file"));
        std::fs::remove_file(&path).unwrap();
    }
}
