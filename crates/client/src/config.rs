//! Client configuration

use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/fhir";
const DEFAULT_STORAGE_PREFIX: &str = "oidc.user";

/// FHIR client configuration, passed to every client and service constructor
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub auth: Option<AuthConfig>,
    /// JSON file holding persisted session users, keyed by storage key
    pub session_store_path: Option<PathBuf>,
}

/// OpenID Connect settings used to locate the session user's access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub authority: String,
    pub client_id: String,
    pub storage_prefix: String,
}

impl AuthConfig {
    pub fn new(authority: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            client_id: client_id.into(),
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
        }
    }

    /// Key of the session user in the credential store
    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}", self.storage_prefix, self.authority, self.client_id)
    }
}

impl ClientConfig {
    /// Configuration for `base_url` with no credentials
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            auth: None,
            session_store_path: None,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let auth = match (env("OIDC_AUTHORITY"), env("OIDC_CLIENT_ID")) {
            (Some(authority), Some(client_id)) => Some(AuthConfig {
                authority,
                client_id,
                storage_prefix: env("OIDC_STORAGE_PREFIX")
                    .unwrap_or_else(|| DEFAULT_STORAGE_PREFIX.into()),
            }),
            _ => None,
        };

        Self {
            base_url: env("FHIR_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            api_key: env("FHIR_API_KEY"),
            auth,
            session_store_path: env("SESSION_STORE_PATH").map(PathBuf::from),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }
}

/// Non-empty environment variable
fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
