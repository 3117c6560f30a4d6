/// Credential lookup
///
/// Nodes that declare a `credentialId` resolve it through a `CredentialStore`.
/// The engine only reads credentials; storing and encrypting them belongs to
/// the surrounding application.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::HashMap, path::Path};
use thiserror::Error;

/// Errors raised while looking up or reading a credential
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential with this id
    #[error("Credential '{0}' not found")]
    NotFound(String),

    /// Credential exists but lacks a field its type needs
    #[error("Credential '{id}' is missing field '{field}'")]
    MissingField { id: String, field: String },

    /// Credential store could not be read
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

/// Supported credential types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// Key sent in a header or query parameter
    #[serde(alias = "apiKey", alias = "api-key")]
    ApiKey,
    /// HTTP basic auth
    Basic,
    /// Arbitrary header(s)
    Custom,
    /// OAuth2 access token, sent as bearer
    #[serde(alias = "oauth")]
    Oauth2,
}

/// A resolved credential: type plus type-specific secret fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Credential id as referenced by nodes
    #[serde(default)]
    pub id: String,
    /// Credential type
    #[serde(rename = "type")]
    pub kind: CredentialKind,
    /// Secret fields (token, key, username, password, ...)
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Credential {
    /// First non-empty string field among `names`
    pub fn field(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.data.get(*name).and_then(Value::as_str))
            .find(|value| !value.is_empty())
    }

    /// Like `field`, but missing is an error naming the primary field
    pub fn require(&self, names: &[&str]) -> Result<&str, CredentialError> {
        self.field(names).ok_or_else(|| CredentialError::MissingField {
            id: self.id.clone(),
            field: names.first().copied().unwrap_or_default().to_string(),
        })
    }
}

/// Read-only credential lookup
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve a credential by id
    async fn resolve_credential(&self, id: &str) -> Result<Credential, CredentialError>;
}

/// In-memory credential store
///
/// Loaded once from a JSON file of the form `{ "<id>": { "type": .., "data": {..} } }`.
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    credentials: HashMap<String, Credential>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a credential
    pub fn insert(&mut self, id: impl Into<String>, mut credential: Credential) {
        let id = id.into();
        credential.id = id.clone();
        self.credentials.insert(id, credential);
    }

    /// Builder-style `insert`
    pub fn with(mut self, id: impl Into<String>, credential: Credential) -> Self {
        self.insert(id, credential);
        self
    }

    /// Load credentials from a JSON file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CredentialError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let parsed: HashMap<String, Credential> = serde_json::from_str(&raw)
            .map_err(|e| CredentialError::Unavailable(format!("{}: {}", path.display(), e)))?;

        let mut store = Self::new();
        for (id, credential) in parsed {
            store.insert(id, credential);
        }
        tracing::info!("🔐 Loaded {} credentials from {}", store.credentials.len(), path.display());
        Ok(store)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn resolve_credential(&self, id: &str) -> Result<Credential, CredentialError> {
        self.credentials
            .get(id)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_and_fields() {
        let credential: Credential = serde_json::from_value(json!({
            "type": "apiKey",
            "data": { "apiKey": "k-123", "headerName": "" }
        }))
        .unwrap();
        let store = MemoryCredentialStore::new().with("cred-1", credential);

        let resolved = store.resolve_credential("cred-1").await.unwrap();
        assert_eq!(resolved.kind, CredentialKind::ApiKey);
        assert_eq!(resolved.id, "cred-1");
        assert_eq!(resolved.field(&["key", "apiKey"]), Some("k-123"));
        assert_eq!(resolved.field(&["headerName"]), None);
        assert!(matches!(
            resolved.require(&["username"]),
            Err(CredentialError::MissingField { .. })
        ));

        assert!(matches!(
            store.resolve_credential("nope").await,
            Err(CredentialError::NotFound(_))
        ));
    }
}
