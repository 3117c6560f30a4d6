/// Request authentication for outbound HTTP nodes
///
/// A node authenticates either through a stored credential (`credentialId`)
/// or through an inline `authentication` block in its config. Both resolve to
/// `AuthCredentials`, which know how to decorate a request.

use crate::credentials::{Credential, CredentialError, CredentialKind, CredentialStore};
use crate::runtime::{executor::NodeError, router::VisibleInputs};
use crate::template::resolve_value;
use serde_json::{Map, Value};

const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";
const DEFAULT_API_KEY_PARAM: &str = "api_key";

/// Resolved authentication, ready to apply
#[derive(Debug, Clone, PartialEq)]
pub enum AuthCredentials {
    /// No authentication
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// Basic auth (username, password)
    Basic(String, String),
    /// Extra headers (name, value)
    Headers(Vec<(String, String)>),
    /// Query parameter (name, value)
    Query(String, String),
}

impl AuthCredentials {
    /// Build from a stored or inline credential
    pub fn from_credential(credential: &Credential) -> Result<Self, CredentialError> {
        match credential.kind {
            CredentialKind::Bearer => Ok(AuthCredentials::Bearer(
                credential.require(&["token", "bearerToken", "accessToken"])?.to_string(),
            )),
            CredentialKind::Oauth2 => Ok(AuthCredentials::Bearer(
                credential.require(&["accessToken", "access_token", "token"])?.to_string(),
            )),
            CredentialKind::Basic => Ok(AuthCredentials::Basic(
                credential.require(&["username", "user"])?.to_string(),
                credential.field(&["password"]).unwrap_or_default().to_string(),
            )),
            CredentialKind::ApiKey => {
                let key = credential.require(&["apiKey", "key", "value", "token"])?.to_string();
                let in_query = credential
                    .field(&["in", "addTo", "location"])
                    .is_some_and(|location| location.eq_ignore_ascii_case("query"));

                if in_query {
                    let param = credential.field(&["paramName", "name"]).unwrap_or(DEFAULT_API_KEY_PARAM);
                    Ok(AuthCredentials::Query(param.to_string(), key))
                } else {
                    let header = credential.field(&["headerName", "name"]).unwrap_or(DEFAULT_API_KEY_HEADER);
                    Ok(AuthCredentials::Headers(vec![(header.to_string(), key)]))
                }
            }
            CredentialKind::Custom => {
                let headers = custom_headers(credential);
                if headers.is_empty() {
                    return Err(CredentialError::MissingField {
                        id: credential.id.clone(),
                        field: "headers".to_string(),
                    });
                }
                Ok(AuthCredentials::Headers(headers))
            }
        }
    }

    /// Apply credentials to a reqwest request builder
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthCredentials::None => request,
            AuthCredentials::Bearer(token) => request.bearer_auth(token),
            AuthCredentials::Basic(username, password) => request.basic_auth(username, Some(password)),
            AuthCredentials::Headers(headers) => headers
                .iter()
                .fold(request, |request, (name, value)| request.header(name.as_str(), value.as_str())),
            AuthCredentials::Query(name, value) => request.query(&[(name.as_str(), value.as_str())]),
        }
    }
}

/// Header pairs of a custom credential: `headers` (map or list) or a single `headerName`/`headerValue`
fn custom_headers(credential: &Credential) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    match credential.data.get("headers") {
        Some(Value::Object(map)) => {
            for (name, value) in map {
                if let Some(value) = value.as_str() {
                    headers.push((name.clone(), value.to_string()));
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let name = item.get("name").or_else(|| item.get("key")).and_then(Value::as_str);
                let value = item.get("value").and_then(Value::as_str);
                if let (Some(name), Some(value)) = (name, value) {
                    headers.push((name.to_string(), value.to_string()));
                }
            }
        }
        _ => {}
    }
    if let (Some(name), Some(value)) = (credential.field(&["headerName"]), credential.field(&["headerValue"])) {
        headers.push((name.to_string(), value.to_string()));
    }
    headers.retain(|(name, _)| !name.is_empty());
    headers
}

/// Resolve a node's authentication
///
/// `credentialId` wins over an inline `authentication` block. Inline fields
/// may contain template expressions.
pub async fn resolve_auth(
    config: &Value,
    inputs: &VisibleInputs,
    store: &dyn CredentialStore,
) -> Result<AuthCredentials, NodeError> {
    if let Some(credential_id) = config.get("credentialId").and_then(Value::as_str).filter(|id| !id.is_empty()) {
        tracing::debug!("🔑 Resolving credential '{}'", credential_id);
        let credential = store.resolve_credential(credential_id).await?;
        return Ok(AuthCredentials::from_credential(&credential)?);
    }

    match config.get("authentication") {
        Some(Value::Object(block)) => inline_auth(block, inputs),
        _ => Ok(AuthCredentials::None),
    }
}

fn inline_auth(block: &Map<String, Value>, inputs: &VisibleInputs) -> Result<AuthCredentials, NodeError> {
    let type_name = block.get("type").and_then(Value::as_str).unwrap_or("none");
    if type_name.is_empty() || type_name.eq_ignore_ascii_case("none") {
        return Ok(AuthCredentials::None);
    }

    let kind: CredentialKind = serde_json::from_value(Value::String(type_name.to_string()))
        .map_err(|_| NodeError::InvalidConfig(format!("unsupported authentication type '{}'", type_name)))?;

    let mut data = block.clone();
    data.remove("type");
    let data = match resolve_value(&Value::Object(data), inputs) {
        Value::Object(resolved) => resolved,
        _ => Map::new(),
    };

    let credential = Credential {
        id: "inline".to_string(),
        kind,
        data,
    };
    Ok(AuthCredentials::from_credential(&credential)?)
}
