/// HTTP request node
///
/// Performs one outbound request built from the node's config. Every string
/// in the config may carry template expressions. A response of any status is
/// a successful output; only transport failures and timeouts are errors.

use crate::credentials::CredentialStore;
use crate::runtime::{
    executor::{NodeError, NodeHandler, RunContext},
    nodes::{auth::resolve_auth, parse_config, timeout_secs},
    output::NodeOutput,
    router::VisibleInputs,
};
use crate::template::{resolve, resolve_in_json, resolve_value, to_plain_text};
use crate::workflow::types::Node;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Method};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::{collections::BTreeMap, sync::Arc, time::Duration};

/// Key/value pairs given either as an object or as a list of `{name, value}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeyValues {
    Map(Map<String, Value>),
    List(Vec<KeyValue>),
}

/// One entry of a key/value list
#[derive(Debug, Clone, Deserialize)]
pub struct KeyValue {
    #[serde(alias = "key")]
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl KeyValues {
    /// Resolved pairs, skipping blank names
    fn resolve(&self, inputs: &VisibleInputs) -> Vec<(String, String)> {
        let entries: Vec<(&String, &Value)> = match self {
            KeyValues::Map(map) => map.iter().collect(),
            KeyValues::List(list) => list.iter().map(|entry| (&entry.name, &entry.value)).collect(),
        };
        entries
            .into_iter()
            .filter(|(name, _)| !name.trim().is_empty())
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => resolve(s, inputs),
                    other => to_plain_text(other),
                };
                (resolve(name, inputs), value)
            })
            .collect()
    }
}

/// How the request body is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Json,
    Text,
    Raw,
    #[serde(alias = "form-urlencoded", alias = "x-www-form-urlencoded")]
    Form,
    None,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpNodeConfig {
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default, alias = "query", alias = "queryParameters")]
    query_params: Option<KeyValues>,
    #[serde(default)]
    headers: Option<KeyValues>,
    #[serde(default)]
    body_type: Option<BodyType>,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    timeout: Option<Value>,
}

/// Outbound HTTP request handler
pub struct HttpHandler {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    default_timeout: Duration,
}

impl HttpHandler {
    pub fn new(client: reqwest::Client, credentials: Arc<dyn CredentialStore>, default_timeout: Duration) -> Self {
        Self {
            client,
            credentials,
            default_timeout,
        }
    }

    fn effective_timeout(&self, configured: Option<&Value>) -> Duration {
        match timeout_secs(configured) {
            Some(secs) => {
                let timeout = Duration::from_secs_f64(secs);
                if timeout > self.default_timeout {
                    tracing::debug!("⏱️ Node timeout {:?} overrides default {:?}", timeout, self.default_timeout);
                }
                timeout
            }
            None => self.default_timeout,
        }
    }
}

fn parse_method(method: Option<&str>) -> Result<Method, NodeError> {
    let name = method.map(str::trim).filter(|m| !m.is_empty()).unwrap_or("GET").to_ascii_uppercase();
    match name.as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        other => Err(NodeError::InvalidConfig(format!("unsupported HTTP method '{}'", other))),
    }
}

/// Attach the configured body, resolving expressions for its encoding
fn apply_body(
    request: reqwest::RequestBuilder,
    body_type: Option<BodyType>,
    body: &Value,
    has_content_type: bool,
    inputs: &VisibleInputs,
) -> Result<reqwest::RequestBuilder, NodeError> {
    if body.is_null() {
        return Ok(request);
    }
    let body_type = body_type.unwrap_or(BodyType::Json);

    let request = match (body_type, body) {
        (BodyType::None, _) => request,
        (BodyType::Json, Value::String(template)) => {
            let request = request.body(resolve_in_json(template, inputs));
            if has_content_type {
                request
            } else {
                request.header(CONTENT_TYPE, "application/json")
            }
        }
        (BodyType::Json, structured) => request.json(&resolve_value(structured, inputs)),
        (BodyType::Form, Value::String(template)) => {
            let request = request.body(resolve(template, inputs));
            if has_content_type {
                request
            } else {
                request.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            }
        }
        (BodyType::Form, structured) => {
            let pairs: KeyValues = serde_json::from_value(structured.clone())
                .map_err(|e| NodeError::InvalidConfig(format!("invalid form body: {}", e)))?;
            request.form(&pairs.resolve(inputs))
        }
        (BodyType::Text | BodyType::Raw, Value::String(template)) => request.body(resolve(template, inputs)),
        (BodyType::Text | BodyType::Raw, structured) => request.body(to_plain_text(&resolve_value(structured, inputs))),
    };
    Ok(request)
}

/// Response headers as name -> all values
fn response_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut collected: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        collected
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    collected
}

#[async_trait]
impl NodeHandler for HttpHandler {
    async fn execute(&self, node: &Node, inputs: &VisibleInputs, _ctx: &RunContext) -> Result<NodeOutput, NodeError> {
        let config: HttpNodeConfig = parse_config(node.config())?;

        let url = resolve(config.url.trim(), inputs);
        if url.is_empty() {
            return Err(NodeError::MissingConfig("url".to_string()));
        }
        let method = parse_method(config.method.as_deref())?;
        let timeout = self.effective_timeout(config.timeout.as_ref());

        tracing::info!("🌐 HTTP request: {} {} (node: {})", method, url, node.id);

        let mut request = self.client.request(method.clone(), &url).timeout(timeout);

        if let Some(query) = &config.query_params {
            let pairs = query.resolve(inputs);
            if !pairs.is_empty() {
                request = request.query(&pairs);
            }
        }

        let mut has_content_type = false;
        if let Some(headers) = &config.headers {
            for (name, value) in headers.resolve(inputs) {
                has_content_type |= name.eq_ignore_ascii_case("content-type");
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let auth = resolve_auth(node.config(), inputs, self.credentials.as_ref()).await?;
        request = auth.apply_to_request(request);

        if method != Method::GET && method != Method::HEAD {
            request = apply_body(request, config.body_type, &config.body, has_content_type, inputs)?;
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                NodeError::Timeout(timeout)
            } else {
                NodeError::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response_headers(response.headers());
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                NodeError::Timeout(timeout)
            } else {
                NodeError::Http(format!("failed to read response body: {}", e))
            }
        })?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        tracing::info!("📡 HTTP response: {} from {} (node: {})", status, url, node.id);

        Ok(NodeOutput::from(json!({
            "status": status,
            "headers": headers,
            "body": body,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::workflow::types::{NodeData, NodeKind};

    fn handler() -> HttpHandler {
        HttpHandler::new(
            reqwest::Client::new(),
            Arc::new(MemoryCredentialStore::new()),
            Duration::from_secs(30),
        )
    }

    fn node(config: Value) -> Node {
        Node {
            id: "call".to_string(),
            kind: NodeKind::Http,
            data: NodeData {
                config,
                ..NodeData::default()
            },
        }
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method(None).unwrap(), Method::GET);
        assert_eq!(parse_method(Some("post")).unwrap(), Method::POST);
        assert!(matches!(parse_method(Some("BREW")), Err(NodeError::InvalidConfig(_))));
    }

    #[test]
    fn test_key_values_accept_map_and_list() {
        let inputs = VisibleInputs::positional(vec![json!({ "id": 7 })]);
        let map: KeyValues = serde_json::from_value(json!({ "id": "{{ id }}", "n": 2 })).unwrap();
        assert_eq!(
            map.resolve(&inputs),
            vec![("id".to_string(), "7".to_string()), ("n".to_string(), "2".to_string())]
        );

        let list: KeyValues =
            serde_json::from_value(json!([{ "name": "id", "value": "{{ id }}" }, { "name": " ", "value": "x" }]))
                .unwrap();
        assert_eq!(list.resolve(&inputs), vec![("id".to_string(), "7".to_string())]);
    }

    #[test]
    fn test_json_body_escapes_resolved_strings() {
        let inputs = VisibleInputs::positional(vec![json!({ "note": "say \"hi\"" })]);
        let request = apply_body(
            reqwest::Client::new().post("http://example.com"),
            Some(BodyType::Json),
            &json!(r#"{"text": "{{ note }}"}"#),
            false,
            &inputs,
        )
        .unwrap()
        .build()
        .unwrap();

        let sent: Value = serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(sent, json!({ "text": "say \"hi\"" }));
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_configured_timeout_overrides_default() {
        let handler = handler();
        assert_eq!(handler.effective_timeout(Some(&json!(120))), Duration::from_secs(120));
        assert_eq!(handler.effective_timeout(Some(&json!("5"))), Duration::from_secs(5));
        assert_eq!(handler.effective_timeout(Some(&json!(0))), Duration::from_secs(30));
        assert_eq!(handler.effective_timeout(None), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let result = handler()
            .execute(&node(json!({ "method": "GET" })), &VisibleInputs::default(), &RunContext::default())
            .await;
        assert!(matches!(result, Err(NodeError::MissingConfig(field)) if field == "url"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let result = handler()
            .execute(
                &node(json!({ "url": "http://127.0.0.1:1/nothing" })),
                &VisibleInputs::default(),
                &RunContext::default(),
            )
            .await;
        assert!(matches!(result, Err(NodeError::Http(_))));
    }
}
