/// LLM call node
///
/// Sends an OpenAI-compatible chat completion request. The endpoint comes
/// from the node's `url`, then the credential's `baseUrl`, then the engine
/// default. The provider's JSON answer is the node output.

use crate::credentials::{Credential, CredentialKind, CredentialStore};
use crate::runtime::{
    executor::{NodeError, NodeHandler, RunContext},
    nodes::{auth::AuthCredentials, parse_config, timeout_secs},
    output::NodeOutput,
    router::VisibleInputs,
};
use crate::template::resolve;
use crate::workflow::types::Node;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, Deserialize)]
struct ChatMessage {
    #[serde(default = "default_role")]
    role: String,
    #[serde(default)]
    content: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmNodeConfig {
    #[serde(default)]
    credential_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default, alias = "system", alias = "systemPrompt")]
    system_message: Option<String>,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default, alias = "prompt")]
    user_message: Option<String>,
    #[serde(default, alias = "advancedOptions")]
    options: Map<String, Value>,
    #[serde(default)]
    timeout: Option<Value>,
}

/// Numeric-looking strings become numbers; blank strings are dropped
fn option_value(value: &Value, inputs: &VisibleInputs) -> Option<Value> {
    match value {
        Value::String(template) => {
            let resolved = resolve(template, inputs);
            let trimmed = resolved.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(int) = trimmed.parse::<i64>() {
                return Some(Value::Number(int.into()));
            }
            if let Some(float) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                return Some(Value::Number(float));
            }
            Some(Value::String(resolved))
        }
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// Auth for an LLM provider: bare API keys go out as bearer tokens
fn provider_auth(credential: &Credential) -> Result<AuthCredentials, NodeError> {
    if credential.kind == CredentialKind::ApiKey && credential.field(&["headerName"]).is_none() {
        let key = credential.require(&["apiKey", "key", "value", "token"])?;
        return Ok(AuthCredentials::Bearer(key.to_string()));
    }
    Ok(AuthCredentials::from_credential(credential)?)
}

/// Build the chat completion request body
fn request_body(config: &LlmNodeConfig, inputs: &VisibleInputs) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = config.system_message.as_deref() {
        let system = resolve(system, inputs);
        if !system.trim().is_empty() {
            messages.push(json!({ "role": "system", "content": system }));
        }
    }
    for message in &config.messages {
        let content = resolve(&message.content, inputs);
        if !content.trim().is_empty() {
            messages.push(json!({ "role": message.role, "content": content }));
        }
    }
    if let Some(prompt) = config.user_message.as_deref() {
        let prompt = resolve(prompt, inputs);
        if !prompt.trim().is_empty() {
            messages.push(json!({ "role": "user", "content": prompt }));
        }
    }

    let mut body = Map::new();
    if let Some(model) = config.model.as_deref() {
        body.insert("model".to_string(), Value::String(resolve(model, inputs)));
    }
    body.insert("messages".to_string(), Value::Array(messages));
    for (name, value) in &config.options {
        if let Some(value) = option_value(value, inputs) {
            body.insert(name.clone(), value);
        }
    }
    Value::Object(body)
}

/// LLM call handler
pub struct LlmCallHandler {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    default_url: String,
    default_timeout: Duration,
}

impl LlmCallHandler {
    pub fn new(
        client: reqwest::Client,
        credentials: Arc<dyn CredentialStore>,
        default_url: String,
        default_timeout: Duration,
    ) -> Self {
        Self {
            client,
            credentials,
            default_url,
            default_timeout,
        }
    }
}

#[async_trait]
impl NodeHandler for LlmCallHandler {
    async fn execute(&self, node: &Node, inputs: &VisibleInputs, _ctx: &RunContext) -> Result<NodeOutput, NodeError> {
        let config: LlmNodeConfig = parse_config(node.config())?;

        let credential_id = config
            .credential_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| NodeError::MissingConfig("credentialId".to_string()))?;
        let credential = self.credentials.resolve_credential(credential_id).await?;
        let auth = provider_auth(&credential)?;

        let url = config
            .url
            .as_deref()
            .map(|url| resolve(url.trim(), inputs))
            .filter(|url| !url.is_empty())
            .or_else(|| credential.field(&["baseUrl", "url"]).map(str::to_string))
            .unwrap_or_else(|| self.default_url.clone());
        let timeout = timeout_secs(config.timeout.as_ref())
            .map(Duration::from_secs_f64)
            .unwrap_or(self.default_timeout);

        let body = request_body(&config, inputs);
        tracing::info!("🤖 LLM call to {} (node: {}, model: {})", url, node.id, body["model"]);

        let request = self.client.post(&url).timeout(timeout).json(&body);
        let response = auth.apply_to_request(request).send().await.map_err(|e| {
            if e.is_timeout() {
                NodeError::Timeout(timeout)
            } else {
                NodeError::Llm(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NodeError::Llm(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(NodeError::Llm(format!("provider returned {}: {}", status.as_u16(), text.trim())));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| NodeError::Llm(format!("provider returned invalid JSON: {}", e)))?;
        Ok(NodeOutput::from(parsed))
    }
}
