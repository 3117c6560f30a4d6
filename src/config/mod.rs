/// Configuration management for the Hookflow engine
///
/// Handles server configuration and runtime parameters. Every value can be
/// overridden through `HOOKFLOW_*` environment variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Engine configuration
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Engine runtime parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory of `*.json` workflow definitions (default: "workflows")
    pub workflows_dir: String,
    /// Optional JSON file of credentials: `{ "<id>": { "type": .., "data": {..} } }`
    pub credentials_file: Option<String>,
    /// Default timeout for outbound HTTP nodes, in seconds
    pub http_timeout_secs: u64,
    /// Default timeout for code run processes, in seconds
    pub code_timeout_secs: u64,
    /// Language -> interpreter command line reading the program from stdin
    pub code_runtimes: BTreeMap<String, Vec<String>>,
    /// Chat completions endpoint used when neither node nor credential names one
    pub llm_url: String,
    /// Lifetime of a test-listen session, in seconds
    pub test_session_ttl_secs: u64,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("HOOKFLOW_HOST", "0.0.0.0"),
                port: env_parse("HOOKFLOW_PORT", 3004),
            },
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let code_runtimes = BTreeMap::from([
            ("javascript".to_string(), vec![env_or("HOOKFLOW_NODE_BIN", "node"), "-".to_string()]),
            ("python".to_string(), vec![env_or("HOOKFLOW_PYTHON_BIN", "python3"), "-".to_string()]),
        ]);

        Self {
            workflows_dir: env_or("HOOKFLOW_WORKFLOWS_DIR", "workflows"),
            credentials_file: std::env::var("HOOKFLOW_CREDENTIALS_FILE")
                .ok()
                .filter(|path| !path.trim().is_empty()),
            http_timeout_secs: env_parse("HOOKFLOW_HTTP_TIMEOUT_SECS", 30),
            code_timeout_secs: env_parse("HOOKFLOW_CODE_TIMEOUT_SECS", 10),
            code_runtimes,
            llm_url: env_or("HOOKFLOW_LLM_URL", "https://api.openai.com/v1/chat/completions"),
            test_session_ttl_secs: env_parse("HOOKFLOW_TEST_SESSION_TTL_SECS", 120),
        }
    }
}
