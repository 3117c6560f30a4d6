/// Code run node
///
/// Runs a user-supplied JavaScript or Python snippet in a separate process.
/// Template expressions in the snippet are substituted as script literals
/// first. The snippet sees the positional inputs through a read-only
/// `$input` accessor (`_input` in Python) and returns its result, which is
/// printed as JSON on stdout by the harness.

use crate::runtime::{
    executor::{NodeError, NodeHandler, RunContext},
    nodes::timeout_secs,
    output::NodeOutput,
    router::VisibleInputs,
};
use crate::template::resolve_in_script;
use crate::workflow::types::Node;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::{collections::BTreeMap, process::Stdio, sync::Arc, time::Duration};
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};

/// Captured result of one process run
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Executes a generated program for a language
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, language: &str, program: &str, timeout: Duration) -> Result<ProcessOutput, NodeError>;
}

/// Runs programs through external interpreters
///
/// The program is written to the interpreter's stdin. The child gets an
/// empty environment apart from `PATH` and is killed if the timeout elapses.
#[derive(Debug, Clone)]
pub struct ProcessCodeRunner {
    runtimes: BTreeMap<String, Vec<String>>,
}

impl ProcessCodeRunner {
    /// `runtimes` maps a language name to the interpreter command line
    pub fn new(runtimes: BTreeMap<String, Vec<String>>) -> Self {
        Self { runtimes }
    }
}

#[async_trait]
impl CodeRunner for ProcessCodeRunner {
    async fn run(&self, language: &str, program: &str, limit: Duration) -> Result<ProcessOutput, NodeError> {
        let argv = self
            .runtimes
            .get(language)
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| NodeError::InvalidConfig(format!("no runtime configured for language '{}'", language)))?;

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| NodeError::CodeRun(format!("failed to start '{}': {}", argv[0], e)))?;

        // The program is fed while the process runs, both under the time limit
        let stdin = child.stdin.take();
        let source = program.as_bytes();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(source).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        // Dropping the child on timeout kills it
        let (fed, waited) = match timeout(limit, async { tokio::join!(feed, child.wait_with_output()) }).await {
            Ok(results) => results,
            Err(_) => return Err(NodeError::Timeout(limit)),
        };
        let output = waited.map_err(|e| NodeError::CodeRun(format!("failed to wait for process: {}", e)))?;
        fed.map_err(|e| NodeError::CodeRun(format!("failed to write program: {}", e)))?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Supported snippet languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    Python,
}

impl Language {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "javascript" | "js" | "node" => Some(Language::JavaScript),
            "python" | "py" | "python3" => Some(Language::Python),
            _ => None,
        }
    }

    /// Runtime key in the configured runtimes map
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    /// Wrap a snippet so it reads inputs and prints its result as JSON
    pub fn harness(&self, snippet: &str, inputs: &[Value]) -> String {
        let items = serde_json::to_string(inputs).unwrap_or_else(|_| "[]".to_string());
        match self {
            Language::JavaScript => javascript_harness(snippet, &items),
            Language::Python => python_harness(snippet, &items),
        }
    }
}

fn javascript_harness(snippet: &str, items: &str) -> String {
    format!(
        r#""use strict";
const __freeze = (value) => {{
  if (value !== null && typeof value === "object") {{
    Object.values(value).forEach(__freeze);
    Object.freeze(value);
  }}
  return value;
}};
const __items = __freeze({items});
const $input = Object.freeze({{
  first: () => (__items.length > 0 ? __items[0] : null),
  all: () => __items,
  item: (index) => (index >= 0 && index < __items.length ? __items[index] : null),
}});
console.log = (...args) => process.stderr.write(args.map(String).join(" ") + "\n");
(async () => {{
{snippet}
}})().then(
  (result) => process.stdout.write(JSON.stringify(result === undefined ? null : result)),
  (error) => {{
    process.stderr.write(String(error && error.stack ? error.stack : error));
    process.exit(1);
  }}
);
"#
    )
}

fn python_harness(snippet: &str, items: &str) -> String {
    let literal = serde_json::to_string(items).unwrap_or_else(|_| "\"[]\"".to_string());
    let body: String = if snippet.trim().is_empty() {
        "    pass\n".to_string()
    } else {
        snippet.lines().map(|line| format!("    {}\n", line)).collect()
    };
    format!(
        r#"import copy
import json
import sys

true, false, null = True, False, None
_items = json.loads({literal})


class _Input:
    def first(self):
        return copy.deepcopy(_items[0]) if _items else None

    def all(self):
        return copy.deepcopy(_items)

    def item(self, index):
        return copy.deepcopy(_items[index]) if 0 <= index < len(_items) else None


_input = _Input()
_stdout = sys.stdout
sys.stdout = sys.stderr


def _main():
{body}

_result = _main()
_stdout.write(json.dumps(_result))
_stdout.flush()
"#
    )
}

/// Code run node handler
pub struct CodeRunHandler {
    runner: Arc<dyn CodeRunner>,
    default_timeout: Duration,
}

impl CodeRunHandler {
    pub fn new(runner: Arc<dyn CodeRunner>, default_timeout: Duration) -> Self {
        Self { runner, default_timeout }
    }
}

#[async_trait]
impl NodeHandler for CodeRunHandler {
    async fn execute(&self, node: &Node, inputs: &VisibleInputs, _ctx: &RunContext) -> Result<NodeOutput, NodeError> {
        let config = node.config();
        let source = ["code", "script", "jsCode", "pythonCode"]
            .iter()
            .find_map(|key| config.get(*key).and_then(Value::as_str))
            .filter(|code| !code.trim().is_empty())
            .ok_or_else(|| NodeError::MissingConfig("code".to_string()))?;

        let language_name = config.get("language").and_then(Value::as_str).unwrap_or("javascript");
        let language = Language::parse(language_name)
            .ok_or_else(|| NodeError::InvalidConfig(format!("unsupported language '{}'", language_name)))?;
        let limit = timeout_secs(config.get("timeout"))
            .map(Duration::from_secs_f64)
            .unwrap_or(self.default_timeout);

        let snippet = resolve_in_script(source, inputs);
        let program = language.harness(&snippet, &inputs.positional);

        tracing::info!("🧮 Running {} snippet for node '{}' (timeout {:?})", language.as_str(), node.id, limit);
        let output = self.runner.run(language.as_str(), &program, limit).await?;

        if output.exit_code != 0 {
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                format!("process exited with code {}", output.exit_code)
            } else {
                stderr.to_string()
            };
            return Err(NodeError::CodeRun(message));
        }

        let stdout = output.stdout.trim();
        let result = serde_json::from_str::<Value>(stdout).unwrap_or_else(|_| json!({ "result": stdout }));
        Ok(NodeOutput::from(result))
    }
}
