/// Template resolver
///
/// Expands `{{ path }}` and legacy `{{ $('Node Name').item.json.path }}`
/// expressions against the inputs visible to a node. Resolution never fails:
/// an expression that doesn't resolve stays in the output verbatim, so callers
/// can spot it by looking for the literal `{{...}}` text.

use crate::runtime::router::VisibleInputs;
use crate::template::path::{navigate, parse_path, unwrap_scalar, Segment};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.+?)\s*\}\}").expect("expression pattern is valid"));

static LEGACY_NODE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\$\(\s*['"](.+?)['"]\s*\)\.item\.json(?:\.(.+))?$"#).expect("legacy pattern is valid")
});

static POSITIONAL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^input-(\d+)$").expect("positional pattern is valid"));

/// Whether a string contains at least one expression
pub fn contains_expression(template: &str) -> bool {
    EXPRESSION.is_match(template)
}

/// Body of the expression when `template` is exactly one `{{ ... }}`
pub fn single_expression(template: &str) -> Option<&str> {
    let trimmed = template.trim();
    let caps = EXPRESSION.captures(trimmed)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == trimmed.len() {
        caps.get(1).map(|body| body.as_str())
    } else {
        None
    }
}

/// Resolve an expression body (the text between the braces) to a value
///
/// Strategies, first hit wins: named input, `input-N` positional reference,
/// then the whole path against each positional input in order. JSON `null`
/// counts as a miss.
pub fn lookup(expression: &str, inputs: &VisibleInputs) -> Option<Value> {
    let expression = expression.trim();

    if let Some(caps) = LEGACY_NODE_REF.captures(expression) {
        let name = &caps[1];
        let rest = caps.get(2).map_or("", |m| m.as_str());
        if let Some(found) = inputs.named.get(name).and_then(|root| navigate(root, &parse_path(rest))) {
            if !found.is_null() {
                return Some(found.clone());
            }
        }
        let collapsed = if rest.is_empty() { name.to_string() } else { format!("{}.{}", name, rest) };
        return lookup_path(&collapsed, inputs);
    }

    lookup_path(expression, inputs)
}

fn lookup_path(path: &str, inputs: &VisibleInputs) -> Option<Value> {
    let segments = parse_path(path);
    let (first, rest) = segments.split_first()?;

    if let Segment::Key(head) = first {
        if let Some(found) = inputs.named.get(head).and_then(|root| navigate(root, rest)) {
            if !found.is_null() {
                return Some(found.clone());
            }
        }

        if let Some(caps) = POSITIONAL_REF.captures(head) {
            let found = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| inputs.positional.get(index))
                .and_then(|root| navigate(root, rest));
            if let Some(found) = found.filter(|value| !value.is_null()) {
                return Some(found.clone());
            }
        }
    }

    inputs
        .positional
        .iter()
        .filter_map(|root| navigate(root, &segments))
        .find(|value| !value.is_null())
        .cloned()
}

/// Text form of a resolved value for plain-string destinations
pub fn to_plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn substitute(template: &str, inputs: &VisibleInputs, render: impl Fn(&Value) -> String) -> String {
    EXPRESSION
        .replace_all(template, |caps: &Captures| match lookup(&caps[1], inputs) {
            Some(value) => render(&value),
            None => {
                tracing::debug!("❓ Unresolved template expression: {}", &caps[0]);
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Resolve every expression in a plain string
///
/// Header-style single-scalar arrays render as their value.
pub fn resolve(template: &str, inputs: &VisibleInputs) -> String {
    if !contains_expression(template) {
        return template.to_string();
    }
    substitute(template, inputs, |value| to_plain_text(unwrap_scalar(value)))
}

/// Resolve a JSON body without breaking its syntax
///
/// When the template parses as JSON, only string leaves are resolved and the
/// document is re-serialized, so quotes and newlines in resolved values are
/// escaped properly. Otherwise falls back to plain resolution.
pub fn resolve_in_json(template: &str, inputs: &VisibleInputs) -> String {
    if !contains_expression(template) {
        return template.to_string();
    }
    match serde_json::from_str::<Value>(template) {
        Ok(document) => {
            let resolved = resolve_value(&document, inputs);
            serde_json::to_string(&resolved).unwrap_or_else(|_| resolve(template, inputs))
        }
        Err(_) => {
            tracing::debug!("📄 Body is not valid JSON before resolution, using plain substitution");
            resolve(template, inputs)
        }
    }
}

/// Resolve expressions in a script body as script literals
///
/// Each value is substituted as its JSON literal: strings become quoted and
/// escaped, numbers and booleans are inlined, objects and arrays serialized
/// with their shape intact.
pub fn resolve_in_script(template: &str, inputs: &VisibleInputs) -> String {
    if !contains_expression(template) {
        return template.to_string();
    }
    substitute(template, inputs, |value| {
        serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
    })
}

/// Resolve expressions inside every string leaf of a JSON value
pub fn resolve_value(value: &Value, inputs: &VisibleInputs) -> Value {
    match value {
        Value::String(s) => Value::String(resolve(s, inputs)),
        Value::Array(items) => Value::Array(items.iter().map(|item| resolve_value(item, inputs)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), resolve_value(item, inputs)))
                .collect(),
        ),
        other => other.clone(),
    }
}
