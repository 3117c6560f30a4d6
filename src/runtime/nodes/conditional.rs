/// Conditional node
///
/// Evaluates a list of clauses and combines them with AND or OR. The boolean
/// result decides which outgoing branch (`true`/`false` handle) carries this
/// node's output; the output itself forwards the first positional input.

use crate::runtime::{
    executor::{NodeError, NodeHandler, RunContext},
    nodes::parse_config,
    output::NodeOutput,
    router::VisibleInputs,
};
use crate::template::{lookup, path::unwrap_scalar, resolve, single_expression, to_plain_text};
use crate::workflow::types::Node;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

/// How clause results are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Combinator {
    #[default]
    #[serde(alias = "AND", alias = "and", alias = "&&", alias = "all")]
    And,
    #[serde(alias = "OR", alias = "or", alias = "||", alias = "any")]
    Or,
}

/// How operands are coerced before comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    #[default]
    String,
    Number,
    Boolean,
    #[serde(alias = "date", alias = "datetime")]
    DateTime,
    Array,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
    NotRegex,
    IsEmpty,
    IsNotEmpty,
    Gt,
    Gte,
    Lt,
    Lte,
    IsTrue,
    IsFalse,
    LengthEquals,
    LengthNotEquals,
    LengthGt,
    LengthGte,
    LengthLt,
    LengthLte,
}

impl Operator {
    /// Parse an operator name or symbol
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name.trim() {
            "equals" | "equal" | "eq" | "==" | "=" | "is" => Operator::Equals,
            "notEquals" | "not_equals" | "neq" | "ne" | "!=" | "isNot" => Operator::NotEquals,
            "contains" => Operator::Contains,
            "notContains" | "not_contains" => Operator::NotContains,
            "startsWith" | "starts_with" => Operator::StartsWith,
            "endsWith" | "ends_with" => Operator::EndsWith,
            "regex" | "matches" | "matchesRegex" => Operator::Regex,
            "notRegex" | "not_regex" | "notMatches" => Operator::NotRegex,
            "isEmpty" | "is_empty" | "empty" => Operator::IsEmpty,
            "isNotEmpty" | "is_not_empty" | "notEmpty" => Operator::IsNotEmpty,
            "gt" | ">" | "greaterThan" | "after" => Operator::Gt,
            "gte" | ">=" | "greaterThanOrEqual" | "afterOrEquals" => Operator::Gte,
            "lt" | "<" | "lessThan" | "before" => Operator::Lt,
            "lte" | "<=" | "lessThanOrEqual" | "beforeOrEquals" => Operator::Lte,
            "isTrue" | "true" => Operator::IsTrue,
            "isFalse" | "false" => Operator::IsFalse,
            "lengthEquals" | "length_equals" => Operator::LengthEquals,
            "lengthNotEquals" | "length_not_equals" => Operator::LengthNotEquals,
            "lengthGt" | "lengthGreaterThan" => Operator::LengthGt,
            "lengthGte" | "lengthGreaterThanOrEqual" => Operator::LengthGte,
            "lengthLt" | "lengthLessThan" => Operator::LengthLt,
            "lengthLte" | "lengthLessThanOrEqual" => Operator::LengthLte,
            _ => return None,
        };
        Some(op)
    }
}

/// One condition clause as configured
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    #[serde(default, alias = "leftValue", alias = "value1", alias = "field")]
    pub left: Value,
    pub operator: String,
    #[serde(default, alias = "rightValue", alias = "value2", alias = "value")]
    pub right: Value,
    #[serde(default, rename = "type", alias = "dataType", alias = "valueType")]
    pub value_type: ValueType,
}

#[derive(Debug, Deserialize)]
struct ConditionalConfig {
    #[serde(default)]
    conditions: Vec<Clause>,
    #[serde(default, alias = "combinator", alias = "logic", alias = "logicalOperator")]
    combine: Combinator,
}

/// Resolve an operand
///
/// A lone `{{ expr }}` yields the looked-up value with its JSON type; other
/// strings are resolved as text. Non-string values are used as-is.
fn operand(value: &Value, inputs: &VisibleInputs) -> Value {
    match value {
        Value::String(template) => single_expression(template)
            .and_then(|expression| lookup(expression, inputs))
            .unwrap_or_else(|| Value::String(resolve(template, inputs))),
        other => other.clone(),
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "y" | "on"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

/// Parse a date/time; unparseable values are `None` and make comparisons false
fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Some(parsed.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => {
            let raw = n.as_f64()?;
            // Large values are epoch milliseconds
            let millis = if raw.abs() > 1e11 { raw } else { raw * 1000.0 };
            DateTime::from_timestamp_millis(millis as i64)
        }
        _ => None,
    }
}

/// Arrays as-is, JSON array strings parsed, anything else none
fn to_array(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn compare_numbers(op: Operator, left: f64, right: f64) -> bool {
    match op {
        Operator::Gt | Operator::LengthGt => left > right,
        Operator::Gte | Operator::LengthGte => left >= right,
        Operator::Lt | Operator::LengthLt => left < right,
        Operator::Lte | Operator::LengthLte => left <= right,
        Operator::LengthNotEquals => left != right,
        _ => left == right,
    }
}

fn equals(value_type: ValueType, left: &Value, right: &Value) -> Option<bool> {
    let equal = match value_type {
        ValueType::String => to_plain_text(left) == to_plain_text(right),
        ValueType::Number => to_number(left) == to_number(right),
        ValueType::Boolean => to_bool(left) == to_bool(right),
        ValueType::DateTime => to_datetime(left)? == to_datetime(right)?,
        ValueType::Array => to_array(left).unwrap_or_default() == to_array(right).unwrap_or_default(),
    };
    Some(equal)
}

fn contains(left: &Value, right: &Value) -> bool {
    let needle = to_plain_text(right);
    match to_array(left) {
        Some(items) => items.iter().any(|item| to_plain_text(item) == needle),
        None => to_plain_text(left).contains(&needle),
    }
}

fn regex_match(left: &Value, pattern: &Value) -> Result<bool, NodeError> {
    let pattern = to_plain_text(pattern);
    let regex = Regex::new(&pattern)
        .map_err(|e| NodeError::Condition(format!("invalid regex '{}': {}", pattern, e)))?;
    Ok(regex.is_match(&to_plain_text(left)))
}

/// Evaluate one clause against resolved operands
pub fn evaluate_clause(clause: &Clause, inputs: &VisibleInputs) -> Result<bool, NodeError> {
    let op = Operator::parse(&clause.operator)
        .ok_or_else(|| NodeError::Condition(format!("unknown operator '{}'", clause.operator)))?;
    let left_raw = operand(&clause.left, inputs);
    let right_raw = operand(&clause.right, inputs);
    // Scalar comparisons read header-style ["value"] arrays as their value
    let (left, right) = match clause.value_type {
        ValueType::Array => (&left_raw, &right_raw),
        _ => (unwrap_scalar(&left_raw), unwrap_scalar(&right_raw)),
    };

    let result = match op {
        Operator::Equals => equals(clause.value_type, left, right).unwrap_or(false),
        Operator::NotEquals => equals(clause.value_type, left, right).is_some_and(|equal| !equal),
        Operator::Contains => contains(&left_raw, right),
        Operator::NotContains => !contains(&left_raw, right),
        Operator::StartsWith => to_plain_text(left).starts_with(&to_plain_text(right)),
        Operator::EndsWith => to_plain_text(left).ends_with(&to_plain_text(right)),
        Operator::Regex => regex_match(left, right)?,
        Operator::NotRegex => !regex_match(left, right)?,
        Operator::IsEmpty => is_empty(&left_raw),
        Operator::IsNotEmpty => !is_empty(&left_raw),
        Operator::IsTrue => to_bool(left),
        Operator::IsFalse => !to_bool(left),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => match clause.value_type {
            ValueType::DateTime => match (to_datetime(left), to_datetime(right)) {
                (Some(l), Some(r)) => {
                    let (l, r) = (l.timestamp_millis() as f64, r.timestamp_millis() as f64);
                    compare_numbers(op, l, r)
                }
                _ => false,
            },
            _ => compare_numbers(op, to_number(left), to_number(right)),
        },
        Operator::LengthEquals
        | Operator::LengthNotEquals
        | Operator::LengthGt
        | Operator::LengthGte
        | Operator::LengthLt
        | Operator::LengthLte => {
            let length = to_array(&left_raw).map_or(0, |items| items.len());
            compare_numbers(op, length as f64, to_number(right))
        }
    };
    Ok(result)
}

/// Combine clause results; an empty list is `true` under AND and `false` under OR
pub fn combine(combinator: Combinator, results: &[bool]) -> bool {
    match combinator {
        Combinator::And => results.iter().all(|r| *r),
        Combinator::Or => results.iter().any(|r| *r),
    }
}

/// Boolean result recorded in a conditional node's output, if it has one
pub fn branch_result(output: &NodeOutput) -> Option<bool> {
    match output {
        NodeOutput::Object(map) => map.get("result").and_then(Value::as_bool),
        _ => None,
    }
}

/// Conditional node handler
pub struct ConditionalHandler;

#[async_trait]
impl NodeHandler for ConditionalHandler {
    async fn execute(&self, node: &Node, inputs: &VisibleInputs, _ctx: &RunContext) -> Result<NodeOutput, NodeError> {
        let config: ConditionalConfig = parse_config(node.config())?;

        let results = config
            .conditions
            .iter()
            .map(|clause| evaluate_clause(clause, inputs))
            .collect::<Result<Vec<bool>, NodeError>>()?;
        let result = combine(config.combine, &results);

        tracing::info!(
            "🔀 Conditional '{}' evaluated {} clause(s) with {:?}: {}",
            node.id,
            results.len(),
            config.combine,
            result
        );

        Ok(NodeOutput::from(json!({
            "result": result,
            "conditionResults": results,
            "output": inputs.first(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(left: Value, operator: &str, right: Value, value_type: &str) -> Clause {
        serde_json::from_value(json!({
            "left": left, "operator": operator, "right": right, "type": value_type
        }))
        .unwrap()
    }

    fn eval(left: Value, operator: &str, right: Value, value_type: &str) -> bool {
        let inputs = VisibleInputs::positional(vec![json!({ "amount": 150, "tags": ["a", "b"], "name": "Widget" })]);
        evaluate_clause(&clause(left, operator, right, value_type), &inputs).unwrap()
    }

    #[test]
    fn test_numbers_are_coerced_from_templates() {
        assert!(eval(json!("{{ amount }}"), "gt", json!(100), "number"));
        assert!(!eval(json!("{{ amount }}"), "<", json!("100"), "number"));
        assert!(eval(json!("{{ amount }}"), "equals", json!(150.0), "number"));
        assert!(eval(json!("abc"), "equals", json!(0), "number"));
    }

    #[test]
    fn test_string_operators() {
        assert!(eval(json!("{{ name }}"), "startsWith", json!("Wid"), "string"));
        assert!(eval(json!("{{ name }}"), "endsWith", json!("get"), "string"));
        assert!(eval(json!("{{ name }}"), "regex", json!("^W.*t$"), "string"));
        assert!(eval(json!("{{ name }}"), "notContains", json!("zzz"), "string"));
        assert!(eval(json!(""), "isEmpty", Value::Null, "string"));
    }

    #[test]
    fn test_boolean_and_array_operators() {
        assert!(eval(json!("yes"), "isTrue", Value::Null, "boolean"));
        assert!(eval(json!("0"), "isFalse", Value::Null, "boolean"));
        assert!(eval(json!("{{ tags }}"), "contains", json!("b"), "array"));
        assert!(eval(json!("{{ tags }}"), "lengthEquals", json!(2), "array"));
        assert!(eval(json!("{{ tags }}"), "lengthGt", json!("1"), "array"));
    }

    #[test]
    fn test_single_element_arrays_keep_their_length() {
        let inputs = VisibleInputs::positional(vec![json!({
            "items": [{ "id": 1 }],
            "codes": ["A7"],
            "two": [1, 2],
            "headers": { "content-type": ["application/json"] }
        })]);
        let check = |left: &str, operator: &str, right: Value, value_type: &str| {
            evaluate_clause(&clause(json!(left), operator, right, value_type), &inputs).unwrap()
        };

        assert!(check("{{ two }}", "lengthEquals", json!(2), "array"));
        assert!(check("{{ items }}", "lengthEquals", json!(1), "array"));
        assert!(check("{{ items }}", "lengthGte", json!(1), "array"));
        assert!(!check("{{ items }}", "lengthLt", json!(1), "array"));
        assert!(check("{{ codes }}", "lengthEquals", json!(1), "array"));
        assert!(check("{{ codes }}", "contains", json!("A7"), "array"));
        assert!(check("{{ headers.content-type }}", "equals", json!("application/json"), "string"));
        assert!(check("{{ items }}", "isNotEmpty", Value::Null, "string"));
    }

    #[test]
    fn test_lone_expression_keeps_json_type() {
        let inputs = VisibleInputs::positional(vec![json!({ "at": 1_709_287_200, "flag": true })]);
        let at = operand(&json!("{{ at }}"), &inputs);
        assert_eq!(at, json!(1_709_287_200));
        assert_eq!(operand(&json!(" {{ flag }} "), &inputs), json!(true));
        assert_eq!(operand(&json!("at={{ at }}"), &inputs), json!("at=1709287200"));
        assert_eq!(operand(&json!("{{ missing }}"), &inputs), json!("{{ missing }}"));

        let after = clause(json!("{{ at }}"), "after", json!("2024-01-01"), "dateTime");
        assert!(evaluate_clause(&after, &inputs).unwrap());
    }

    #[test]
    fn test_dates_compare_and_unparseable_is_false() {
        assert!(eval(json!("2024-03-01"), "after", json!("2024-02-28T12:00:00Z"), "dateTime"));
        assert!(eval(json!("2024-03-01 10:00:00"), "equals", json!("2024-03-01T10:00:00Z"), "dateTime"));
        assert!(!eval(json!("not a date"), "before", json!("2024-01-01"), "dateTime"));
        assert!(!eval(json!("not a date"), "notEquals", json!("2024-01-01"), "dateTime"));
    }

    #[test]
    fn test_unknown_operator_and_bad_regex_fail() {
        let inputs = VisibleInputs::default();
        let unknown = evaluate_clause(&clause(json!(1), "approximately", json!(1), "number"), &inputs);
        assert!(matches!(unknown, Err(NodeError::Condition(_))));

        let bad_regex = evaluate_clause(&clause(json!("x"), "regex", json!("("), "string"), &inputs);
        assert!(matches!(bad_regex, Err(NodeError::Condition(_))));
    }

    #[test]
    fn test_combine_empty_lists() {
        assert!(combine(Combinator::And, &[]));
        assert!(!combine(Combinator::Or, &[]));
        assert!(combine(Combinator::Or, &[false, true]));
        assert!(!combine(Combinator::And, &[true, false]));
    }

    #[tokio::test]
    async fn test_output_shape() {
        let node: Node = serde_json::from_value(json!({
            "id": "check",
            "type": "conditional",
            "data": { "config": {
                "combine": "OR",
                "conditions": [
                    { "leftValue": "{{ amount }}", "operator": ">", "rightValue": 1000, "type": "number" },
                    { "leftValue": "{{ amount }}", "operator": ">", "rightValue": 100, "type": "number" }
                ]
            } }
        }))
        .unwrap();
        let inputs = VisibleInputs::positional(vec![json!({ "amount": 150 })]);

        let output = ConditionalHandler.execute(&node, &inputs, &RunContext::default()).await.unwrap();
        assert_eq!(
            output.to_value(),
            json!({ "result": true, "conditionResults": [false, true], "output": { "amount": 150 } })
        );
        assert_eq!(branch_result(&output), Some(true));
    }
}
