/// Template expressions
///
/// `{{ ... }}` placeholders embedded in node configuration strings, resolved
/// against the outputs a node can see. The syntax is shared with saved
/// workflows and must stay stable.

// Dotted/bracketed path parsing and JSON navigation
pub mod path;

// Expression lookup and destination-aware substitution
pub mod resolver;

pub use resolver::{
    contains_expression, lookup, resolve, resolve_in_json, resolve_in_script, resolve_value, single_expression,
    to_plain_text,
};
