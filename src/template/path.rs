/// Path parsing and JSON navigation for template expressions
///
/// Paths are dotted with optional bracket indexes at every segment:
/// `body.items[0].name`, `headers.content-type`, `rows.2.id`, `data["a.b"]`.

use serde_json::Value;

/// One navigation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object key (numeric keys also index arrays)
    Key(String),
    /// Bracketed array index
    Index(usize),
}

/// Split a path into navigation steps
///
/// Dots inside brackets don't split. Bracket contents that are not integers
/// become keys, with surrounding quotes stripped.
pub fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in split_dotted(path) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (head, mut brackets) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !head.is_empty() {
            segments.push(Segment::Key(head.to_string()));
        }

        while let Some(rest) = brackets.strip_prefix('[') {
            let Some(close) = rest.find(']') else {
                // Unbalanced bracket: keep the remainder as a literal key
                segments.push(Segment::Key(brackets.to_string()));
                break;
            };
            let inner = rest[..close].trim();
            match inner.parse::<usize>() {
                Ok(index) => segments.push(Segment::Index(index)),
                Err(_) => segments.push(Segment::Key(strip_quotes(inner).to_string())),
            }
            brackets = &rest[close + 1..];
        }
    }
    segments
}

fn split_dotted(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (pos, ch) in path.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                parts.push(&path[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(&path[start..]);
    parts
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')))
        .unwrap_or(s)
}

/// Walk `segments` from `root`
///
/// A key lookup that meets a single-element array looks inside its element.
/// The value at the end of the path is returned as stored; arrays keep their
/// shape.
pub fn navigate<'a>(root: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Key(key), Value::Array(items)) => match key.parse::<usize>() {
                Ok(index) => items.get(index)?,
                Err(_) if items.len() == 1 => items[0].get(key.as_str())?,
                Err(_) => return None,
            },
            (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
            (Segment::Index(index), Value::Object(map)) => map.get(&index.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Header-style `["value"]` arrays read as their only scalar
///
/// Arrays holding one object or array, or more than one item, are left alone.
pub fn unwrap_scalar(value: &Value) -> &Value {
    match value {
        Value::Array(items) if items.len() == 1 && !items[0].is_object() && !items[0].is_array() => &items[0],
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("body.items[0].name"),
            vec![
                Segment::Key("body".into()),
                Segment::Key("items".into()),
                Segment::Index(0),
                Segment::Key("name".into()),
            ]
        );
        assert_eq!(
            parse_path("input-1[2][3]"),
            vec![Segment::Key("input-1".into()), Segment::Index(2), Segment::Index(3)]
        );
        assert_eq!(
            parse_path("data['a.b'].c"),
            vec![Segment::Key("data".into()), Segment::Key("a.b".into()), Segment::Key("c".into())]
        );
    }

    #[test]
    fn test_navigate_keeps_final_arrays() {
        let value = json!({ "headers": { "content-type": ["application/json"] }, "items": [{ "id": 1 }] });
        let header = navigate(&value, &parse_path("headers.content-type"));
        assert_eq!(header, Some(&json!(["application/json"])));
        assert_eq!(header.map(unwrap_scalar), Some(&json!("application/json")));

        let items = navigate(&value, &parse_path("items"));
        assert_eq!(items, Some(&json!([{ "id": 1 }])));
        assert_eq!(items.map(unwrap_scalar), Some(&json!([{ "id": 1 }])));
        assert_eq!(unwrap_scalar(&json!(["a", "b"])), &json!(["a", "b"]));
    }

    #[test]
    fn test_navigate_through_single_element_array() {
        let value = json!({ "rows": [{ "id": 7 }] });
        assert_eq!(navigate(&value, &parse_path("rows.id")), Some(&json!(7)));
        assert_eq!(navigate(&value, &parse_path("rows[0].id")), Some(&json!(7)));
        assert_eq!(navigate(&value, &parse_path("rows.0.id")), Some(&json!(7)));
    }

    #[test]
    fn test_navigate_misses() {
        let value = json!({ "rows": [{ "id": 1 }, { "id": 2 }] });
        assert_eq!(navigate(&value, &parse_path("rows.id")), None);
        assert_eq!(navigate(&value, &parse_path("rows[5]")), None);
        assert_eq!(navigate(&value, &parse_path("rows[1].id.deeper")), None);
    }
}
