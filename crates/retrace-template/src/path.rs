//! Dot/bracket accessor for JSON documents, e.g. `data.items[2].name`.

use serde_json::Value;

#[derive(Debug, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

fn parse(path: &str) -> Option<Vec<Segment>> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
                let inner: String = chars.by_ref().take_while(|c| *c != ']').collect();
                let inner = inner.trim();
                match inner.parse::<usize>() {
                    Ok(idx) => segments.push(Segment::Index(idx)),
                    Err(_) => {
                        let key = inner.trim_matches(|c| c == '"' || c == '\'');
                        if key.is_empty() {
                            return None;
                        }
                        segments.push(Segment::Key(key.to_string()));
                    }
                }
            }
            ']' => return None,
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(Segment::Key(current));
    }
    Some(segments)
}

/// Value at `path`, or `None` when any step is missing. An empty path is the document itself.
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in parse(path)? {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(&key)?,
            (Segment::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?)?,
            (Segment::Index(idx), Value::Array(items)) => items.get(idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Text form of a JSON value. Strings are unquoted; `null` counts as missing.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "data": {
                "items": [
                    {"name": "first"},
                    {"name": "second", "tags": ["a", "b", "c"]}
                ],
                "count": 2,
                "empty": null
            }
        })
    }

    #[test]
    fn test_nested_access() {
        let doc = sample();
        assert_eq!(extract_path(&doc, "data.items[1].name"), Some(&json!("second")));
        assert_eq!(extract_path(&doc, "data.items[1].tags[2]"), Some(&json!("c")));
        assert_eq!(extract_path(&doc, "$.data.count"), Some(&json!(2)));
    }

    #[test]
    fn test_bracket_keys_and_numeric_dots() {
        let doc = sample();
        assert_eq!(extract_path(&doc, "data['items'][0].name"), Some(&json!("first")));
        assert_eq!(extract_path(&doc, "data.items.0.name"), Some(&json!("first")));
    }

    #[test]
    fn test_missing_steps() {
        let doc = sample();
        assert_eq!(extract_path(&doc, "data.items[5].name"), None);
        assert_eq!(extract_path(&doc, "data.count.value"), None);
        assert_eq!(extract_path(&doc, "data.items[0"), Some(&json!({"name": "first"})));
        assert_eq!(extract_path(&doc, "data]"), None);
    }

    #[test]
    fn test_empty_path_is_root() {
        let doc = json!("token");
        assert_eq!(extract_path(&doc, ""), Some(&doc));
    }

    #[test]
    fn test_value_to_text() {
        let doc = sample();
        assert_eq!(value_to_text(&json!("x")), Some("x".to_string()));
        assert_eq!(value_to_text(&json!(2)), Some("2".to_string()));
        assert_eq!(value_to_text(&json!(true)), Some("true".to_string()));
        assert_eq!(value_to_text(extract_path(&doc, "data.empty").unwrap()), None);
    }
}
