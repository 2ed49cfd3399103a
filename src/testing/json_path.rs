//! Minimal dotted path lookup: `booking.firstname`, `results[0].id`,
//! `items.2`. `$` or an empty path selects the whole document.

use serde_json::Value;

pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for segment in path.split('.') {
        let (name, indexes) = split_indexes(segment)?;
        if !name.is_empty() {
            current = step(current, name)?;
        }
        for index in indexes {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

/// Render a value the way it should be stored or compared as text.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn step<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(name),
        Value::Array(items) => items.get(name.parse::<usize>().ok()?),
        _ => None,
    }
}

fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };

    let name = &segment[..open];
    let mut indexes = Vec::new();
    let mut rest = &segment[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let close = inner.find(']')?;
        indexes.push(inner[..close].trim().parse().ok()?);
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return None;
    }
    Some((name, indexes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn resolves_nested_fields_and_indexes() {
        let doc = json!({
            "bookingid": 5,
            "booking": { "firstname": "Carol", "tags": ["a", "b"] },
            "results": [{ "id": 1 }, { "id": 2 }]
        });

        assert_eq!(lookup(&doc, "bookingid"), Some(&json!(5)));
        assert_eq!(lookup(&doc, "booking.firstname"), Some(&json!("Carol")));
        assert_eq!(lookup(&doc, "booking.tags[1]"), Some(&json!("b")));
        assert_eq!(lookup(&doc, "$.results[1].id"), Some(&json!(2)));
        assert_eq!(lookup(&doc, "results.0.id"), Some(&json!(1)));
        assert_eq!(lookup(&doc, "$"), Some(&doc));
    }

    #[test]
    fn missing_fields_are_none() {
        let doc = json!({ "results": [] });
        assert!(lookup(&doc, "results[0]").is_none());
        assert!(lookup(&doc, "token").is_none());
        assert!(lookup(&doc, "results[x]").is_none());
    }

    #[test]
    fn to_text_unquotes_strings() {
        assert_eq!(to_text(&json!("abc")), "abc");
        assert_eq!(to_text(&json!(42)), "42");
    }
}
