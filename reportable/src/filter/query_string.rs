//! Nested-bracket query string encoding
//!
//! Encodes JSON values as `key[0][column]=...` pairs and parses them back.
//! Decoding is lossy: every leaf comes back as a string.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Encode `value` under `key` as a URL query string
///
/// Nulls are skipped and booleans become `1` / `0`.
pub fn build_query(key: &str, value: &Value) -> String {
    let mut pairs = Vec::new();
    flatten(key.to_string(), value, &mut pairs);

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in &pairs {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}

fn flatten(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((prefix, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((prefix, n.to_string())),
        Value::String(s) => out.push((prefix, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{}[{}]", prefix, index), item, out);
            }
        }
        Value::Object(map) => {
            for (name, item) in map {
                flatten(format!("{}[{}]", prefix, name), item, out);
            }
        }
    }
}

/// Parse a query string into nested parameters
///
/// Objects whose keys are all numeric indexes become arrays ordered by index.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut root = Map::new();

    for (name, value) in form_urlencoded::parse(query.as_bytes()) {
        let path = split_key(&name);
        insert(&mut root, &path, Value::String(value.into_owned()));
    }

    root.into_iter().map(|(k, v)| (k, normalize(v))).collect()
}

fn split_key(name: &str) -> Vec<String> {
    let Some(open) = name.find('[') else {
        return vec![name.to_string()];
    };
    if open == 0 {
        return vec![name.to_string()];
    }

    let (base, mut rest) = name.split_at(open);
    let mut path = vec![base.to_string()];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            break;
        };
        path.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    path
}

fn insert(node: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((head, tail)) = path.split_first() else {
        return;
    };
    // `key[]` appends
    let key = if head.is_empty() {
        node.len().to_string()
    } else {
        head.clone()
    };

    if tail.is_empty() {
        node.insert(key, value);
        return;
    }

    let child = node
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(map) = child {
        insert(map, tail, value);
    }
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let indexed = !map.is_empty() && map.keys().all(|k| k.parse::<usize>().is_ok());
            if indexed {
                let mut items: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, normalize(v))))
                    .collect();
                items.sort_by_key(|(index, _)| *index);
                Value::Array(items.into_iter().map(|(_, v)| v).collect())
            } else {
                Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect())
            }
        }
        other => other,
    }
}
