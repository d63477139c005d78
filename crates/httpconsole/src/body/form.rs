//! `application/x-www-form-urlencoded` decoding with bracketed keys.
//!
//! Keys follow the common nested-form convention:
//!
//! - `a=1&b=2` -> `{"a": "1", "b": "2"}`
//! - `a=1&a=2` -> `{"a": ["1", "2"]}`
//! - `a[]=1&a[]=2` -> `{"a": ["1", "2"]}`
//! - `user[name]=x&user[tags][]=y` -> `{"user": {"name": "x", "tags": ["y"]}}`
//!
//! The same decoding is applied to query strings.

use serde_json::{Map, Value};

/// Decode a urlencoded string into a nested name -> value mapping.
pub fn parse_nested(input: &str) -> Map<String, Value> {
    let mut root = Value::Object(Map::new());

    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        let path = split_key(&key);
        assign(&mut root, &path, Value::String(value.into_owned()));
    }

    match root {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Bracket segments honoured per key; deeper brackets stay one literal segment.
pub const MAX_DEPTH: usize = 5;

/// Split `a[b][]` into `["a", "b", ""]`. Keys without a well-formed bracket
/// suffix are kept whole.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while segments.len() <= MAX_DEPTH {
        let Some(inner) = rest.strip_prefix('[') else {
            break;
        };
        let Some(close) = inner.find(']') else {
            break;
        };
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }

    if rest.is_empty() {
        segments
    } else if segments.len() > MAX_DEPTH && rest.starts_with('[') {
        segments.push(rest.to_string());
        segments
    } else {
        vec![key.to_string()]
    }
}

fn is_list_segment(segment: &str) -> bool {
    segment.is_empty() || segment.parse::<usize>().is_ok()
}

fn container_for(segment: &str) -> Value {
    if is_list_segment(segment) {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Place `value` at `path` below `slot`. `Value::Null` marks a vacant slot.
fn assign(slot: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        match slot {
            Value::Null => *slot = value,
            Value::Array(items) => items.push(value),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value]);
            }
        }
        return;
    };

    if !(slot.is_object() || slot.is_array()) {
        *slot = container_for(head);
    }

    // A named key below a list turns the list into an index-keyed object.
    if let Value::Array(items) = slot {
        if !is_list_segment(head) {
            let map: Map<String, Value> = std::mem::take(items)
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect();
            *slot = Value::Object(map);
        }
    }

    match slot {
        Value::Array(items) => {
            let index = match head.parse::<usize>() {
                Ok(index) if index < items.len() => index,
                _ => {
                    items.push(Value::Null);
                    items.len() - 1
                }
            };
            assign(&mut items[index], rest, value);
        }
        Value::Object(map) => {
            let key = if head.is_empty() {
                map.len().to_string()
            } else {
                head.clone()
            };
            assign(map.entry(key).or_insert(Value::Null), rest, value);
        }
        _ => {}
    }
}
