//! Block-style YAML with a configurable inline depth.
//!
//! Nesting levels up to `inline_depth` are written in block style; anything
//! deeper collapses into flow style (`{ a: 1, b: [x, y] }`). serde_yaml has no
//! such knob, so only scalar quoting is delegated to it.

use serde_json::Value;

const INDENT: usize = 2;

/// Render `value` as YAML, switching to flow style below `inline_depth` levels.
pub fn to_yaml(value: &Value, inline_depth: usize) -> String {
    let mut out = String::new();
    write_block(&mut out, value, inline_depth, 0);
    out
}

fn is_inline(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => true,
    }
}

fn write_block(out: &mut String, value: &Value, inline_depth: usize, level: usize) {
    let pad = " ".repeat(level);

    if inline_depth == 0 || is_inline(value) {
        out.push_str(&pad);
        out.push_str(&flow(value));
        return;
    }

    let children: Vec<(Option<&str>, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
        Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
        _ => Vec::new(),
    };

    let child_depth = inline_depth - 1;
    for (key, child) in children {
        out.push_str(&pad);
        match key {
            Some(key) => {
                out.push_str(&scalar_string(key, false));
                out.push(':');
            }
            None => out.push('-'),
        }

        if child_depth == 0 || is_inline(child) {
            out.push(' ');
            out.push_str(&flow(child));
            out.push('\n');
        } else {
            out.push('\n');
            write_block(out, child, child_depth, level + INDENT);
        }
    }
}

/// Flow-style rendering of any value.
fn flow(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => scalar_string(s, true),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(flow).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", scalar_string(k, true), flow(v)))
                .collect();
            format!("{{ {} }}", inner.join(", "))
        }
    }
}

/// Plain or quoted scalar. Multi-line strings and strings containing flow
/// indicators (inside flow collections) use double-quoted JSON escapes.
fn scalar_string(s: &str, in_flow: bool) -> String {
    let needs_double_quotes = s.chars().any(char::is_control)
        || (in_flow && s.contains([',', '[', ']', '{', '}']));

    if !needs_double_quotes {
        if let Ok(rendered) = serde_yaml::to_string(s) {
            let rendered = rendered.trim_end_matches('\n');
            if !rendered.contains('\n') {
                return rendered.to_string();
            }
        }
    }

    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}
