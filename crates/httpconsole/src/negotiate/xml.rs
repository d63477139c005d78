//! Markup rendering of arbitrary JSON payloads.
//!
//! Output is an indented XML fragment (no declaration, no forced root):
//! object members become elements, arrays become repeated elements named after
//! their member, scalars become text. Payloads that are not objects are
//! presented under a `<result>` element; the payload itself is never modified.

use quick_xml::events::BytesText;
use quick_xml::Writer;
use serde_json::Value;
use std::io::{self, Write};

/// Element used for non-object payloads
const ENVELOPE: &str = "result";

/// Render `payload` as pretty-printed XML.
pub fn to_xml(payload: &Value) -> io::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    match payload {
        Value::Object(map) => {
            for (name, value) in map {
                write_element(&mut writer, name, value)?;
            }
        }
        other => write_element(&mut writer, ENVELOPE, other)?,
    }

    let xml = String::from_utf8(writer.into_inner())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(xml.trim().to_string())
}

fn write_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &Value) -> io::Result<()> {
    let tag = element_name(name);

    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
        }
        Value::Null => {
            writer.create_element(tag.as_str()).write_empty()?;
        }
        Value::Object(map) if map.is_empty() => {
            writer.create_element(tag.as_str()).write_empty()?;
        }
        Value::Object(map) => {
            writer
                .create_element(tag.as_str())
                .write_inner_content(|w| {
                    for (child_name, child) in map {
                        write_element(w, child_name, child)?;
                    }
                    Ok(())
                })?;
        }
        Value::String(s) => {
            writer
                .create_element(tag.as_str())
                .write_text_content(BytesText::new(s))?;
        }
        scalar => {
            let text = scalar.to_string();
            writer
                .create_element(tag.as_str())
                .write_text_content(BytesText::new(&text))?;
        }
    }

    Ok(())
}

/// Turn an arbitrary member name into a valid XML element name.
fn element_name(name: &str) -> String {
    let mut tag: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let starts_ok = tag
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if !starts_ok {
        tag.insert(0, '_');
    }
    tag
}
