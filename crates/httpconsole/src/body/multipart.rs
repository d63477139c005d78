//! `multipart/form-data` parser.
//!
//! Works on the already-collected body bytes. Every part becomes one
//! [`Param`] in the order it appears. Framing problems (no opening boundary,
//! a part that never reaches the next boundary, a missing closing boundary,
//! a part without a field name) are reported as
//! [`ConsoleError::MalformedBody`] instead of being dropped.

use super::media_type;
use crate::archive::Param;
use crate::error::ConsoleError;
use serde_json::Value;

/// Parse a multipart body delimited by `boundary`.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<Param>, ConsoleError> {
    let delimiter = format!("--{boundary}");
    let next_delimiter = format!("\r\n--{boundary}");

    // Skip the preamble (everything before the first delimiter).
    let start = find_bytes(body, delimiter.as_bytes())
        .ok_or_else(|| malformed("opening boundary not found"))?;
    let mut remaining = &body[start + delimiter.len()..];
    let mut params = Vec::new();

    loop {
        if remaining.starts_with(b"--") {
            return Ok(params);
        }

        remaining = skip_padding(remaining)
            .strip_prefix(b"\r\n")
            .ok_or_else(|| malformed("expected line break after boundary"))?;

        let end = find_bytes(remaining, next_delimiter.as_bytes())
            .ok_or_else(|| malformed("part is not terminated by a boundary"))?;

        params.push(parse_part(&remaining[..end])?);
        remaining = &remaining[end + next_delimiter.len()..];
    }
}

/// Parse a single part: headers, blank line, value.
fn parse_part(part: &[u8]) -> Result<Param, ConsoleError> {
    let (headers, value) = match part.strip_prefix(b"\r\n") {
        // No headers at all
        Some(value) => (&b""[..], value),
        None => split_headers_body(part)
            .ok_or_else(|| malformed("part headers are not terminated"))?,
    };

    let headers = String::from_utf8_lossy(headers);
    let mut name = None;
    let mut file_name = None;
    let mut content_type = None;

    for line in headers.split("\r\n") {
        let Some((header, header_value)) = line.split_once(':') else {
            continue;
        };
        let header_value = header_value.trim();

        if header.trim().eq_ignore_ascii_case("content-disposition") {
            for (param, param_value) in disposition_params(header_value) {
                match param.as_str() {
                    "name" => name = Some(param_value),
                    "filename" => file_name = Some(param_value),
                    _ => {}
                }
            }
        } else if header.trim().eq_ignore_ascii_case("content-type") {
            content_type = media_type::parse(header_value).map(|m| m.essence);
        }
    }

    let name = name.ok_or_else(|| malformed("part has no field name"))?;

    Ok(Param {
        name,
        value: Value::String(String::from_utf8_lossy(value).into_owned()),
        file_name,
        content_type,
    })
}

/// Parameters of a `Content-Disposition` value, names lower-cased and
/// values unquoted. Semicolons inside quoted values are kept.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in value.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .skip(1) // disposition type, e.g. `form-data`
        .filter_map(|segment| {
            let (name, value) = segment.split_once('=')?;
            Some((name.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

fn malformed(reason: &str) -> ConsoleError {
    ConsoleError::MalformedBody(format!("multipart/form-data: {reason}"))
}

/// Split a part into headers and body at the first blank line.
fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

/// Skip linear whitespace allowed after a boundary delimiter.
fn skip_padding(data: &[u8]) -> &[u8] {
    let count = data
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    &data[count..]
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BOUNDARY: &str = "XyZ123";

    fn body(parts: &[&str]) -> Vec<u8> {
        let mut out = String::new();
        for part in parts {
            out.push_str(&format!("--{BOUNDARY}\r\n{part}\r\n"));
        }
        out.push_str(&format!("--{BOUNDARY}--\r\n"));
        out.into_bytes()
    }

    #[test]
    fn test_fields_in_order() {
        let data = body(&[
            "Content-Disposition: form-data; name=\"first\"\r\n\r\nalpha",
            "Content-Disposition: form-data; name=\"second\"\r\n\r\nbeta",
        ]);
        let params = parse_multipart(&data, BOUNDARY).unwrap();

        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "first");
        assert_eq!(params[0].value, json!("alpha"));
        assert_eq!(params[1].name, "second");
        assert_eq!(params[1].value, json!("beta"));
        assert!(params[0].file_name.is_none());
    }

    #[test]
    fn test_file_part() {
        let data = body(&[
            "Content-Disposition: form-data; name=\"upload\"; filename=\"a;b.txt\"\r\nContent-Type: text/plain; charset=utf-8\r\n\r\nline one\r\nline two",
        ]);
        let params = parse_multipart(&data, BOUNDARY).unwrap();

        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "upload");
        assert_eq!(params[0].file_name.as_deref(), Some("a;b.txt"));
        assert_eq!(params[0].content_type.as_deref(), Some("text/plain"));
        assert_eq!(params[0].value, json!("line one\r\nline two"));
    }

    #[test]
    fn test_preamble_is_ignored() {
        let mut data = b"this is a preamble\r\n".to_vec();
        data.extend(body(&[
            "Content-Disposition: form-data; name=\"a\"\r\n\r\n1",
        ]));
        let params = parse_multipart(&data, BOUNDARY).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].value, json!("1"));
    }

    #[test]
    fn test_empty_value() {
        let data = body(&["Content-Disposition: form-data; name=\"empty\"\r\n\r\n"]);
        let params = parse_multipart(&data, BOUNDARY).unwrap();
        assert_eq!(params[0].value, json!(""));
    }

    #[test]
    fn test_missing_opening_boundary() {
        let err = parse_multipart(b"no boundary here", BOUNDARY).unwrap_err();
        assert!(matches!(err, ConsoleError::MalformedBody(_)));
    }

    #[test]
    fn test_truncated_part() {
        let data = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nhalf a val"
        );
        let err = parse_multipart(data.as_bytes(), BOUNDARY).unwrap_err();
        assert!(matches!(err, ConsoleError::MalformedBody(_)));
    }

    #[test]
    fn test_missing_closing_boundary() {
        let data = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--{BOUNDARY}\r\n"
        );
        let err = parse_multipart(data.as_bytes(), BOUNDARY).unwrap_err();
        assert!(matches!(err, ConsoleError::MalformedBody(_)));
    }

    #[test]
    fn test_part_without_name() {
        let data = body(&["Content-Type: text/plain\r\n\r\nvalue"]);
        let err = parse_multipart(&data, BOUNDARY).unwrap_err();
        assert!(matches!(err, ConsoleError::MalformedBody(_)));
    }

    #[test]
    fn test_unterminated_headers() {
        let data = body(&["Content-Disposition: form-data; name=\"a\""]);
        let err = parse_multipart(&data, BOUNDARY).unwrap_err();
        assert!(matches!(err, ConsoleError::MalformedBody(_)));
    }

    #[test]
    fn test_disposition_params() {
        let params = disposition_params("form-data; Name=\"field\"; filename=\"x \\\"y\\\".txt\"");
        assert_eq!(
            params,
            vec![
                ("name".to_string(), "field".to_string()),
                ("filename".to_string(), "x \"y\".txt".to_string()),
            ]
        );
    }
}
