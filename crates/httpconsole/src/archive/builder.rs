//! Pure transformation from a captured request into a HAR entry.

use super::types::{ArchivedRequest, Entry, NameValue, PostData};
use crate::body::DecodedBody;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Everything the archive needs to know about one inbound request, after
/// body decoding has finished.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub started_at: DateTime<Utc>,
    pub client_ip: String,
    /// Effective method (after any override)
    pub method: String,
    /// Absolute URL: `{proto}://{hostname}{path_and_query}`
    pub url: String,
    /// Request target as sent, e.g. `/echo?a=1`
    pub path_and_query: String,
    /// `(major, minor)`, e.g. `(1, 1)`
    pub version: (u8, u8),
    /// Lower-cased names, repeated headers folded into one value
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub query: Map<String, Value>,
    pub body: DecodedBody,
}

impl CapturedRequest {
    /// `HTTP/x.y` string for the archive.
    pub fn http_version(&self) -> String {
        let (major, minor) = self.version;
        if minor == 0 && major >= 2 {
            format!("HTTP/{major}")
        } else {
            format!("HTTP/{major}.{minor}")
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Build the HAR entry for a captured request.
pub fn build_entry(request: &CapturedRequest) -> Entry {
    Entry {
        started_date_time: request
            .started_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        client_ip_address: request.client_ip.clone(),
        request: ArchivedRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            http_version: request.http_version(),
            cookies: string_pairs(&request.cookies),
            headers: string_pairs(&request.headers),
            query_string: value_pairs(&request.query),
            post_data: PostData {
                mime_type: request.body.mime_type().to_string(),
                text: request.body.text.clone(),
                params: request.body.params(),
            },
            headers_size: estimate_headers_size(request),
            body_size: request.body.size() as u64,
        },
    }
}

/// Estimate of the request line plus header block size.
///
/// This is computed, not measured off the wire: the byte length of
/// `method + target + major + minor + names.join(",") + values.join(",")`,
/// plus 2 bytes per header line terminator, plus 12 for the request line
/// framing and 2 for the blank line that ends the header block.
pub fn estimate_headers_size(request: &CapturedRequest) -> u64 {
    let (major, minor) = request.version;
    let names: Vec<&str> = request.headers.keys().map(String::as_str).collect();
    let values: Vec<&str> = request.headers.values().map(String::as_str).collect();

    let joined = format!(
        "{}{}{}{}{}{}",
        request.method,
        request.path_and_query,
        major,
        minor,
        names.join(","),
        values.join(",")
    );

    (joined.len() + request.headers.len() * 2 + 12 + 2) as u64
}

/// Mapping -> `{name, value}` list. Iterates the mapping's key set; callers
/// must not rely on the resulting order.
fn string_pairs(map: &BTreeMap<String, String>) -> Vec<NameValue> {
    map.iter()
        .map(|(name, value)| NameValue::new(name.clone(), value.clone()))
        .collect()
}

fn value_pairs(map: &Map<String, Value>) -> Vec<NameValue> {
    map.iter()
        .map(|(name, value)| NameValue::new(name.clone(), value.clone()))
        .collect()
}
