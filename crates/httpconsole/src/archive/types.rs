//! HAR 1.2 record types for captured requests and stored bucket responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HAR format version written into every envelope
pub const HAR_VERSION: &str = "1.2";

/// Creator name written into every envelope
pub const CREATOR_NAME: &str = "httpconsole";

/// Top-level HAR document: `{"log": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Har {
    pub log: HarLog,
}

impl Har {
    /// Wrap entries in a HAR envelope stamped with this build's creator info.
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            log: HarLog {
                version: HAR_VERSION.to_string(),
                creator: Creator::current(),
                entries,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarLog {
    pub version: String,
    pub creator: Creator,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    pub version: String,
}

impl Creator {
    pub fn current() -> Self {
        Self {
            name: CREATOR_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One captured request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Arrival time, RFC 3339 with millisecond precision
    pub started_date_time: String,
    #[serde(rename = "clientIPAddress")]
    pub client_ip_address: String,
    pub request: ArchivedRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedRequest {
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub cookies: Vec<NameValue>,
    pub headers: Vec<NameValue>,
    pub query_string: Vec<NameValue>,
    pub post_data: PostData,
    /// Estimated size of the request line and headers, see `archive::builder`
    pub headers_size: u64,
    pub body_size: u64,
}

/// A `{name, value}` pair. Values are usually strings, but nested query and
/// form keys (`a[b]=1`) produce objects or lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: Value,
}

impl NameValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    pub mime_type: String,
    pub text: String,
    /// Only populated for form-encoded and multipart bodies
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    pub name: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

// =============================================================================
// Stored bucket responses
// =============================================================================

/// Client-supplied HAR response stored in a bucket.
///
/// Documents are schema-checked before they are stored, so the defaults here
/// only cover optional HAR members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseArchive {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub http_version: String,
    #[serde(default)]
    pub cookies: Vec<ArchivedCookie>,
    #[serde(default)]
    pub headers: Vec<ArchivedHeader>,
    #[serde(default)]
    pub content: Content,
    #[serde(default, rename = "redirectURL")]
    pub redirect_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_har_envelope_shape() {
        let har = Har::new(vec![]);
        let value = serde_json::to_value(&har).unwrap();
        assert_eq!(value["log"]["version"], "1.2");
        assert_eq!(value["log"]["creator"]["name"], "httpconsole");
        assert_eq!(value["log"]["entries"], json!([]));
    }

    #[test]
    fn test_param_omits_absent_file_fields() {
        let param = Param {
            name: "a".to_string(),
            value: json!("1"),
            file_name: None,
            content_type: None,
        };
        assert_eq!(
            serde_json::to_value(&param).unwrap(),
            json!({"name": "a", "value": "1"})
        );
    }

    #[test]
    fn test_response_archive_reads_har_field_names() {
        let archive: ResponseArchive = serde_json::from_value(json!({
            "status": 201,
            "statusText": "Created",
            "httpVersion": "HTTP/1.1",
            "headers": [{"name": "X-Test", "value": "yes"}],
            "cookies": [{"name": "session", "value": "abc", "httpOnly": true}],
            "content": {"mimeType": "text/plain", "text": "hello", "size": 5},
            "redirectURL": "",
            "headersSize": -1,
            "bodySize": 5
        }))
        .unwrap();

        assert_eq!(archive.status, 201);
        assert_eq!(archive.status_text, "Created");
        assert_eq!(archive.headers[0].name, "X-Test");
        assert_eq!(archive.cookies[0].http_only, Some(true));
        assert_eq!(archive.content.text.as_deref(), Some("hello"));
        assert!(archive.redirect_url.is_empty());
    }
}
