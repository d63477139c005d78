//! Request body decoding.
//!
//! The whole body is buffered before any parsing decision is made. Dispatch is
//! on the normalized media type of the `Content-Type` header:
//!
//! - `application/json`: parsed into `json`; malformed JSON leaves `json`
//!   empty and is otherwise tolerated
//! - `application/x-www-form-urlencoded`: nested name -> value mapping in `form`
//! - `multipart/form-data`: ordered part list in `multipart`; bad framing is
//!   a [`ConsoleError::MalformedBody`]
//! - anything else: text only
//!
//! # Module Structure
//!
//! - `media_type` - `Content-Type` parsing
//! - `form` - urlencoded decoding with bracketed keys (also used for query strings)
//! - `multipart` - multipart/form-data framing

pub mod form;
pub mod media_type;
pub mod multipart;

use crate::archive::Param;
use crate::error::ConsoleError;
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::debug;

/// Media type recorded in the archive when the request declares none
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A fully buffered and decoded request body.
#[derive(Debug, Clone, Default)]
pub struct DecodedBody {
    /// Normalized `type/subtype[+suffix]`
    pub content_type: Option<String>,
    pub raw: Bytes,
    /// Raw bytes as UTF-8 (lossy)
    pub text: String,
    pub json: Option<Value>,
    pub form: Option<Map<String, Value>>,
    pub multipart: Option<Vec<Param>>,
}

impl DecodedBody {
    /// Decode `raw` according to the request's `Content-Type` header.
    pub fn decode(content_type: Option<&str>, raw: Bytes) -> Result<Self, ConsoleError> {
        let media = content_type.and_then(media_type::parse);
        let text = String::from_utf8_lossy(&raw).into_owned();

        let mut decoded = DecodedBody {
            content_type: media.as_ref().map(|m| m.essence.clone()),
            raw,
            text,
            ..Default::default()
        };

        let Some(media) = media else {
            return Ok(decoded);
        };

        match media.essence.as_str() {
            "application/json" => match serde_json::from_str(&decoded.text) {
                Ok(value) => decoded.json = Some(value),
                Err(e) => {
                    debug!(error = %e, bytes = decoded.raw.len(), "Ignoring malformed JSON body");
                }
            },
            "application/x-www-form-urlencoded" => {
                decoded.form = Some(form::parse_nested(&decoded.text));
            }
            "multipart/form-data" => {
                let boundary = media.boundary.as_deref().ok_or_else(|| {
                    ConsoleError::MalformedBody(
                        "multipart/form-data: missing boundary parameter".to_string(),
                    )
                })?;
                decoded.multipart = Some(multipart::parse_multipart(&decoded.raw, boundary)?);
            }
            _ => {}
        }

        Ok(decoded)
    }

    /// Exact byte length of the body as received.
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// Media type for the archive's `postData.mimeType`.
    pub fn mime_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }

    /// Structured parameters for the archive's `postData.params`.
    ///
    /// Empty unless the body was form-encoded or multipart.
    pub fn params(&self) -> Vec<Param> {
        if let Some(parts) = &self.multipart {
            return parts.clone();
        }
        self.form
            .as_ref()
            .map(|form| {
                form.iter()
                    .map(|(name, value)| Param {
                        name: name.clone(),
                        value: value.clone(),
                        file_name: None,
                        content_type: None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
