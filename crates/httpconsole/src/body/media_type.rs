//! `Content-Type` parsing and normalization.

use mime::Mime;

/// A parsed `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// `type/subtype[+suffix]`, lower-cased, parameters dropped
    pub essence: String,
    /// `boundary` parameter, when present
    pub boundary: Option<String>,
}

/// Parse a `Content-Type` value, returning `None` when it is not a valid media type.
pub fn parse(value: &str) -> Option<MediaType> {
    let mime: Mime = value.trim().parse().ok()?;

    let mut essence = format!("{}/{}", mime.type_(), mime.subtype());
    if let Some(suffix) = mime.suffix() {
        if !suffix.as_str().is_empty() {
            essence.push('+');
            essence.push_str(suffix.as_str());
        }
    }

    let boundary = mime
        .get_param(mime::BOUNDARY)
        .map(|b| b.as_str().to_string())
        .filter(|b| !b.is_empty());

    Some(MediaType {
        essence: essence.to_ascii_lowercase(),
        boundary,
    })
}
