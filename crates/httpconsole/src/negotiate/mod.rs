//! Content negotiation.
//!
//! A handler produces a JSON payload; this module turns it into wire bytes in
//! whatever representation the client prefers. Formats are tried in the order
//! of [`FORMATS`], which also decides the winner for `*/*` and missing
//! `Accept` headers. Anything unmatched goes through the default branch.

mod views;
mod xml;
mod yaml;

pub use views::{BuiltinViews, ViewRenderer, KNOWN_VIEWS};
pub use xml::to_xml;
pub use yaml::to_yaml;

use crate::error::ConsoleError;
use mime::Mime;
use serde_json::Value;
use std::sync::Arc;

/// Inline depth of the YAML fallback for browsers.
pub const HTML_INLINE_DEPTH: usize = 3;

/// Inline depth of the YAML used by the default branch.
pub const DEFAULT_INLINE_DEPTH: usize = 6;

/// Query parameter that turns JSON into a callback invocation.
pub const CALLBACK_PARAM: &str = "__callback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
    Html,
}

/// Priority-ordered format table.
///
/// `text/xml` sits below HTML so that `text/*` picks HTML.
pub const FORMATS: &[(Format, &[&str])] = &[
    (Format::Json, &["application/json"]),
    (Format::Xml, &["application/xml"]),
    (Format::Html, &["text/html"]),
    (Format::Xml, &["text/xml"]),
];

/// One entry of an `Accept` header.
#[derive(Debug, Clone)]
struct MediaRange {
    mime: Mime,
    quality: f32,
    specificity: u8,
    index: usize,
}

impl MediaRange {
    fn matches(&self, candidate: &str) -> bool {
        let Some((kind, subtype)) = candidate.split_once('/') else {
            return false;
        };
        let range_type = self.mime.type_().as_str();
        let range_subtype = self.mime.subtype().as_str();

        (range_type == "*" || range_type.eq_ignore_ascii_case(kind))
            && (range_subtype == "*" || range_subtype.eq_ignore_ascii_case(subtype))
    }
}

fn parse_accept(header: &str) -> Vec<MediaRange> {
    let mut ranges: Vec<MediaRange> = header
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .enumerate()
        .filter_map(|(index, part)| {
            let mime: Mime = part.parse().ok()?;
            let quality = mime
                .get_param("q")
                .and_then(|q| q.as_str().parse::<f32>().ok())
                .unwrap_or(1.0);
            let specificity = match (mime.type_().as_str(), mime.subtype().as_str()) {
                ("*", _) => 0,
                (_, "*") => 1,
                _ => 2,
            };
            Some(MediaRange {
                mime,
                quality,
                specificity,
                index,
            })
        })
        .filter(|range| range.quality > 0.0)
        .collect();

    ranges.sort_by(|a, b| {
        b.quality
            .total_cmp(&a.quality)
            .then(b.specificity.cmp(&a.specificity))
            .then(a.index.cmp(&b.index))
    });
    ranges
}

/// Pick a format for an `Accept` header. `None` means the default branch.
pub fn select_format(accept: Option<&str>) -> Option<Format> {
    let accept = match accept.map(str::trim) {
        None | Some("") => return FORMATS.first().map(|(format, _)| *format),
        Some(accept) => accept,
    };

    for range in parse_accept(accept) {
        for (format, types) in FORMATS {
            if types.iter().any(|candidate| range.matches(candidate)) {
                return Some(*format);
            }
        }
    }
    None
}

/// What the client asked for.
#[derive(Debug, Clone, Default)]
pub struct Preferences {
    pub accept: Option<String>,
    pub callback: Option<String>,
}

/// Payload plus its presentation hints.
#[derive(Debug, Clone, Copy)]
pub struct Presentable<'a> {
    pub body: &'a Value,
    pub view: Option<&'a str>,
    /// YAML inline depth used inside the view
    pub view_depth: usize,
}

/// Final representation of a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: String,
    /// Set for callback output so browsers do not sniff it as something else
    pub nosniff: bool,
}

impl Rendered {
    fn new(content_type: &'static str, body: String) -> Self {
        Self {
            content_type,
            body,
            nosniff: false,
        }
    }
}

/// Renders payloads in the negotiated format.
#[derive(Clone)]
pub struct Negotiator {
    views: Arc<dyn ViewRenderer>,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinViews))
    }
}

impl Negotiator {
    pub fn new(views: Arc<dyn ViewRenderer>) -> Self {
        Self { views }
    }

    pub fn render(
        &self,
        prefs: &Preferences,
        payload: Presentable<'_>,
    ) -> Result<Rendered, ConsoleError> {
        match select_format(prefs.accept.as_deref()) {
            Some(Format::Json) => render_json(payload.body, prefs.callback.as_deref()),
            Some(Format::Xml) => {
                let xml = to_xml(payload.body).map_err(|e| ConsoleError::Render(e.to_string()))?;
                Ok(Rendered::new("application/xml; charset=utf-8", xml))
            }
            Some(Format::Html) => {
                let page = payload
                    .view
                    .and_then(|view| self.views.render(view, payload.body, payload.view_depth));
                Ok(match page {
                    Some(page) => Rendered::new("text/html; charset=utf-8", page),
                    None => Rendered::new(
                        "text/plain; charset=utf-8",
                        to_yaml(payload.body, HTML_INLINE_DEPTH),
                    ),
                })
            }
            None => {
                let text = match payload.body {
                    Value::String(s) => s.clone(),
                    other => to_yaml(other, DEFAULT_INLINE_DEPTH),
                };
                Ok(Rendered::new("text/plain; charset=utf-8", text))
            }
        }
    }
}

/// Callback names keep identifier characters, `$`, `.` and brackets.
fn sanitize_callback(callback: &str) -> String {
    callback
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
        .collect()
}

fn render_json(body: &Value, callback: Option<&str>) -> Result<Rendered, ConsoleError> {
    let json =
        serde_json::to_string_pretty(body).map_err(|e| ConsoleError::Render(e.to_string()))?;

    let callback = callback
        .map(sanitize_callback)
        .filter(|cb| !cb.is_empty());

    let Some(callback) = callback else {
        return Ok(Rendered::new("application/json; charset=utf-8", json));
    };

    // U+2028/U+2029 are valid in JSON strings but terminate JavaScript lines.
    let json = json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029");
    Ok(Rendered {
        content_type: "text/javascript; charset=utf-8",
        body: format!("/**/ typeof {callback} === 'function' && {callback}({json});"),
        nosniff: true,
    })
}
