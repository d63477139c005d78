//! HTML views for browsers.

use super::yaml::to_yaml;
use quick_xml::escape::escape;
use serde_json::Value;

/// Views the console knows how to render.
pub const KNOWN_VIEWS: &[&str] = &[
    "index",
    "default",
    "bucket/create",
    "bucket/view",
    "bucket/log",
    "docs",
    "404",
    "error",
];

/// Renders a named view around a response payload.
///
/// Returning `None` makes the negotiator fall back to plain YAML.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: &str, data: &Value, inline_depth: usize) -> Option<String>;
}

/// Minimal page per view: a heading and the payload as escaped YAML.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinViews;

impl BuiltinViews {
    fn title(view: &str) -> Option<&'static str> {
        let title = match view {
            "index" => "httpconsole",
            "default" => "Result",
            "bucket/create" => "Create a bucket",
            "bucket/view" => "Bucket",
            "bucket/log" => "Bucket log",
            "docs" => "Documentation",
            "404" => "Not Found",
            "error" => "Error",
            _ => return None,
        };
        Some(title)
    }
}

impl ViewRenderer for BuiltinViews {
    fn render(&self, view: &str, data: &Value, inline_depth: usize) -> Option<String> {
        let title = Self::title(view)?;

        let body = match view {
            "bucket/create" => concat!(
                "<p>POST a HAR 1.2 response object as JSON to ",
                "<code>/bucket/create</code>.</p>"
            )
            .to_string(),
            _ if data.is_null() => String::new(),
            _ => format!("<pre>{}</pre>", escape(to_yaml(data, inline_depth).as_str())),
        };

        Some(format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
             <body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
        ))
    }
}
