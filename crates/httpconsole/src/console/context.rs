//! Request facts gathered before routing.
//!
//! Proxy headers are trusted: the client address is the leftmost
//! `X-Forwarded-For` entry and the hostname/protocol honour
//! `X-Forwarded-Host` and `X-Forwarded-Proto`.

use crate::archive::{build_entry, CapturedRequest, Entry};
use crate::body::{form, DecodedBody};
use crate::negotiate::{Preferences, CALLBACK_PARAM};
use chrono::{DateTime, Utc};
use hyper::header::{ACCEPT, CONTENT_TYPE, COOKIE, HOST};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Version};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;

const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";
const METHOD_OVERRIDE_PARAM: &str = "_method";

/// Methods a `POST` may be overridden to.
const OVERRIDABLE_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Everything handlers need to know about the current request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub captured: CapturedRequest,
    /// HAR entry for `captured`
    pub entry: Entry,
    /// Hostname without port
    pub hostname: String,
    /// Full `X-Forwarded-For` chain, client first
    pub forwarded_ips: Vec<String>,
    pub prefs: Preferences,
}

impl RequestContext {
    /// `query` is the request's decoded query string, see [`parse_query`].
    pub fn new(
        parts: &Parts,
        peer: SocketAddr,
        query: Map<String, Value>,
        body: DecodedBody,
        started_at: DateTime<Utc>,
    ) -> Self {
        let headers = fold_headers(&parts.headers);

        let forwarded_ips = forwarded_for(&parts.headers);
        let client_ip = forwarded_ips
            .first()
            .cloned()
            .unwrap_or_else(|| peer.ip().to_string());

        let hostname = hostname(parts);
        let proto = first_value(&parts.headers, "x-forwarded-proto")
            .unwrap_or_else(|| "http".to_string());
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let method = effective_method(&parts.method, &parts.headers, &query);

        let prefs = preferences(&parts.headers, &query);

        let captured = CapturedRequest {
            started_at,
            client_ip,
            method: method.to_string(),
            url: format!("{proto}://{hostname}{path_and_query}"),
            path_and_query,
            version: version_pair(parts.version),
            cookies: parse_cookies(&parts.headers),
            headers,
            query,
            body,
        };
        let entry = build_entry(&captured);

        Self {
            captured,
            entry,
            hostname,
            forwarded_ips,
            prefs,
        }
    }

    /// Effective request method (after any override).
    pub fn method(&self) -> &str {
        &self.captured.method
    }

    /// String value of a query parameter (first one for lists).
    pub fn query(&self, name: &str) -> Option<String> {
        query_string(&self.captured.query, name)
    }
}

/// Query string decoded with the nested form convention.
pub fn parse_query(parts: &Parts) -> Map<String, Value> {
    parts
        .uri
        .query()
        .map(form::parse_nested)
        .unwrap_or_default()
}

/// Negotiation preferences from the request head.
pub fn preferences(headers: &HeaderMap, query: &Map<String, Value>) -> Preferences {
    let accept: Vec<String> = headers.get_all(ACCEPT).iter().map(header_text).collect();
    Preferences {
        accept: (!accept.is_empty()).then(|| accept.join(", ")),
        callback: query_string(query, CALLBACK_PARAM),
    }
}

/// `Content-Type` of the raw request.
pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// Method seen by routing and the archive.
///
/// Only `POST` can be overridden, first by header, then by `_method` query
/// parameter; unknown method names are ignored.
pub fn effective_method(method: &Method, headers: &HeaderMap, query: &Map<String, Value>) -> Method {
    if method != Method::POST {
        return method.clone();
    }

    let candidates = [
        first_value(headers, METHOD_OVERRIDE_HEADER),
        query_string(query, METHOD_OVERRIDE_PARAM),
    ];

    let mut effective = method.clone();
    for candidate in candidates.into_iter().flatten() {
        let upper = candidate.trim().to_ascii_uppercase();
        if OVERRIDABLE_METHODS.contains(&upper.as_str()) {
            if let Ok(parsed) = Method::from_bytes(upper.as_bytes()) {
                effective = parsed;
            }
        }
    }
    effective
}

fn query_string(query: &Map<String, Value>, name: &str) -> Option<String> {
    match query.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn header_text(value: &hyper::header::HeaderValue) -> String {
    value
        .to_str()
        .map(str::to_string)
        .unwrap_or_else(|_| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Lower-cased names with repeated headers folded into one value.
fn fold_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut folded: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let text = header_text(value);
        let separator = if *name == COOKIE { "; " } else { ", " };
        folded
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(&text);
            })
            .or_insert(text);
    }
    folded
}

/// First comma-separated entry of a header.
fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(header_text)
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|v| !v.is_empty())
}

fn forwarded_for(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all("x-forwarded-for")
        .iter()
        .flat_map(|v| {
            header_text(v)
                .split(',')
                .map(|s| s.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn hostname(parts: &Parts) -> String {
    let host = first_value(&parts.headers, "x-forwarded-host")
        .or_else(|| parts.headers.get(HOST).map(header_text))
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
        .unwrap_or_else(|| "localhost".to_string());
    strip_port(&host).to_string()
}

fn strip_port(host: &str) -> &str {
    // IPv6 literal: keep the brackets, drop anything after them
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}

fn version_pair(version: Version) -> (u8, u8) {
    match version {
        Version::HTTP_09 => (0, 9),
        Version::HTTP_10 => (1, 0),
        Version::HTTP_2 => (2, 0),
        Version::HTTP_3 => (3, 0),
        _ => (1, 1),
    }
}

/// Cookies from every `Cookie` header; values are unquoted and
/// percent-decoded, and the first occurrence of a name wins.
fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for header in headers.get_all(COOKIE) {
        let text = header_text(header);
        for pair in text.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let mut value = value.trim();
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = &value[1..value.len() - 1];
            }
            let decoded = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());

            cookies.entry(name.to_string()).or_insert(decoded);
        }
    }
    cookies
}
