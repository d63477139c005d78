//! Handler results and response helpers for the console.

use crate::error::ConsoleError;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use serde_json::Value;

/// A payload waiting for content negotiation.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    /// Custom reason phrase for the status line
    pub reason: Option<String>,
    pub body: Value,
    /// HTML view used when the client prefers markup
    pub view: Option<&'static str>,
    /// YAML inline depth inside the view
    pub view_depth: usize,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// Gzip the rendered body
    pub compress: bool,
}

impl Reply {
    pub fn new(status: StatusCode, body: impl Into<Value>) -> Self {
        Self {
            status,
            reason: None,
            body: body.into(),
            view: None,
            view_depth: crate::negotiate::HTML_INLINE_DEPTH,
            headers: Vec::new(),
            compress: false,
        }
    }

    pub fn ok(body: impl Into<Value>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn view(mut self, view: &'static str) -> Self {
        self.view = Some(view);
        self
    }

    pub fn view_depth(mut self, depth: usize) -> Self {
        self.view_depth = depth;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Add a header; values that are not valid header text are dropped.
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.push((name, value));
        }
        self
    }

    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }
}

impl From<ConsoleError> for Reply {
    fn from(err: ConsoleError) -> Self {
        Reply::new(err.status(), err.payload()).view(err.view())
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum Outcome {
    /// Rendered in the client's preferred format
    Negotiated(Reply),
    /// Sent as-is (bucket replays, metrics)
    Raw(Response<Full<Bytes>>),
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        Outcome::Negotiated(reply)
    }
}

/// Build an HTTP response with headers.
///
/// This function handles the unlikely case where Response::builder() fails
/// by returning a minimal 500 error response.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Collect request body into bytes
pub async fn collect_body(body: Incoming) -> Result<Bytes, ConsoleError> {
    body.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| ConsoleError::BodyRead(e.to_string()))
}
