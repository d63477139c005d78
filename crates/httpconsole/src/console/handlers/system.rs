//! System handlers: greeting, docs, metrics.

use crate::console::context::RequestContext;
use crate::console::types::{build_response_with_headers, Outcome, Reply};
use crate::error::ConsoleError;
use crate::metrics::collect_metrics;
use hyper::StatusCode;
use serde_json::json;

/// GET / - greeting
pub fn handle_index() -> Result<Outcome, ConsoleError> {
    Ok(Reply::ok("Hello World!").view("index").into())
}

/// GET /docs - points non-browser clients at the HTML docs
pub fn handle_docs(ctx: &RequestContext, public_port: u16) -> Result<Outcome, ConsoleError> {
    let body = json!({
        "error": {
            "code": 406,
            "message": format!(
                "please visit, http://{}:{}/docs with a web browser",
                ctx.hostname, public_port
            ),
        }
    });
    Ok(Reply::ok(body).view("docs").into())
}

/// GET /metrics - Prometheus metrics
pub fn handle_metrics() -> Result<Outcome, ConsoleError> {
    Ok(Outcome::Raw(build_response_with_headers(
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        collect_metrics(),
    )))
}
