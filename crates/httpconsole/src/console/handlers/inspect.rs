//! Handlers echoing facts about the request itself.

use crate::archive::{Har, NameValue};
use crate::console::context::RequestContext;
use crate::console::redirect::{next_step, RedirectStep};
use crate::console::types::{Outcome, Reply};
use crate::error::ConsoleError;
use crate::negotiate::DEFAULT_INLINE_DEPTH;
use hyper::header::{LOCATION, USER_AGENT};
use hyper::StatusCode;
use serde_json::{json, Value};

fn optional(value: Option<&str>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

/// * /ip - client address
pub fn handle_ip(ctx: &RequestContext) -> Result<Outcome, ConsoleError> {
    Ok(Reply::ok(ctx.captured.client_ip.as_str()).view("default").into())
}

/// * /ips - forwarded chain
pub fn handle_ips(ctx: &RequestContext) -> Result<Outcome, ConsoleError> {
    Ok(Reply::ok(json!(ctx.forwarded_ips)).view("default").into())
}

/// * /agent - user agent
pub fn handle_agent(ctx: &RequestContext) -> Result<Outcome, ConsoleError> {
    let agent = optional(ctx.captured.header(USER_AGENT.as_str()));
    Ok(Reply::ok(agent).view("default").into())
}

/// * /status/:code/:reason? - respond with an arbitrary status line
pub fn handle_status(code: &str, reason: Option<&str>) -> Result<Outcome, ConsoleError> {
    let status = code
        .parse::<u16>()
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .ok_or_else(|| ConsoleError::InvalidStatusCode(code.to_string()))?;
    let message = reason.unwrap_or("OK").replace('+', " ");

    let body = json!({
        "code": status.as_u16(),
        "message": message,
    });
    Ok(Reply::new(status, body)
        .reason(message)
        .view("default")
        .into())
}

/// * /headers - archived headers and the header size estimate
pub fn handle_headers(ctx: &RequestContext) -> Result<Outcome, ConsoleError> {
    let body = json!({
        "headers": ctx.entry.request.headers,
        "headersSize": ctx.entry.request.headers_size,
    });
    Ok(Reply::ok(body).view("default").into())
}

/// * /header/:name - one header value
pub fn handle_header(ctx: &RequestContext, name: &str) -> Result<Outcome, ConsoleError> {
    Ok(Reply::ok(optional(ctx.captured.header(name)))
        .view("default")
        .into())
}

/// * /cookies - archived cookies
pub fn handle_cookies(ctx: &RequestContext) -> Result<Outcome, ConsoleError> {
    let cookies: &[NameValue] = &ctx.entry.request.cookies;
    Ok(Reply::ok(json!(cookies)).view("default").into())
}

/// * /cookie/:name - one cookie value
pub fn handle_cookie(ctx: &RequestContext, name: &str) -> Result<Outcome, ConsoleError> {
    let value = ctx
        .captured
        .cookies
        .get(&name.to_ascii_lowercase())
        .map(String::as_str);
    Ok(Reply::ok(optional(value)).view("default").into())
}

/// * /redirect/:status/:count? - one step of a redirect chain
pub fn handle_redirect(
    ctx: &RequestContext,
    status: &str,
    count: Option<&str>,
    public_port: u16,
) -> Result<Outcome, ConsoleError> {
    let origin = format!("http://{}:{}", ctx.hostname, public_port);
    let to = ctx.query("to");

    match next_step(status, count, to.as_deref(), &origin)? {
        RedirectStep::Hop { status, location } => {
            let status = StatusCode::from_u16(status)
                .map_err(|_| ConsoleError::InvalidStatusCode(status.to_string()))?;
            let reason = status.canonical_reason().unwrap_or("Redirect");
            let body = format!("{reason}. Redirecting to {location}");
            Ok(Reply::new(status, body).header(LOCATION, &location).into())
        }
        RedirectStep::Finished => Ok(Reply::ok("redirect finished").view("default").into()),
    }
}

/// * /echo and * /gzip - the full request archive
pub fn handle_echo(ctx: &RequestContext, compress: bool) -> Result<Outcome, ConsoleError> {
    let har = Har::new(vec![ctx.entry.clone()]);
    let body = serde_json::to_value(&har).map_err(|e| ConsoleError::Render(e.to_string()))?;

    let reply = Reply::ok(body)
        .view("default")
        .view_depth(DEFAULT_INLINE_DEPTH);
    Ok(if compress { reply.compressed() } else { reply }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::DecodedBody;
    use crate::console::context::parse_query;
    use chrono::Utc;
    use hyper::Request;

    fn context(builder: hyper::http::request::Builder) -> RequestContext {
        let (parts, _) = builder.body(()).unwrap().into_parts();
        RequestContext::new(
            &parts,
            "127.0.0.1:4000".parse().unwrap(),
            parse_query(&parts),
            DecodedBody::default(),
            Utc::now(),
        )
    }

    fn reply(outcome: Outcome) -> Reply {
        match outcome {
            Outcome::Negotiated(reply) => reply,
            Outcome::Raw(_) => panic!("expected a negotiated reply"),
        }
    }

    #[test]
    fn test_status_reason() {
        let reply = reply(handle_status("418", Some("I'm+a+teapot")).unwrap());
        assert_eq!(reply.status.as_u16(), 418);
        assert_eq!(reply.reason.as_deref(), Some("I'm a teapot"));
        assert_eq!(reply.body, json!({"code": 418, "message": "I'm a teapot"}));

        let reply = self::reply(handle_status("204", None).unwrap());
        assert_eq!(reply.body["message"], "OK");
    }

    #[test]
    fn test_status_invalid() {
        assert!(matches!(
            handle_status("abc", None),
            Err(ConsoleError::InvalidStatusCode(_))
        ));
        assert!(matches!(
            handle_status("42", None),
            Err(ConsoleError::InvalidStatusCode(_))
        ));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let ctx = context(Request::get("/header/X-Custom").header("x-custom", "yes"));
        let reply = reply(handle_header(&ctx, "X-Custom").unwrap());
        assert_eq!(reply.body, json!("yes"));

        let reply = self::reply(handle_header(&ctx, "missing").unwrap());
        assert_eq!(reply.body, Value::Null);
    }

    #[test]
    fn test_cookie_lookup() {
        let ctx = context(Request::get("/cookie/a").header("cookie", "a=1; b=2"));
        assert_eq!(reply(handle_cookie(&ctx, "a").unwrap()).body, json!("1"));

        let cookies = reply(handle_cookies(&ctx).unwrap()).body;
        assert_eq!(cookies.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_headers_body() {
        let ctx = context(Request::get("/headers").header("host", "x"));
        let reply = reply(handle_headers(&ctx).unwrap());
        assert_eq!(reply.body["headers"], json!([{"name": "host", "value": "x"}]));
        assert!(reply.body["headersSize"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_redirect_hop_and_finish() {
        let ctx = context(Request::get("/redirect/302/2").header("host", "example.com"));

        let hop = reply(handle_redirect(&ctx, "302", Some("2"), 8080).unwrap());
        assert_eq!(hop.status, StatusCode::FOUND);
        assert_eq!(hop.headers[0].0, LOCATION);
        assert_eq!(hop.headers[0].1, "http://example.com:8080/redirect/302/1");

        let done = reply(handle_redirect(&ctx, "302", Some("0"), 8080).unwrap());
        assert_eq!(done.status, StatusCode::OK);
        assert_eq!(done.body, json!("redirect finished"));
    }

    #[test]
    fn test_echo_wraps_entry() {
        let ctx = context(Request::get("/echo?x=1"));
        let reply = reply(handle_echo(&ctx, true).unwrap());
        assert!(reply.compress);
        assert_eq!(reply.view_depth, DEFAULT_INLINE_DEPTH);
        assert_eq!(reply.body["log"]["entries"][0]["request"]["method"], "GET");
        assert_eq!(
            reply.body["log"]["entries"][0]["request"]["queryString"],
            json!([{"name": "x", "value": "1"}])
        );
    }
}
