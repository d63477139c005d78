//! Route table for the console.

use hyper::Method;

/// Parsed route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// GET /
    Index,
    /// * /ip
    Ip,
    /// * /ips
    Ips,
    /// * /agent
    Agent,
    /// * /status/:code/:reason?
    Status { code: String, reason: Option<String> },
    /// * /headers
    Headers,
    /// * /header/:name
    Header(String),
    /// * /cookies
    Cookies,
    /// * /cookie/:name
    Cookie(String),
    /// * /redirect/:status/:count?
    Redirect { status: String, count: Option<String> },
    /// * /echo
    Echo,
    /// * /gzip
    Gzip,
    /// GET /bucket/create
    BucketForm,
    /// POST /bucket/create
    BucketCreate,
    /// GET /bucket/:id/view
    BucketView(String),
    /// GET /bucket/:id/log
    BucketLog(String),
    /// * /bucket/:id
    BucketReplay(String),
    /// GET /docs
    Docs,
    /// GET /metrics
    Metrics,
    NotFound,
}

impl Route {
    /// Resolve the effective method and request path.
    ///
    /// A single trailing slash is ignored and path segments are percent-decoded.
    pub fn parse(method: &Method, path: &str) -> Self {
        let trimmed = if path.len() > 1 {
            path.strip_suffix('/').unwrap_or(path)
        } else {
            path
        };

        let segments: Vec<String> = trimmed
            .split('/')
            .skip(1)
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let read = method == Method::GET || method == Method::HEAD;

        match segments.as_slice() {
            [""] if read => Route::Index,
            ["ip"] => Route::Ip,
            ["ips"] => Route::Ips,
            ["agent"] => Route::Agent,
            ["status", code] => Route::Status {
                code: code.to_string(),
                reason: None,
            },
            ["status", code, reason] => Route::Status {
                code: code.to_string(),
                reason: Some(reason.to_string()),
            },
            ["headers"] => Route::Headers,
            ["header", name] => Route::Header(name.to_string()),
            ["cookies"] => Route::Cookies,
            ["cookie", name] => Route::Cookie(name.to_string()),
            ["redirect", status] => Route::Redirect {
                status: status.to_string(),
                count: None,
            },
            ["redirect", status, count] => Route::Redirect {
                status: status.to_string(),
                count: Some(count.to_string()),
            },
            ["echo"] => Route::Echo,
            ["gzip"] => Route::Gzip,
            ["bucket", "create"] if read => Route::BucketForm,
            ["bucket", "create"] if method == Method::POST => Route::BucketCreate,
            ["bucket", id, "view"] if read => Route::BucketView(id.to_string()),
            ["bucket", id, "log"] if read => Route::BucketLog(id.to_string()),
            ["bucket", id] if !id.is_empty() => Route::BucketReplay(id.to_string()),
            ["docs"] if read => Route::Docs,
            ["metrics"] if read => Route::Metrics,
            _ => Route::NotFound,
        }
    }

    /// Label for metrics
    pub fn name(&self) -> &'static str {
        match self {
            Route::Index => "index",
            Route::Ip => "ip",
            Route::Ips => "ips",
            Route::Agent => "agent",
            Route::Status { .. } => "status",
            Route::Headers => "headers",
            Route::Header(_) => "header",
            Route::Cookies => "cookies",
            Route::Cookie(_) => "cookie",
            Route::Redirect { .. } => "redirect",
            Route::Echo => "echo",
            Route::Gzip => "gzip",
            Route::BucketForm => "bucket_form",
            Route::BucketCreate => "bucket_create",
            Route::BucketView(_) => "bucket_view",
            Route::BucketLog(_) => "bucket_log",
            Route::BucketReplay(_) => "bucket_replay",
            Route::Docs => "docs",
            Route::Metrics => "metrics",
            Route::NotFound => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_routes() {
        assert_eq!(Route::parse(&Method::GET, "/"), Route::Index);
        assert_eq!(Route::parse(&Method::POST, "/"), Route::NotFound);
        assert_eq!(Route::parse(&Method::DELETE, "/ip"), Route::Ip);
        assert_eq!(Route::parse(&Method::PUT, "/echo/"), Route::Echo);
        assert_eq!(Route::parse(&Method::GET, "/docs"), Route::Docs);
        assert_eq!(Route::parse(&Method::GET, "/metrics"), Route::Metrics);
        assert_eq!(Route::parse(&Method::GET, "/nope"), Route::NotFound);
    }

    #[test]
    fn test_params() {
        assert_eq!(
            Route::parse(&Method::GET, "/status/418/I'm+a+teapot"),
            Route::Status {
                code: "418".to_string(),
                reason: Some("I'm+a+teapot".to_string())
            }
        );
        assert_eq!(
            Route::parse(&Method::GET, "/header/X%2DCustom"),
            Route::Header("X-Custom".to_string())
        );
        assert_eq!(
            Route::parse(&Method::GET, "/redirect/301/3"),
            Route::Redirect {
                status: "301".to_string(),
                count: Some("3".to_string())
            }
        );
    }

    #[test]
    fn test_bucket_routes() {
        assert_eq!(Route::parse(&Method::GET, "/bucket/create"), Route::BucketForm);
        assert_eq!(Route::parse(&Method::POST, "/bucket/create"), Route::BucketCreate);
        assert_eq!(
            Route::parse(&Method::PUT, "/bucket/create"),
            Route::BucketReplay("create".to_string())
        );
        assert_eq!(
            Route::parse(&Method::GET, "/bucket/abc/view"),
            Route::BucketView("abc".to_string())
        );
        assert_eq!(Route::parse(&Method::POST, "/bucket/abc/view"), Route::NotFound);
        assert_eq!(
            Route::parse(&Method::GET, "/bucket/abc/log"),
            Route::BucketLog("abc".to_string())
        );
        assert_eq!(
            Route::parse(&Method::PATCH, "/bucket/abc"),
            Route::BucketReplay("abc".to_string())
        );
    }
}
