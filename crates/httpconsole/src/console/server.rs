//! Console HTTP server.

use crate::body::DecodedBody;
use crate::bucket::{BucketEngine, BucketStore};
use crate::console::context::{
    content_type, effective_method, parse_query, preferences, RequestContext,
};
use crate::console::handlers::dispatch;
use crate::console::router::Route;
use crate::console::types::{build_response_with_headers, collect_body, Outcome, Reply};
use crate::error::ConsoleError;
use crate::metrics;
use crate::negotiate::{Negotiator, Preferences, Presentable};
use bytes::Bytes;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::ext::ReasonPhrase;
use hyper::header::{HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE, VARY};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Headers added to every response unless the handler already set them.
const DECORATION_HEADERS: &[(&str, &str)] = &[
    ("x-powered-by", "httpconsole"),
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "*"),
    ("access-control-allow-headers", "*"),
];

/// Shared state handed to every request.
pub struct ConsoleState {
    pub engine: BucketEngine,
    pub negotiator: Negotiator,
    /// Port advertised in absolute URLs
    pub public_port: u16,
    /// Disable access logging
    pub quiet: bool,
}

impl ConsoleState {
    pub fn new(store: Arc<dyn BucketStore>, public_port: u16, quiet: bool) -> anyhow::Result<Self> {
        Ok(Self {
            engine: BucketEngine::new(store)?,
            negotiator: Negotiator::default(),
            public_port,
            quiet,
        })
    }
}

/// HTTP console server
pub struct ConsoleServer {
    state: Arc<ConsoleState>,
}

impl ConsoleServer {
    pub fn new(state: Arc<ConsoleState>) -> Self {
        Self { state }
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), anyhow::Error> {
        info!("httpconsole listening on http://{}", listener.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutting down, no longer accepting connections");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handle_request(req, peer, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Connection error from {}: {}", peer, e);
                }
            });
        }
    }
}

/// Full request pipeline: read body, decode, archive, route, negotiate, decorate.
pub async fn handle_request(
    req: Request<Incoming>,
    peer: SocketAddr,
    state: Arc<ConsoleState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let started_at = Utc::now();
    let (parts, body) = req.into_parts();

    let query = parse_query(&parts);
    let method = effective_method(&parts.method, &parts.headers, &query);
    let route = Route::parse(&method, parts.uri.path());

    // The body is fully read and decoded before any archive or bucket work.
    let decoded = match collect_body(body).await {
        Ok(raw) => DecodedBody::decode(content_type(&parts.headers), raw),
        Err(e) => Err(e),
    };

    let (prefs, outcome) = match decoded {
        Ok(decoded) => {
            let ctx = RequestContext::new(&parts, peer, query, decoded, started_at);
            let outcome = dispatch(&route, &ctx, &state).await;
            (ctx.prefs, outcome)
        }
        Err(e) => (preferences(&parts.headers, &query), Err(e)),
    };

    let mut response = match outcome {
        Ok(Outcome::Raw(response)) => response,
        Ok(Outcome::Negotiated(reply)) => render(&state.negotiator, &prefs, reply),
        Err(err) => {
            log_error(&route, &err);
            render(&state.negotiator, &prefs, Reply::from(err))
        }
    };

    let elapsed = started.elapsed();
    decorate(&mut response, elapsed);

    let status = response.status().as_u16();
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    metrics::record_request(method.as_str(), status, route.name(), elapsed_ms);

    if !state.quiet {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        info!("{} {} {} {:.3} ms", method, target, status, elapsed_ms);
    }

    Ok(response)
}

fn log_error(route: &Route, err: &ConsoleError) {
    match err {
        ConsoleError::StoreUnavailable(_)
        | ConsoleError::CorruptBucket { .. }
        | ConsoleError::Render(_) => warn!("{} failed: {}", route.name(), err),
        _ => debug!("{} failed: {}", route.name(), err),
    }
}

/// Render a reply in the negotiated format.
fn render(negotiator: &Negotiator, prefs: &Preferences, reply: Reply) -> Response<Full<Bytes>> {
    let presentable = Presentable {
        body: &reply.body,
        view: reply.view,
        view_depth: reply.view_depth,
    };

    let rendered = match negotiator.render(prefs, presentable) {
        Ok(rendered) => rendered,
        Err(e) => {
            error!("Failed to render response: {}", e);
            return build_response_with_headers(
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; charset=utf-8")],
                "Internal Server Error",
            );
        }
    };

    let mut encoding = None;
    let mut body = Bytes::from(rendered.body);
    if reply.compress {
        match gzip(&body) {
            Ok(compressed) => {
                body = Bytes::from(compressed);
                encoding = Some("gzip");
            }
            Err(e) => warn!("Failed to gzip response, sending it uncompressed: {}", e),
        }
    }

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = reply.status;

    if let Some(reason) = reply.reason {
        if let Ok(phrase) = ReasonPhrase::try_from(reason.into_bytes()) {
            response.extensions_mut().insert(phrase);
        }
    }

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(rendered.content_type));
    headers.insert(VARY, HeaderValue::from_static("Accept"));
    if rendered.nosniff {
        headers.insert(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        );
    }
    if let Some(encoding) = encoding {
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    for (name, value) in reply.headers {
        headers.insert(name, value);
    }

    response
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Add decoration headers without overriding anything already set.
fn decorate(response: &mut Response<Full<Bytes>>, elapsed: Duration) {
    let headers = response.headers_mut();

    for (name, value) in DECORATION_HEADERS {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert(HeaderValue::from_static(value));
    }

    let took = format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0);
    if let Ok(value) = HeaderValue::from_str(&took) {
        headers
            .entry(HeaderName::from_static("x-response-time"))
            .or_insert(value);
    }
}
