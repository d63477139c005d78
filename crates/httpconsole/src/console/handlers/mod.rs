//! Route handlers.
//!
//! Handlers return `Result<Outcome, ConsoleError>`; errors are turned into
//! negotiated error payloads by the server.

mod bucket;
mod inspect;
mod system;

use crate::console::context::RequestContext;
use crate::console::router::Route;
use crate::console::server::ConsoleState;
use crate::console::types::Outcome;
use crate::error::ConsoleError;

/// Run the handler for `route`.
pub async fn dispatch(
    route: &Route,
    ctx: &RequestContext,
    state: &ConsoleState,
) -> Result<Outcome, ConsoleError> {
    let port = state.public_port;

    match route {
        Route::Index => system::handle_index(),
        Route::Ip => inspect::handle_ip(ctx),
        Route::Ips => inspect::handle_ips(ctx),
        Route::Agent => inspect::handle_agent(ctx),
        Route::Status { code, reason } => inspect::handle_status(code, reason.as_deref()),
        Route::Headers => inspect::handle_headers(ctx),
        Route::Header(name) => inspect::handle_header(ctx, name),
        Route::Cookies => inspect::handle_cookies(ctx),
        Route::Cookie(name) => inspect::handle_cookie(ctx, name),
        Route::Redirect { status, count } => {
            inspect::handle_redirect(ctx, status, count.as_deref(), port)
        }
        Route::Echo => inspect::handle_echo(ctx, false),
        Route::Gzip => inspect::handle_echo(ctx, true),
        Route::BucketForm => bucket::handle_form(),
        Route::BucketCreate => bucket::handle_create(ctx, &state.engine, port).await,
        Route::BucketView(id) => bucket::handle_view(&state.engine, id).await,
        Route::BucketLog(id) => bucket::handle_log(&state.engine, id).await,
        Route::BucketReplay(id) => bucket::handle_replay(ctx, &state.engine, id).await,
        Route::Docs => system::handle_docs(ctx, port),
        Route::Metrics => system::handle_metrics(),
        Route::NotFound => Err(ConsoleError::NotFound),
    }
}
