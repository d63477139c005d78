//! HTTP surface of the console.
//!
//! # Module Structure
//!
//! - `server` - accept loop and the per-request pipeline
//! - `router` - path and method to [`Route`]
//! - `context` - request facts (client address, cookies, query, archive entry)
//! - `handlers` - one function per route
//! - `redirect` - redirect chain state machine
//! - `types` - handler results and response helpers

mod context;
mod handlers;
pub mod redirect;
mod router;
mod server;
mod types;

pub use context::RequestContext;
pub use router::Route;
pub use server::{handle_request, ConsoleServer, ConsoleState};
pub use types::{Outcome, Reply};
