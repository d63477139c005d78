//! httpconsole: an HTTP request inspector and mock-response bucket service.
//!
//! Every request is captured as a HAR entry. The inspection routes echo parts
//! of it back, while buckets store a HAR response and replay it on demand,
//! keeping a bounded log of the requests they served.

pub mod archive;
pub mod backends;
pub mod body;
pub mod bucket;
pub mod config;
pub mod console;
pub mod error;
pub mod metrics;
pub mod negotiate;

pub use archive::{build_entry, CapturedRequest, Entry, Har};
pub use body::DecodedBody;
pub use bucket::{create_bucket_store, BucketEngine, BucketStore, LOG_CAPACITY};
pub use config::Config;
pub use console::{ConsoleServer, ConsoleState};
pub use error::{ConsoleError, StoreError};
pub use negotiate::Negotiator;
