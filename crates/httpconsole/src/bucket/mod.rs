//! Buckets: stored HAR responses replayed for later requests, each with a
//! bounded log of the interactions made against it.
//!
//! # Module Structure
//!
//! - `store` - key-value/list contract implemented by `crate::backends`
//! - `schema` - HAR 1.2 response validation
//! - `engine` - create, view, replay and log retrieval

mod engine;
mod schema;
mod store;

pub use engine::{BucketEngine, LOG_CAPACITY};
pub use schema::ResponseSchema;
pub use store::{create_bucket_store, log_key, BucketStore, LOG_KEY_SUFFIX};
