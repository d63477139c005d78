//! HAR archive records for captured requests and bucket responses.
//!
//! # Module Structure
//!
//! - `types` - HAR 1.2 data types (envelope, entries, stored responses)
//! - `builder` - captured request -> HAR entry

mod builder;
mod types;

pub use builder::{build_entry, estimate_headers_size, CapturedRequest};
pub use types::{
    ArchivedCookie, ArchivedHeader, ArchivedRequest, Content, Creator, Entry, Har, HarLog,
    NameValue, Param, PostData, ResponseArchive, CREATOR_NAME, HAR_VERSION,
};
