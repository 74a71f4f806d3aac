//! Mock implementations for testing
//!
//! Stand-ins for the collector's external collaborators.

pub mod adapter;
pub mod http;

pub use adapter::{ValueDocumentAdapter, VALUE_DOCUMENT};
pub use http::{RecordedRequest, StubFetcher, StubReply};
