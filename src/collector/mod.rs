//! Fetching and parsing source data
//!
//! [`FetchOrchestrator`] runs a metric's sources through their adapters
//! and turns every outcome, good or bad, into a
//! [`SourceResult`](crate::model::SourceResult).

pub mod adapter;
pub mod archive;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod pagination;
pub mod params;
pub mod redact;
pub mod request;
pub mod retry;

pub use adapter::{AdapterRegistry, Document, ParseContext, ParsedSource, SourceAdapter};
pub use archive::{extract_documents, ArchiveEntry, ArchiveReader, GzipBundleReader};
pub use error::{CollectError, CollectResult};
pub use http::{HttpFetcher, ReqwestFetcher, TransportError};
pub use orchestrator::FetchOrchestrator;
pub use params::{Credentials, SourceParameters};
pub use redact::{redact_url, Redactor};
pub use request::{FetchedResponse, HttpResponse, Method, RequestKind, RequestSpec};
pub use retry::{send_with_retry, RetryPolicy};
