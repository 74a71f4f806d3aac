//! Testing utilities and fixtures
//!
//! Scripted HTTP, a minimal value adapter and metric builders, shared by
//! unit tests and the integration tests under `tests/`.

pub mod fixtures;
pub mod mocks;

pub use fixtures::{source, Fixtures, MetricBuilder};
pub use mocks::{RecordedRequest, StubFetcher, StubReply, ValueDocumentAdapter, VALUE_DOCUMENT};

use std::sync::Arc;

use crate::adapters::builtin_registry;
use crate::collector::AdapterRegistry;

/// The built-in adapters plus [`ValueDocumentAdapter`]
pub fn test_registry() -> AdapterRegistry {
    let mut registry = builtin_registry();
    registry.register(Arc::new(ValueDocumentAdapter));
    registry
}
