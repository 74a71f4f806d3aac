//! Test fixtures and data builders

pub mod builders;

pub use builders::{source, MetricBuilder};

use serde_json::json;

use crate::model::SourceConfig;
use crate::testing::mocks::VALUE_DOCUMENT;

/// Common test fixtures for various scenarios
pub struct Fixtures;

impl Fixtures {
    /// A value document body as served by a stubbed source
    pub fn value_document(value: &str, total: &str) -> String {
        json!({"value": value, "total": total}).to_string()
    }

    /// A value document source reading from `url`
    pub fn value_source(id: &str, url: &str) -> SourceConfig {
        source(id, VALUE_DOCUMENT, json!({"url": url}))
    }
}
