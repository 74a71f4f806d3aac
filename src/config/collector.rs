//! Settings of the fetch side of a collection cycle

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::collector::RetryPolicy;

/// How sources are fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Requests in flight at once, across all sources and metrics
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Time a whole metric's collection may take
    #[serde(with = "humantime_serde", default = "default_cycle_deadline")]
    pub cycle_deadline: Duration,

    /// Time a single HTTP request may take
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Guard against adapters that never stop paging
    #[serde(default = "default_max_requests_per_source")]
    pub max_requests_per_source: usize,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            cycle_deadline: default_cycle_deadline(),
            request_timeout: default_request_timeout(),
            max_requests_per_source: default_max_requests_per_source(),
            retry: RetryPolicy::default(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_cycle_deadline() -> Duration {
    Duration::from_secs(120)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_requests_per_source() -> usize {
    50
}

fn default_user_agent() -> String {
    format!("quality-collector/{}", env!("CARGO_PKG_VERSION"))
}
