//! Bounded retry with exponential backoff for single requests

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::http::{is_transient_status, HttpFetcher, TransportError};
use super::params::Credentials;
use super::request::{HttpResponse, RequestSpec};

/// Retry policy for transient network failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the first try
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry delay
    #[serde(with = "humantime_serde", default = "default_initial_delay")]
    pub initial_delay: Duration,

    /// Maximum retry delay
    #[serde(with = "humantime_serde", default = "default_max_delay")]
    pub max_delay: Duration,

    /// Exponential backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Randomize delays by up to half their length
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let max = self.max_delay.as_secs_f64();
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let secs = if secs.is_finite() { secs.clamp(0.0, max) } else { max };
        self.apply_jitter(Duration::from_secs_f64(secs))
    }

    /// Check the settings `delay_for` relies on
    pub fn validate(&self) -> Result<(), String> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be a finite number of at least 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(format!(
                "initial_delay {:?} exceeds max_delay {:?}",
                self.initial_delay, self.max_delay
            ));
        }
        Ok(())
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let mut rng = rand::rng();
        let jitter_range = delay.as_secs_f64() / 2.0;
        let jitter = rng.random_range(-jitter_range / 2.0..=jitter_range / 2.0);
        Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
    }
}

/// Send `request`, retrying transient failures under `policy`.
///
/// A response with a transient status is returned as-is once retries are
/// exhausted; the caller decides what a non-2xx status means.
pub async fn send_with_retry(
    fetcher: &dyn HttpFetcher,
    request: &RequestSpec,
    credentials: &Credentials,
    policy: &RetryPolicy,
) -> Result<HttpResponse, TransportError> {
    let mut attempt = 0;

    loop {
        let outcome = fetcher.fetch(request, credentials).await;
        let retryable = match &outcome {
            Ok(response) => is_transient_status(response.status),
            Err(error) => error.is_transient(),
        };

        if !retryable || attempt >= policy.max_retries {
            return outcome;
        }

        attempt += 1;
        let delay = policy.delay_for(attempt);
        debug!(
            "Retrying {} {} after {:?} (attempt {}/{})",
            request.method,
            request.url.path(),
            delay,
            attempt,
            policy.max_retries
        );
        tokio::time::sleep(delay).await;
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, StubReply};
    use url::Url;

    fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(125),
            max_delay: Duration::from_millis(375),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(125));
        assert_eq!(policy.delay_for(2), Duration::from_millis(250));
        assert_eq!(policy.delay_for(3), Duration::from_millis(375));
    }

    #[test]
    fn test_out_of_range_multiplier_never_panics() {
        let mut policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: -2.0,
            jitter: false,
        };
        assert_eq!(policy.delay_for(2), Duration::ZERO);
        assert!(policy.validate().unwrap_err().contains("backoff_multiplier"));

        policy.backoff_multiplier = f64::NAN;
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert!(policy.validate().is_err());

        policy.backoff_multiplier = f64::INFINITY;
        assert_eq!(policy.delay_for(3), Duration::from_secs(1));

        policy.backoff_multiplier = 1.5;
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            jitter: true,
            ..RetryPolicy::default()
        };
        for _ in 0..50 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(74) && delay <= Duration::from_millis(126));
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let url = Url::parse("https://ci.example.org/api").unwrap();
        let fetcher = StubFetcher::new();
        fetcher.push(url.as_str(), StubReply::transport(TransportError::Connect));
        fetcher.push(url.as_str(), StubReply::status(503, ""));
        fetcher.push(url.as_str(), StubReply::json(200, "{}"));

        let response = send_with_retry(
            &fetcher,
            &RequestSpec::get(url.clone()),
            &Credentials::None,
            &quick_policy(3),
        )
        .await
        .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(fetcher.request_count(url.as_str()), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let url = Url::parse("https://ci.example.org/api").unwrap();
        let fetcher = StubFetcher::new();
        fetcher.set_default(url.as_str(), StubReply::transport(TransportError::Timeout));

        let outcome = send_with_retry(
            &fetcher,
            &RequestSpec::get(url.clone()),
            &Credentials::None,
            &quick_policy(2),
        )
        .await;
        assert_eq!(outcome, Err(TransportError::Timeout));
        assert_eq!(fetcher.request_count(url.as_str()), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let url = Url::parse("https://ci.example.org/api").unwrap();
        let fetcher = StubFetcher::new();
        fetcher.set_default(url.as_str(), StubReply::status(401, "unauthorized"));

        let response = send_with_retry(
            &fetcher,
            &RequestSpec::get(url.clone()),
            &Credentials::None,
            &quick_policy(3),
        )
        .await
        .unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(fetcher.request_count(url.as_str()), 1);
    }
}
