//! HTTP client seam
//!
//! The orchestrator talks to sources through [`HttpFetcher`] so tests can
//! script responses; [`ReqwestFetcher`] is the production implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

use super::error::{CollectError, CollectResult};
use super::params::Credentials;
use super::request::{HttpResponse, Method, RequestSpec};

/// A request that produced no response at all.
///
/// Messages are fixed phrases: the underlying client errors embed the full
/// url, which may carry tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("could not connect to the server")]
    Connect,

    #[error("response body could not be read")]
    Body,

    #[error("request could not be completed")]
    Other,
}

impl TransportError {
    /// Failures worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connect | Self::Body)
    }
}

/// HTTP statuses worth retrying
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

/// Issues one HTTP request
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &RequestSpec,
        credentials: &Credentials,
    ) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed fetcher
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(request_timeout: Duration, user_agent: &str) -> CollectResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CollectError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn classify(error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect
        } else if error.is_body() || error.is_decode() {
            TransportError::Body
        } else {
            TransportError::Other
        }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        request: &RequestSpec,
        credentials: &Credentials,
    ) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(request.url.clone()),
            Method::Post => self.client.post(request.url.clone()),
        };

        builder = match credentials {
            Credentials::None => builder,
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, password.as_ref())
            }
            Credentials::Bearer(token) => builder.bearer_auth(token),
            Credentials::Header { name, value } => builder.header(name.as_str(), value.as_str()),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| Self::classify(&e))?;
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify(&e))?
            .to_vec();

        trace!("{} {} -> {} ({} bytes)", request.method, request.url.path(), status, body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
