//! Fetch orchestration for one metric
//!
//! Every source of a metric is fetched concurrently. Each source walks its
//! adapter's request sequence, one request at a time, each request holding
//! a permit of the shared pool while it is in flight. Results come back in
//! configuration order whatever order the sources finish in. Errors never
//! leave this module: a failing source becomes a [`SourceResult`] carrying
//! a sanitized `connection_error` or `parse_error`.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::adapter::{AdapterRegistry, ParseContext, ParsedSource, SourceAdapter};
use super::archive::{extract_documents, ArchiveReader, GzipBundleReader};
use super::error::{CollectError, CollectResult};
use super::http::HttpFetcher;
use super::params::{Credentials, SourceParameters};
use super::redact::Redactor;
use super::request::{FetchedResponse, HttpResponse, RequestKind, RequestSpec};
use super::retry::send_with_retry;
use crate::config::CollectorConfig;
use crate::model::{Metric, SourceConfig, SourceResult};
use crate::normalize::normalize;

/// A source ready to be fetched
struct PreparedSource {
    source_id: String,
    adapter: Arc<dyn SourceAdapter>,
    params: SourceParameters,
    credentials: Credentials,
    redactor: Redactor,
}

impl PreparedSource {
    fn api_url(&self) -> Option<Url> {
        self.adapter.api_url(&self.params)
    }

    fn landing_url(&self) -> Option<Url> {
        self.params
            .landing_url
            .clone()
            .or_else(|| self.adapter.landing_url(&self.params))
    }

    fn sanitize(&self, error: &CollectError) -> String {
        self.redactor.text(&error.to_string())
    }

    /// A failed source, urls filled in for navigation
    fn failure(&self, error: &CollectError) -> SourceResult {
        let message = self.sanitize(error);
        let result = if error.is_connection_class() {
            SourceResult::connection_failure(&self.source_id, message)
        } else {
            SourceResult::parse_failure(&self.source_id, message)
        };
        result.with_urls(
            self.api_url().map(|u| self.redactor.url(&u)),
            self.landing_url().map(|u| self.redactor.url(&u)),
        )
    }
}

/// Raw output of one source's round trips
struct Fetched {
    parsed: ParsedSource,
    warnings: Vec<String>,
}

/// Drives the adapters of a metric's sources
pub struct FetchOrchestrator {
    registry: Arc<AdapterRegistry>,
    fetcher: Arc<dyn HttpFetcher>,
    archive: Arc<dyn ArchiveReader>,
    permits: Arc<Semaphore>,
    config: CollectorConfig,
}

impl FetchOrchestrator {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        fetcher: Arc<dyn HttpFetcher>,
        config: CollectorConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));
        Self {
            registry,
            fetcher,
            archive: Arc::new(GzipBundleReader),
            permits,
            config,
        }
    }

    pub fn with_archive_reader(mut self, archive: Arc<dyn ArchiveReader>) -> Self {
        self.archive = archive;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Fetch every source of `metric` once, under the cycle deadline.
    ///
    /// The result has one entry per configured source, in configuration
    /// order.
    pub async fn fetch_metric(&self, metric: &Metric) -> Vec<SourceResult> {
        let deadline = Instant::now() + self.config.cycle_deadline;
        debug!(
            "Fetching {} source(s) of '{}' (deadline {:?})",
            metric.sources.len(),
            metric.display_name(),
            self.config.cycle_deadline
        );

        let results = join_all(
            metric
                .sources
                .iter()
                .map(|source| self.fetch_source(source, deadline)),
        )
        .await;

        let failed = results.iter().filter(|r| r.has_error()).count();
        info!(
            "Fetched '{}': {} source(s), {} failed",
            metric.display_name(),
            results.len(),
            failed
        );
        results
    }

    async fn fetch_source(&self, source: &SourceConfig, deadline: Instant) -> SourceResult {
        let prepared = match self.prepare(source) {
            Ok(prepared) => prepared,
            Err(result) => return *result,
        };

        let outcome = match timeout_at(deadline, self.round_trips(&prepared)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CollectError::Timeout(self.config.cycle_deadline)),
        };

        match outcome {
            Ok(fetched) => self.finish(&prepared, fetched),
            Err(error) => {
                warn!("Source '{}' failed: {}", prepared.source_id, prepared.sanitize(&error));
                prepared.failure(&error)
            }
        }
    }

    /// Resolve the adapter and decode parameters. Failures here are
    /// configuration problems and never issue a request.
    fn prepare(&self, source: &SourceConfig) -> Result<PreparedSource, Box<SourceResult>> {
        let Some(adapter) = self.registry.get(&source.source_type) else {
            let error = CollectError::configuration(format!(
                "unknown source type '{}'",
                source.source_type
            ));
            warn!("Source '{}': {}", source.id, error);
            return Err(Box::new(SourceResult::parse_failure(
                &source.id,
                error.to_string(),
            )));
        };

        let params = match SourceParameters::from_map(&source.parameters) {
            Ok(params) => params,
            Err(error) => {
                warn!("Source '{}': {}", source.id, error);
                return Err(Box::new(SourceResult::parse_failure(
                    &source.id,
                    error.to_string(),
                )));
            }
        };

        let credentials = adapter.credentials(&params);
        let prepared = PreparedSource {
            source_id: source.id.clone(),
            redactor: Redactor::new(credentials.secrets()),
            adapter,
            params,
            credentials,
        };

        if let Err(error) = prepared.adapter.validate(&prepared.params) {
            warn!("Source '{}': {}", prepared.source_id, prepared.sanitize(&error));
            return Err(Box::new(prepared.failure(&error)));
        }
        Ok(prepared)
    }

    /// Issue the adapter's requests in order, then parse
    async fn round_trips(&self, source: &PreparedSource) -> CollectResult<Fetched> {
        let mut responses: Vec<FetchedResponse> = Vec::new();
        let mut warnings = Vec::new();

        loop {
            let Some(request) = source.adapter.next_request(&source.params, &responses)? else {
                break;
            };
            if responses.len() >= self.config.max_requests_per_source {
                warnings.push(format!(
                    "Stopped after {} requests; results may be incomplete",
                    responses.len()
                ));
                break;
            }

            let outcome = self.send(source, &request).await;
            if let Err(error) = &outcome {
                match &request.kind {
                    RequestKind::Lookup { fallback } => {
                        let warning = format!(
                            "Lookup failed ({}); falling back to {}",
                            source.sanitize(error),
                            fallback
                        );
                        warn!("Source '{}': {}", source.source_id, warning);
                        warnings.push(warning);
                    }
                    RequestKind::Data => return Err(error.clone()),
                }
            }
            responses.push(FetchedResponse { request, outcome });
        }

        let mut documents = Vec::new();
        for response in responses.iter().filter(|r| !r.is_lookup()) {
            if let Some(body) = response.response().map(|r| r.body.clone()) {
                documents.extend(extract_documents(
                    self.archive.as_ref(),
                    body,
                    source.params.archive_entries.as_deref(),
                )?);
            }
        }

        let context = ParseContext {
            params: &source.params,
            responses: &responses,
            documents,
        };
        let parsed = source.adapter.parse(&context)?;
        Ok(Fetched { parsed, warnings })
    }

    /// One request under a pool permit, with retries. Non-2xx statuses are
    /// connection errors.
    async fn send(
        &self,
        source: &PreparedSource,
        request: &RequestSpec,
    ) -> Result<HttpResponse, CollectError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CollectError::connection("request pool is shut down"))?;

        let target = source.redactor.url(&request.url);
        debug!("{} {} for source '{}'", request.method, target, source.source_id);

        let response = send_with_retry(
            self.fetcher.as_ref(),
            request,
            &source.credentials,
            &self.config.retry,
        )
        .await
        .map_err(|e| CollectError::connection(format!("{} {}: {}", request.method, target, e)))?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(CollectError::connection(format!(
                "{} {} returned HTTP status {}",
                request.method, target, response.status
            )))
        }
    }

    /// Filter, key and count the parsed entities
    fn finish(&self, source: &PreparedSource, fetched: Fetched) -> SourceResult {
        let Fetched { parsed, warnings } = fetched;
        let filter = source.adapter.entity_filter(&source.params);
        let entities = normalize(parsed.entities, &filter);
        let value = parsed
            .value
            .unwrap_or_else(|| entities.len().to_string());

        let api_url = parsed.api_url.or_else(|| source.api_url());
        let landing_url = source
            .params
            .landing_url
            .clone()
            .or(parsed.landing_url)
            .or_else(|| source.adapter.landing_url(&source.params));

        debug!(
            "Source '{}': value {} with {} entities",
            source.source_id,
            value,
            entities.len()
        );

        let mut result = SourceResult::success(&source.source_id, value, parsed.total, entities)
            .with_urls(
                api_url.map(|u| source.redactor.url(&u)),
                landing_url.map(|u| source.redactor.url(&u)),
            );
        result.warnings = warnings;
        result
    }
}
