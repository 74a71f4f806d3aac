//! Security warnings in a tool-neutral JSON format
//!
//! ```json
//! {"vulnerabilities": [{"title": "...", "description": "...", "severity": "high"}]}
//! ```
//!
//! The url may also point at a gzip bundle of such reports; the entries
//! matching `archive_entries` are merged before parsing.

use serde::Deserialize;

use crate::collector::{
    CollectError, CollectResult, FetchedResponse, ParseContext, ParsedSource, RequestSpec,
    SourceAdapter, SourceParameters,
};
use crate::model::{Attributes, RawEntity};
use crate::normalize::EntityFilter;

#[derive(Debug, Default, Deserialize)]
struct GenericJsonParameters {
    /// Severities to count; empty means all
    #[serde(default)]
    severities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Report {
    vulnerabilities: Vec<Vulnerability>,
}

#[derive(Debug, Deserialize)]
struct Vulnerability {
    title: String,
    #[serde(default)]
    description: String,
    severity: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GenericJson;

impl SourceAdapter for GenericJson {
    fn source_type(&self) -> &'static str {
        "generic_json"
    }

    fn validate(&self, params: &SourceParameters) -> CollectResult<()> {
        params.require_url()?;
        params.decode::<GenericJsonParameters>().map(|_| ())
    }

    fn entity_filter(&self, params: &SourceParameters) -> EntityFilter {
        let mut config = params.filter.clone();
        if params.get_str("match_field").is_none() {
            config.match_field = "title".to_string();
        }
        let severities = params
            .decode::<GenericJsonParameters>()
            .unwrap_or_default()
            .severities;
        if !severities.is_empty() {
            config
                .allowed_values
                .entry("severity".to_string())
                .or_default()
                .extend(severities);
        }
        EntityFilter::new(&config)
    }

    fn next_request(
        &self,
        params: &SourceParameters,
        responses: &[FetchedResponse],
    ) -> CollectResult<Option<RequestSpec>> {
        if !responses.is_empty() {
            return Ok(None);
        }
        Ok(Some(RequestSpec::get(params.require_url()?.clone())))
    }

    fn parse(&self, context: &ParseContext<'_>) -> CollectResult<ParsedSource> {
        let report: Report = serde_json::from_value(context.merged_json()?)
            .map_err(|e| CollectError::parse(format!("not a security warnings report: {e}")))?;

        let entities = report
            .vulnerabilities
            .into_iter()
            .map(|vulnerability| {
                let mut attributes = Attributes::new();
                attributes.insert("title".into(), vulnerability.title.into());
                attributes.insert("description".into(), vulnerability.description.into());
                attributes.insert("severity".into(), vulnerability.severity.into());
                RawEntity::new(attributes)
            })
            .collect();

        Ok(ParsedSource::entities(entities))
    }
}
