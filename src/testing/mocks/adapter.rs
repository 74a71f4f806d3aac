//! A minimal adapter reading a value document from its url

use serde::Deserialize;

use crate::collector::{
    CollectError, CollectResult, FetchedResponse, ParseContext, ParsedSource, RequestSpec,
    SourceAdapter, SourceParameters,
};
use crate::model::{Attributes, RawEntity};

/// Source type of [`ValueDocumentAdapter`]
pub const VALUE_DOCUMENT: &str = "value_document";

#[derive(Debug, Deserialize)]
struct ValueDocument {
    value: Option<String>,
    total: Option<String>,
    #[serde(default)]
    entities: Vec<Attributes>,
}

/// Reads `{"value": "3", "total": "10", "entities": [{"id": ..}, ..]}`
/// from the configured url. Entities with an `id` attribute use it as their
/// natural id.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueDocumentAdapter;

impl SourceAdapter for ValueDocumentAdapter {
    fn source_type(&self) -> &'static str {
        VALUE_DOCUMENT
    }

    fn validate(&self, params: &SourceParameters) -> CollectResult<()> {
        params.require_url().map(|_| ())
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
        let document = context
            .documents
            .first()
            .ok_or_else(|| CollectError::parse("empty response"))?;
        let document: ValueDocument = document.json()?;

        let entities = document
            .entities
            .into_iter()
            .map(|attributes| {
                let id = attributes
                    .get("id")
                    .map(crate::model::entity::value_as_string);
                let entity = RawEntity::new(attributes);
                match id {
                    Some(id) => entity.with_natural_id(id),
                    None => entity,
                }
            })
            .collect();

        Ok(ParsedSource {
            value: document.value,
            total: document.total,
            entities,
            ..ParsedSource::default()
        })
    }
}
