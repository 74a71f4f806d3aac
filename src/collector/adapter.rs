//! The source adapter contract and the registry adapters are looked up in
//!
//! An adapter knows one tool. It says which requests to issue, one at a
//! time and possibly depending on what earlier requests returned, and it
//! turns the collected documents into a value, a total and raw entities.
//! Everything else (issuing requests, retries, archives, filtering, keys,
//! error classification) is shared and lives outside the adapter.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use super::error::{CollectError, CollectResult};
use super::params::{Credentials, SourceParameters};
use super::request::{FetchedResponse, RequestSpec};
use crate::model::RawEntity;
use crate::normalize::EntityFilter;

/// What an adapter extracted from its documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSource {
    /// The source's value; `None` means "the number of entities kept
    /// after filtering"
    pub value: Option<String>,
    pub total: Option<String>,
    pub entities: Vec<RawEntity>,
    /// Overrides the adapter's `api_url`, e.g. a resolved project url
    pub api_url: Option<Url>,
    /// Overrides the adapter's `landing_url`
    pub landing_url: Option<Url>,
}

impl ParsedSource {
    pub fn entities(entities: Vec<RawEntity>) -> Self {
        Self {
            entities,
            ..Self::default()
        }
    }

    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_total(mut self, total: impl Into<String>) -> Self {
        self.total = Some(total.into());
        self
    }
}

/// One document read from a data response, or from an archive entry in it
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Archive entry name, if the document came out of an archive
    pub name: Option<String>,
    pub body: Vec<u8>,
}

impl Document {
    pub fn new(name: Option<String>, body: Vec<u8>) -> Self {
        Self { name, body }
    }

    pub fn json<T: DeserializeOwned>(&self) -> CollectResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| match &self.name {
            Some(name) => CollectError::parse(format!("'{name}' is not the expected JSON: {e}")),
            None => CollectError::parse(format!("response is not the expected JSON: {e}")),
        })
    }
}

/// Everything an adapter may look at when parsing
#[derive(Debug)]
pub struct ParseContext<'a> {
    pub params: &'a SourceParameters,
    /// Every request issued for the source, in order, with its outcome
    pub responses: &'a [FetchedResponse],
    /// Bodies of the successful data responses, archives already expanded
    pub documents: Vec<Document>,
}

impl ParseContext<'_> {
    /// Decode each document as `T`
    pub fn json_documents<T: DeserializeOwned>(&self) -> CollectResult<Vec<T>> {
        self.documents.iter().map(Document::json).collect()
    }

    /// Concatenate the documents into one JSON value: arrays are merged,
    /// objects with array members are merged member by member. A single
    /// document is returned as is.
    pub fn merged_json(&self) -> CollectResult<Value> {
        let mut values = self.json_documents::<Value>()?.into_iter();
        let Some(first) = values.next() else {
            return Err(CollectError::parse("no documents to parse"));
        };
        values.try_fold(first, merge_json)
    }

    /// The lookup responses, in issue order
    pub fn lookups(&self) -> impl Iterator<Item = &FetchedResponse> {
        self.responses.iter().filter(|r| r.is_lookup())
    }
}

fn merge_json(acc: Value, next: Value) -> CollectResult<Value> {
    match (acc, next) {
        (Value::Array(mut items), Value::Array(more)) => {
            items.extend(more);
            Ok(Value::Array(items))
        }
        (Value::Object(mut object), Value::Object(more)) => {
            for (name, value) in more {
                match (object.remove(&name), value) {
                    (Some(Value::Array(mut items)), Value::Array(extra)) => {
                        items.extend(extra);
                        object.insert(name, Value::Array(items));
                    }
                    (Some(existing), _) => {
                        object.insert(name, existing);
                    }
                    (None, value) => {
                        object.insert(name, value);
                    }
                }
            }
            Ok(Value::Object(object))
        }
        _ => Err(CollectError::parse(
            "documents cannot be combined: their root elements differ",
        )),
    }
}

/// One source type
pub trait SourceAdapter: Send + Sync {
    /// The configured `type` string this adapter handles
    fn source_type(&self) -> &'static str;

    /// Header a `private_token` parameter is sent in
    fn token_header(&self) -> Option<&'static str> {
        None
    }

    /// Reject unusable parameters before any request is issued
    fn validate(&self, _params: &SourceParameters) -> CollectResult<()> {
        Ok(())
    }

    fn credentials(&self, params: &SourceParameters) -> Credentials {
        params.credentials(self.token_header())
    }

    /// Where the data comes from, shown for navigation
    fn api_url(&self, params: &SourceParameters) -> Option<Url> {
        params.url.clone()
    }

    /// Human-facing page for the data
    fn landing_url(&self, params: &SourceParameters) -> Option<Url> {
        self.api_url(params)
    }

    fn entity_filter(&self, params: &SourceParameters) -> EntityFilter {
        EntityFilter::new(&params.filter)
    }

    /// The next request to issue given the ones issued so far, or `None`
    /// when the source has everything it needs
    fn next_request(
        &self,
        params: &SourceParameters,
        responses: &[FetchedResponse],
    ) -> CollectResult<Option<RequestSpec>>;

    fn parse(&self, context: &ParseContext<'_>) -> CollectResult<ParsedSource>;
}

/// Source type -> adapter
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any adapter of the same type
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters
            .insert(adapter.source_type().to_string(), adapter);
    }

    pub fn get(&self, source_type: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(source_type).cloned()
    }

    /// Registered types, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("types", &self.types())
            .finish()
    }
}
