//! Requests adapters ask for and the responses they get back

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use super::error::{CollectError, CollectResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// What a failed request means for its source
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestKind {
    /// The data itself, or a page of it: failure fails the source
    #[default]
    Data,
    /// An intermediate lookup with a documented fallback: failure is
    /// handed to the adapter and recorded as a warning
    Lookup { fallback: String },
}

/// One HTTP request an adapter wants issued
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub kind: RequestKind,
}

impl RequestSpec {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
            body: None,
            kind: RequestKind::Data,
        }
    }

    pub fn post(url: Url, body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    /// Mark this request as a lookup that may fail without failing the source
    pub fn lookup(mut self, fallback: impl Into<String>) -> Self {
        self.kind = RequestKind::Lookup {
            fallback: fallback.into(),
        };
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self.kind, RequestKind::Lookup { .. })
    }
}

/// A received HTTP response, whatever its status
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn text(&self) -> CollectResult<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|_| CollectError::parse("response body is not valid UTF-8"))
    }

    pub fn json<T: DeserializeOwned>(&self) -> CollectResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| CollectError::parse(format!("response is not the expected JSON: {e}")))
    }
}

/// A request together with what came back for it
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResponse {
    pub request: RequestSpec,
    pub outcome: Result<HttpResponse, CollectError>,
}

impl FetchedResponse {
    pub fn response(&self) -> Option<&HttpResponse> {
        self.outcome.as_ref().ok()
    }

    pub fn is_lookup(&self) -> bool {
        self.request.is_lookup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(200, "{}").with_header("X-Next-Page", "2");
        assert_eq!(response.header("x-next-page"), Some("2"));
        assert_eq!(response.header("X-NEXT-PAGE"), Some("2"));
    }

    #[test]
    fn test_json_error_is_parse_error() {
        let response = HttpResponse::new(200, "<html>");
        let result: CollectResult<Value> = response.json();
        assert!(matches!(result, Err(CollectError::Parse(_))));
    }
}
