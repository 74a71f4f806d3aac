//! Typed view of a source's parameter bag
//!
//! Parameters arrive as a loosely-typed map already validated upstream.
//! They are decoded once, at the orchestrator boundary, into the common
//! fields every adapter understands. Adapter-specific fields are decoded
//! into the adapter's own struct with [`SourceParameters::decode`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use super::error::{CollectError, CollectResult};
use crate::normalize::FilterConfig;

/// How requests to a source authenticate
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    None,
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
    /// A token sent in a tool-specific header, e.g. `Private-Token`
    Header { name: String, value: String },
}

impl Credentials {
    /// Secret strings that must never appear in user-visible text
    pub fn secrets(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Basic { password, .. } => password.iter().cloned().collect(),
            Self::Bearer(token) => vec![token.clone()],
            Self::Header { value, .. } => vec![value.clone()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommonParameters {
    #[serde(default)]
    url: Option<Url>,
    #[serde(default)]
    landing_url: Option<Url>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    private_token: Option<String>,
    #[serde(default)]
    bearer_token: Option<String>,
    #[serde(default)]
    archive_entries: Option<String>,
}

/// Decoded parameters of one configured source
#[derive(Debug, Clone, Default)]
pub struct SourceParameters {
    /// Location of the source's data (API base or report document)
    pub url: Option<Url>,
    /// User override for the link shown next to the measurement
    pub landing_url: Option<Url>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub private_token: Option<String>,
    pub bearer_token: Option<String>,
    /// Glob selecting the documents to read when `url` is an archive
    pub archive_entries: Option<String>,
    pub filter: FilterConfig,
    pub(super) raw: Map<String, Value>,
}

impl SourceParameters {
    /// Decode a raw parameter map
    pub fn from_map(raw: &Map<String, Value>) -> CollectResult<Self> {
        let object = Value::Object(without_blank_strings(raw));
        let common: CommonParameters =
            serde_json::from_value(object.clone()).map_err(CollectError::configuration)?;
        let filter: FilterConfig =
            serde_json::from_value(object).map_err(CollectError::configuration)?;

        Ok(Self {
            url: common.url,
            landing_url: common.landing_url,
            username: common.username,
            password: common.password,
            private_token: common.private_token,
            bearer_token: common.bearer_token,
            archive_entries: common.archive_entries,
            filter,
            raw: raw.clone(),
        })
    }

    /// Decode adapter-specific parameters into a typed struct
    pub fn decode<T: DeserializeOwned>(&self) -> CollectResult<T> {
        serde_json::from_value(Value::Object(without_blank_strings(&self.raw)))
            .map_err(CollectError::configuration)
    }

    /// Raw string parameter
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.raw
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// The configured url, or a configuration error
    pub fn require_url(&self) -> CollectResult<&Url> {
        self.url
            .as_ref()
            .ok_or_else(|| CollectError::missing_parameter("url"))
    }

    /// Credentials in order of preference: basic auth, bearer token, then
    /// the private token sent in `token_header`
    pub fn credentials(&self, token_header: Option<&str>) -> Credentials {
        if let Some(username) = &self.username {
            return Credentials::Basic {
                username: username.clone(),
                password: self.password.clone(),
            };
        }
        if let Some(token) = &self.bearer_token {
            return Credentials::Bearer(token.clone());
        }
        match (&self.private_token, token_header) {
            (Some(token), Some(header)) => Credentials::Header {
                name: header.to_string(),
                value: token.clone(),
            },
            (Some(token), None) => Credentials::Bearer(token.clone()),
            _ => Credentials::None,
        }
    }
}

/// Forms submit empty strings for untouched optional fields
fn without_blank_strings(raw: &Map<String, Value>) -> Map<String, Value> {
    raw.iter()
        .filter(|(_, value)| !matches!(value, Value::String(s) if s.trim().is_empty()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
