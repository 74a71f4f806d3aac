//! Entities and the user annotations attached to them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Ordered attribute map of an entity
pub type Attributes = Map<String, Value>;

/// Entity as produced by an adapter, before filtering and key derivation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEntity {
    /// Identifier the tool itself assigns, if it is stable across runs
    pub natural_id: Option<String>,
    pub attributes: Attributes,
}

impl RawEntity {
    pub fn new(attributes: Attributes) -> Self {
        Self {
            natural_id: None,
            attributes,
        }
    }

    pub fn with_natural_id(mut self, id: impl Into<String>) -> Self {
        self.natural_id = Some(id.into());
        self
    }

    /// String rendering of an attribute, for filtering
    pub fn attribute_str(&self, name: &str) -> Option<String> {
        self.attributes.get(name).map(value_as_string)
    }
}

/// Entity stored in a measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub key: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// How a user has triaged an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    #[default]
    Unconfirmed,
    Confirmed,
    FalsePositive,
    WontFix,
    Fixed,
}

impl EntityStatus {
    /// Resolved entities no longer count toward their source's value
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::FalsePositive | Self::WontFix | Self::Fixed)
    }
}

impl std::str::FromStr for EntityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unconfirmed" => Ok(Self::Unconfirmed),
            "confirmed" => Ok(Self::Confirmed),
            "false_positive" => Ok(Self::FalsePositive),
            "wont_fix" => Ok(Self::WontFix),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown entity status '{other}'")),
        }
    }
}

/// User-supplied annotation for one entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Entity key -> annotation
pub type EntityUserData = BTreeMap<String, EntityAnnotation>;

pub(crate) fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_serializes_flat() {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), json!("build"));
        attributes.insert("url".into(), json!("https://ci/1"));
        let entity = Entity {
            key: "abc".into(),
            attributes,
        };

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value, json!({"key": "abc", "name": "build", "url": "https://ci/1"}));

        let back: Entity = serde_json::from_value(value).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_resolved_statuses() {
        assert!(EntityStatus::FalsePositive.is_resolved());
        assert!(EntityStatus::WontFix.is_resolved());
        assert!(!EntityStatus::Confirmed.is_resolved());
        assert_eq!("wont_fix".parse::<EntityStatus>(), Ok(EntityStatus::WontFix));
    }
}
