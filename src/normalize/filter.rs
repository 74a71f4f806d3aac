//! Include/ignore lists and categorical allow-lists for entities
//!
//! This is the only place the include/ignore policy is decided: a name on
//! the ignore list always loses, even when the include list matches it too.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::model::RawEntity;

fn default_match_field() -> String {
    "name".to_string()
}

/// User filter configuration of one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Attribute the include and ignore lists are matched against
    #[serde(default = "default_match_field")]
    pub match_field: String,
    /// Literal names or regular expressions; empty means "everything"
    #[serde(default)]
    pub include: Vec<String>,
    /// Literal names or regular expressions to leave out
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Attribute -> values to count, e.g. `severity: [high, critical]`
    #[serde(default)]
    pub allowed_values: BTreeMap<String, Vec<String>>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            match_field: default_match_field(),
            include: Vec::new(),
            ignore: Vec::new(),
            allowed_values: BTreeMap::new(),
        }
    }
}

/// A name that matches literally, or as a regular expression anchored at
/// the start of the value
#[derive(Debug, Clone)]
struct NamePattern {
    literal: String,
    regex: Option<Regex>,
}

impl NamePattern {
    fn new(pattern: &str) -> Self {
        let regex = match Regex::new(&format!("^(?:{pattern})")) {
            Ok(regex) => Some(regex),
            Err(e) => {
                debug!("'{}' is not a regular expression, matching literally: {}", pattern, e);
                None
            }
        };
        Self {
            literal: pattern.to_string(),
            regex,
        }
    }

    fn matches(&self, value: &str) -> bool {
        self.literal == value || self.regex.as_ref().is_some_and(|re| re.is_match(value))
    }
}

/// Compiled filter, built once per source and collection cycle
#[derive(Debug, Clone)]
pub struct EntityFilter {
    match_field: String,
    include: Vec<NamePattern>,
    ignore: Vec<NamePattern>,
    allowed_values: BTreeMap<String, Vec<String>>,
}

impl EntityFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            match_field: config.match_field.clone(),
            include: config.include.iter().map(|p| NamePattern::new(p)).collect(),
            ignore: config.ignore.iter().map(|p| NamePattern::new(p)).collect(),
            allowed_values: config
                .allowed_values
                .iter()
                .filter(|(_, values)| !values.is_empty())
                .map(|(field, values)| {
                    (
                        field.clone(),
                        values.iter().map(|v| v.to_lowercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// A filter that accepts everything
    pub fn accept_all() -> Self {
        Self::new(&FilterConfig::default())
    }

    pub fn accepts(&self, entity: &RawEntity) -> bool {
        self.passes_name_lists(entity) && self.passes_allow_lists(entity)
    }

    fn passes_name_lists(&self, entity: &RawEntity) -> bool {
        if self.include.is_empty() && self.ignore.is_empty() {
            return true;
        }
        let name = entity.attribute_str(&self.match_field).unwrap_or_default();

        if self.ignore.iter().any(|p| p.matches(&name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(&name))
    }

    fn passes_allow_lists(&self, entity: &RawEntity) -> bool {
        self.allowed_values.iter().all(|(field, allowed)| {
            entity
                .attribute_str(field)
                .is_some_and(|value| allowed.contains(&value.to_lowercase()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attributes;
    use serde_json::json;

    fn job(name: &str, severity: &str) -> RawEntity {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), json!(name));
        attributes.insert("severity".into(), json!(severity));
        RawEntity::new(attributes)
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = EntityFilter::accept_all();
        assert!(filter.accepts(&job("build", "low")));
    }

    #[test]
    fn test_include_literal_and_regex() {
        let filter = EntityFilter::new(&FilterConfig {
            include: vec!["deploy".into(), "test-.*".into()],
            ..Default::default()
        });
        assert!(filter.accepts(&job("deploy", "low")));
        assert!(filter.accepts(&job("test-unit", "low")));
        assert!(!filter.accepts(&job("build", "low")));
        // anchored at the start only
        assert!(!filter.accepts(&job("pre-test-unit", "low")));
        assert!(filter.accepts(&job("deploy-prod", "low")));
    }

    #[test]
    fn test_ignore_wins_over_include() {
        let filter = EntityFilter::new(&FilterConfig {
            include: vec!["test-.*".into()],
            ignore: vec!["test-flaky".into()],
            ..Default::default()
        });
        assert!(filter.accepts(&job("test-unit", "low")));
        assert!(!filter.accepts(&job("test-flaky", "low")));
    }

    #[test]
    fn test_invalid_regex_matches_literally() {
        let filter = EntityFilter::new(&FilterConfig {
            ignore: vec!["build[linux".into()],
            ..Default::default()
        });
        assert!(!filter.accepts(&job("build[linux", "low")));
        assert!(filter.accepts(&job("build", "low")));
    }

    #[test]
    fn test_allowed_values_case_insensitive() {
        let mut allowed = BTreeMap::new();
        allowed.insert("severity".to_string(), vec!["High".into(), "critical".into()]);
        let filter = EntityFilter::new(&FilterConfig {
            allowed_values: allowed,
            ..Default::default()
        });
        assert!(filter.accepts(&job("x", "high")));
        assert!(filter.accepts(&job("x", "CRITICAL")));
        assert!(!filter.accepts(&job("x", "low")));
        assert!(!filter.accepts(&RawEntity::default()));
    }
}
