//! Stable entity keys

use sha2::{Digest, Sha256};

use crate::model::entity::value_as_string;
use crate::model::RawEntity;

const FIELD_SEPARATOR: &[u8] = b"\x1f";

/// Derive the key of an entity: its natural id when the tool provides one,
/// otherwise a SHA-256 over the ordered attribute values.
pub fn derive_key(entity: &RawEntity) -> String {
    match entity.natural_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => sanitize(id),
        _ => hash_attributes(entity),
    }
}

/// Keys end up in URLs and document paths
fn sanitize(id: &str) -> String {
    id.replace(['/', '\\'], "-")
}

fn hash_attributes(entity: &RawEntity) -> String {
    let mut hasher = Sha256::new();
    for (index, value) in entity.attributes.values().enumerate() {
        if index > 0 {
            hasher.update(FIELD_SEPARATOR);
        }
        hasher.update(value_as_string(value).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attributes;
    use serde_json::json;

    fn entity(pairs: &[(&str, &str)]) -> RawEntity {
        let mut attributes = Attributes::new();
        for (name, value) in pairs {
            attributes.insert(name.to_string(), json!(value));
        }
        RawEntity::new(attributes)
    }

    #[test]
    fn test_natural_id_is_used_and_sanitized() {
        let e = entity(&[("name", "x")]).with_natural_id("group/project#12");
        assert_eq!(derive_key(&e), "group-project#12");
    }

    #[test]
    fn test_blank_natural_id_falls_back_to_hash() {
        let e = entity(&[("name", "x")]).with_natural_id("  ");
        assert_eq!(derive_key(&e).len(), 64);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = entity(&[("title", "SQL injection"), ("severity", "high")]);
        let b = entity(&[("title", "SQL injection"), ("severity", "high")]);
        assert_eq!(derive_key(&a), derive_key(&b));
    }

    #[test]
    fn test_changed_attribute_changes_hash() {
        let a = entity(&[("title", "SQL injection"), ("severity", "high")]);
        let b = entity(&[("title", "SQL injection"), ("severity", "low")]);
        assert_ne!(derive_key(&a), derive_key(&b));
    }

    #[test]
    fn test_separator_prevents_concatenation_collisions() {
        let a = entity(&[("a", "ab"), ("b", "c")]);
        let b = entity(&[("a", "a"), ("b", "bc")]);
        assert_ne!(derive_key(&a), derive_key(&b));
    }
}
