//! Entity normalization: filtering and stable key derivation
//!
//! Adapters hand over raw, ordered entities. The normalizer drops the ones
//! the user filtered out, keeps the order of the rest and gives each a key
//! that survives re-collection, so user annotations and change detection in
//! the measurement log line up across cycles.

pub mod filter;
pub mod key;

pub use filter::{EntityFilter, FilterConfig};
pub use key::derive_key;

use std::collections::HashMap;

use crate::model::{Entity, RawEntity};

/// Filter `raw` and derive keys, preserving order.
///
/// Keys are unique within the result: a repeated key gets a `:<n>` suffix
/// in order of appearance, starting at 2.
pub fn normalize(raw: Vec<RawEntity>, filter: &EntityFilter) -> Vec<Entity> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    raw.into_iter()
        .filter(|entity| filter.accepts(entity))
        .map(|entity| {
            let base = derive_key(&entity);
            let occurrence = seen.entry(base.clone()).or_insert(0);
            *occurrence += 1;
            let key = if *occurrence == 1 {
                base
            } else {
                format!("{base}:{occurrence}")
            };
            Entity {
                key,
                attributes: entity.attributes,
            }
        })
        .collect()
}
