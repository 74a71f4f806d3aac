//! Built-in source adapters

pub mod generic_json;
pub mod gitlab;
pub mod manual_number;

pub use generic_json::GenericJson;
pub use gitlab::GitLabFailedJobs;
pub use manual_number::ManualNumber;

use std::sync::Arc;

use crate::collector::AdapterRegistry;

/// A registry holding every built-in adapter
pub fn builtin_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(ManualNumber));
    registry.register(Arc::new(GenericJson));
    registry.register(Arc::new(GitLabFailedJobs));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        assert_eq!(
            builtin_registry().types(),
            vec!["generic_json", "gitlab_failed_jobs", "manual_number"]
        );
    }
}
