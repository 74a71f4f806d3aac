//! Error types for source collection

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for collection operations
pub type CollectResult<T> = Result<T, CollectError>;

/// Source-level failure. These never escape the orchestrator: each one
/// ends up as the `connection_error` or `parse_error` of its source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectError {
    /// Transport or HTTP-level failure (DNS, TLS, refused, non-2xx, auth)
    #[error("{0}")]
    Connection(String),

    /// Structural failure of a response (missing field, wrong root, bad body)
    #[error("{0}")]
    Parse(String),

    /// Invalid or missing parameter, detected before any request
    #[error("Invalid source configuration: {0}")]
    Configuration(String),

    /// The collection cycle's deadline elapsed first
    #[error("Collection deadline of {0:?} elapsed before the source responded")]
    Timeout(Duration),
}

impl CollectError {
    pub fn connection<E: fmt::Display>(msg: E) -> Self {
        Self::Connection(msg.to_string())
    }

    pub fn parse<E: fmt::Display>(msg: E) -> Self {
        Self::Parse(msg.to_string())
    }

    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::Configuration(format!("missing mandatory parameter '{name}'"))
    }

    /// Whether this error is reported as `connection_error` (as opposed to
    /// `parse_error`)
    pub fn is_connection_class(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(CollectError::connection("refused").is_connection_class());
        assert!(CollectError::Timeout(Duration::from_secs(1)).is_connection_class());
        assert!(!CollectError::parse("missing field").is_connection_class());
        assert!(!CollectError::missing_parameter("url").is_connection_class());
        assert_eq!(
            CollectError::missing_parameter("url").to_string(),
            "Invalid source configuration: missing mandatory parameter 'url'"
        );
    }
}
