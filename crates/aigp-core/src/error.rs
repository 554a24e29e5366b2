//! Error types for governance hashing, event signing, and propagation.

use thiserror::Error;

/// Main error type for AIGP operations
#[derive(Error, Debug)]
pub enum AigpError {
    /// Digest algorithm tag not recognized
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Resource type does not match the lowercase kebab-case pattern
    #[error("Invalid resource_type: {0:?}. Must match pattern ^[a-z][a-z0-9]*(-[a-z0-9]+)*$")]
    InvalidResourceType(String),

    /// Pointer-mode resource without a content reference
    #[error("content_ref is required when hash_mode is pointer (resource {0:?})")]
    MissingContentRef(String),

    /// Merkle build over an empty resource set
    #[error("At least one resource is required")]
    EmptyResourceSet,

    /// Multi-policy emission with no policies
    #[error("At least one policy is required")]
    EmptyPolicySet,

    /// Signing requested in a build without cryptographic support
    #[error("Event signing is unavailable: {0}")]
    MissingCryptoSupport(String),

    /// Key material could not be parsed
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Signature computation failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Key outside the baggage allow-list
    #[error("Key {0:?} may not be propagated in baggage")]
    ForbiddenBaggageKey(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AigpError {
    /// Check if this error is caused by caller input (vs. environment or integration)
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            AigpError::UnsupportedAlgorithm(_)
                | AigpError::InvalidResourceType(_)
                | AigpError::MissingContentRef(_)
                | AigpError::EmptyResourceSet
                | AigpError::EmptyPolicySet
                | AigpError::ForbiddenBaggageKey(_)
        )
    }
}

impl From<toml::de::Error> for AigpError {
    fn from(err: toml::de::Error) -> Self {
        AigpError::Configuration(format!("TOML error: {}", err))
    }
}

impl From<std::io::Error> for AigpError {
    fn from(err: std::io::Error) -> Self {
        AigpError::Configuration(err.to_string())
    }
}

/// Result type alias for AIGP operations
pub type Result<T> = std::result::Result<T, AigpError>;
