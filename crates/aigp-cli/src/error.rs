//! Error types for the `aigp` CLI

use aigp_core::AigpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Input file could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Output could not be rendered
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Governance(#[from] AigpError),
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CliError::InvalidInput(msg.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        match self {
            CliError::InvalidInput(_) | CliError::FileError(_) | CliError::ParseError(_) => true,
            CliError::Governance(e) => {
                e.is_validation_error() || matches!(e, AigpError::InvalidKey(_))
            }
            CliError::SerializationError(_) => false,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::FileError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(CliError::invalid_input("x").is_user_error());
        assert!(CliError::from(AigpError::EmptyResourceSet).is_user_error());
        assert!(CliError::from(AigpError::InvalidKey("bad".into())).is_user_error());
        assert!(!CliError::from(AigpError::Signing("rng".into())).is_user_error());
        assert!(!CliError::SerializationError("x".into()).is_user_error());
    }
}
