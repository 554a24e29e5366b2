//! CLI module for `aigp`

pub mod commands;
pub mod output;

pub use commands::{AigpCli, AigpCommands, CommandOutput, LogFormat, TracestateCommands};
pub use output::OutputFormat;

use crate::error::CliError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Signature missing or invalid
    VerificationFailed = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Exit code for a failed command
    pub fn from_error(error: &CliError) -> Self {
        match error {
            CliError::FileError(_) => ExitCode::FileError,
            e if e.is_user_error() => ExitCode::InvalidInput,
            _ => ExitCode::InternalError,
        }
    }
}

/// Run one command and return what it prints
pub fn run(cli: &AigpCli) -> Result<CommandOutput, CliError> {
    match &cli.command {
        AigpCommands::Hash { input, algorithm } => commands::execute_hash(input, algorithm),
        AigpCommands::Leaf {
            resource_type,
            resource_name,
            content_ref,
            content,
            file,
        } => commands::execute_leaf(
            resource_type,
            resource_name,
            content_ref.as_deref(),
            content.as_deref(),
            file.as_deref(),
        ),
        AigpCommands::Merkle { resources, format } => commands::execute_merkle(resources, *format),
        AigpCommands::Keygen { out, public_out } => {
            commands::execute_keygen(out, public_out.as_deref())
        }
        AigpCommands::Sign { key, event, key_id } => {
            commands::execute_sign(key, event, key_id.as_deref())
        }
        AigpCommands::Verify { public_key, event } => commands::execute_verify(public_key, event),
        AigpCommands::Tracestate { action } => commands::execute_tracestate(action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigp_core::AigpError;
    use clap::Parser;

    #[test]
    fn test_exit_code_conversion() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::VerificationFailed), 1);
        assert_eq!(i32::from(ExitCode::InternalError), 10);
    }

    #[test]
    fn test_exit_code_from_error() {
        assert_eq!(
            ExitCode::from_error(&CliError::FileError("gone".into())),
            ExitCode::FileError
        );
        assert_eq!(
            ExitCode::from_error(&AigpError::InvalidResourceType("Policy".into()).into()),
            ExitCode::InvalidInput
        );
        assert_eq!(
            ExitCode::from_error(&CliError::SerializationError("x".into())),
            ExitCode::InternalError
        );
    }

    #[test]
    fn test_parse_and_run_hash() {
        let cli = AigpCli::try_parse_from(["aigp", "hash", "--content", "abc"]).unwrap();
        let output = run(&cli).unwrap();
        assert_eq!(
            output.stdout,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(output.exit_code, ExitCode::Success);
    }

    #[test]
    fn test_hash_requires_exactly_one_input() {
        assert!(AigpCli::try_parse_from(["aigp", "hash"]).is_err());
        assert!(AigpCli::try_parse_from(["aigp", "hash", "--content", "a", "--file", "b"]).is_err());
    }

    #[test]
    fn test_leaf_pointer_conflicts_with_content() {
        assert!(AigpCli::try_parse_from([
            "aigp", "leaf", "-t", "memory", "-n", "m", "--content-ref", "s3://x", "--content", "y",
        ])
        .is_err());
    }

    #[test]
    fn test_tracestate_encode() {
        let cli = AigpCli::try_parse_from([
            "aigp",
            "tracestate",
            "encode",
            "--classification",
            "confidential",
            "--policy",
            "policy.x",
            "--version",
            "4",
            "--existing",
            "dd=s:1",
        ])
        .unwrap();
        assert_eq!(run(&cli).unwrap().stdout, "aigp=cls:con;pol:policy.x;ver:4,dd=s:1");
    }
}
