//! CLI command definitions for `aigp`
//!
//! Offline operator tooling: hash content, compute leaf hashes and Merkle
//! roots, manage signing keys, sign and verify stored events, and code the
//! `aigp` tracestate entry.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

use aigp_core::hash::{self, HashMode, ResourceSpec};
use aigp_core::merkle::{self, MerkleTree, FLAT_HASH_TYPE, MERKLE_HASH_TYPE};
use aigp_core::{
    sign_event, tracestate, verify_json, GovernanceEvent, GovernedResource, SigningKey,
    VerifyingKey,
};

use super::output::{render, OutputFormat};
use super::ExitCode;
use crate::error::CliError;

/// AI governance proof tooling
#[derive(Parser, Debug)]
#[command(name = "aigp")]
#[command(about = "AIGP - governance hashes, Merkle proofs and signed governance events", long_about = None)]
#[command(version)]
pub struct AigpCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format on stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: AigpCommands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum AigpCommands {
    /// Flat governance hash of content
    Hash {
        #[command(flatten)]
        input: ContentInput,

        /// Digest algorithm (sha256, sha384, sha512)
        #[arg(short, long, default_value = "sha256")]
        algorithm: String,
    },

    /// Domain-separated leaf hash of one governed resource
    Leaf {
        /// Resource type, e.g. policy, prompt, tool, memory
        #[arg(short = 't', long = "type")]
        resource_type: String,

        /// Resource name, e.g. policy.trading-limits
        #[arg(short = 'n', long = "name")]
        resource_name: String,

        /// Hash this stable reference instead of inline content
        #[arg(long, conflicts_with_all = ["content", "file"])]
        content_ref: Option<String>,

        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Governance hash over a set of resources
    ///
    /// Reads a JSON (or YAML, by extension) array of resources with
    /// resource_type, resource_name, content, hash_mode and content_ref.
    Merkle {
        /// Path to the resources file
        #[arg(short, long)]
        resources: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate a P-256 signing key
    Keygen {
        /// Where to write the PKCS#8 private key PEM
        #[arg(short, long)]
        out: PathBuf,

        /// Where to write the public key PEM (stdout if omitted)
        #[arg(long)]
        public_out: Option<PathBuf>,
    },

    /// Sign a stored governance event
    Sign {
        /// PKCS#8 private key PEM
        #[arg(short, long)]
        key: PathBuf,

        /// Governance event JSON
        #[arg(short, long)]
        event: PathBuf,

        /// Key identifier placed in the JWS header
        #[arg(long)]
        key_id: Option<String>,
    },

    /// Verify the signature of a stored governance event
    Verify {
        /// Public key PEM
        #[arg(short = 'k', long)]
        public_key: PathBuf,

        /// Governance event JSON
        #[arg(short, long)]
        event: PathBuf,
    },

    /// Encode or decode the `aigp` tracestate entry
    Tracestate {
        #[command(subcommand)]
        action: TracestateCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TracestateCommands {
    /// Prepend an `aigp` entry to a tracestate header
    Encode {
        #[arg(short, long, default_value = "")]
        classification: String,

        #[arg(short, long, default_value = "")]
        policy: String,

        #[arg(long, default_value_t = 0)]
        version: u32,

        /// Existing tracestate header
        #[arg(long, default_value = "")]
        existing: String,
    },

    /// Decode the `aigp` entry of a tracestate header
    Decode {
        header: String,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Content given inline or read from a file
#[derive(clap::Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ContentInput {
    #[arg(long)]
    pub content: Option<String>,

    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl ContentInput {
    fn load(&self) -> Result<String, CliError> {
        match (&self.content, &self.file) {
            (Some(content), _) => Ok(content.clone()),
            (None, Some(path)) => read_file(path),
            (None, None) => Err(CliError::invalid_input("either --content or --file is required")),
        }
    }
}

/// What a command prints and how the process exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: ExitCode,
}

impl CommandOutput {
    fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: ExitCode::Success,
        }
    }
}

#[derive(Debug, Serialize)]
struct MerkleOutput {
    governance_hash: String,
    hash_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    governance_merkle_tree: Option<MerkleTree>,
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| {
        CliError::FileError(format!("Failed to read '{}': {}", path.display(), e))
    })
}

fn write_file(path: &Path, contents: &str, private: bool) -> Result<(), CliError> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if private {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options.open(path).map_err(|e| {
        CliError::FileError(format!("Failed to write '{}': {}", path.display(), e))
    })?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

fn load_event(path: &Path) -> Result<GovernanceEvent, CliError> {
    let json = read_file(path)?;
    serde_json::from_str(&json).map_err(|e| {
        CliError::ParseError(format!("'{}' is not a governance event: {}", path.display(), e))
    })
}

/// Load an event as the raw JSON document, without re-rendering any field.
fn load_event_document(path: &Path) -> Result<serde_json::Value, CliError> {
    let json = read_file(path)?;
    match serde_json::from_str(&json) {
        Ok(value @ serde_json::Value::Object(_)) => Ok(value),
        Ok(_) => Err(CliError::ParseError(format!(
            "'{}' is not a governance event: expected a JSON object",
            path.display()
        ))),
        Err(e) => Err(CliError::ParseError(format!(
            "'{}' is not a governance event: {}",
            path.display(),
            e
        ))),
    }
}

fn load_resources(path: &Path) -> Result<Vec<GovernedResource>, CliError> {
    let document = read_file(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let specs: Vec<ResourceSpec> = if is_yaml {
        serde_yaml::from_str(&document).map_err(|e| CliError::ParseError(e.to_string()))?
    } else {
        serde_json::from_str(&document).map_err(|e| CliError::ParseError(e.to_string()))?
    };
    tracing::debug!(path = %path.display(), count = specs.len(), "Loaded resources");
    specs
        .into_iter()
        .map(|spec| GovernedResource::try_from(spec).map_err(CliError::from))
        .collect()
}

/// Execute the hash command
pub fn execute_hash(input: &ContentInput, algorithm: &str) -> Result<CommandOutput, CliError> {
    let content = input.load()?;
    Ok(CommandOutput::success(hash::digest_named(content.as_bytes(), algorithm)?))
}

/// Execute the leaf command
pub fn execute_leaf(
    resource_type: &str,
    resource_name: &str,
    content_ref: Option<&str>,
    content: Option<&str>,
    file: Option<&Path>,
) -> Result<CommandOutput, CliError> {
    let leaf = match (content_ref, content, file) {
        (Some(content_ref), _, _) => {
            hash::leaf_hash(resource_type, resource_name, "", HashMode::Pointer, content_ref)?
        }
        (None, Some(content), _) => {
            hash::leaf_hash(resource_type, resource_name, content, HashMode::Content, "")?
        }
        (None, None, Some(path)) => {
            let content = read_file(path)?;
            hash::leaf_hash(resource_type, resource_name, &content, HashMode::Content, "")?
        }
        (None, None, None) => {
            return Err(CliError::invalid_input(
                "one of --content, --file or --content-ref is required",
            ))
        }
    };
    Ok(CommandOutput::success(leaf))
}

/// Execute the merkle command
pub fn execute_merkle(resources: &Path, format: OutputFormat) -> Result<CommandOutput, CliError> {
    let resources = load_resources(resources)?;
    let (root, tree) = merkle::build(&resources)?;
    let output = MerkleOutput {
        governance_hash: root,
        hash_type: if tree.is_some() { MERKLE_HASH_TYPE } else { FLAT_HASH_TYPE },
        governance_merkle_tree: tree,
    };

    let rendered = render(&output, format, |o| {
        let mut lines = vec![format!("{} ({})", o.governance_hash, o.hash_type)];
        if let Some(tree) = &o.governance_merkle_tree {
            lines.extend(tree.leaves.iter().map(|leaf| {
                format!("  {} {}:{}", leaf.hash, leaf.resource_type, leaf.resource_name)
            }));
        }
        lines.join("\n")
    })?;
    Ok(CommandOutput::success(rendered))
}

/// Execute the keygen command
pub fn execute_keygen(out: &Path, public_out: Option<&Path>) -> Result<CommandOutput, CliError> {
    let key = SigningKey::generate()?;
    let public_pem = key.verifying_key()?.to_public_key_pem();

    write_file(out, &key.to_pkcs8_pem(), true)?;
    tracing::info!(path = %out.display(), "Wrote private key");

    match public_out {
        Some(path) => {
            write_file(path, &public_pem, false)?;
            Ok(CommandOutput::success(format!("Wrote public key to {}", path.display())))
        }
        None => Ok(CommandOutput::success(public_pem.trim_end())),
    }
}

/// Execute the sign command
pub fn execute_sign(key: &Path, event: &Path, key_id: Option<&str>) -> Result<CommandOutput, CliError> {
    let pem = zeroize::Zeroizing::new(read_file(key)?);
    let key = SigningKey::from_pkcs8_pem(&pem)?;
    let event = load_event(event)?;

    let signed = sign_event(&event, &key, key_id.unwrap_or_default())?;
    let json = serde_json::to_string_pretty(&signed)
        .map_err(|e| CliError::SerializationError(e.to_string()))?;
    Ok(CommandOutput::success(json))
}

/// Execute the verify command
///
/// The signature is checked against the document as stored, so a field
/// added or re-rendered after signing makes it invalid.
pub fn execute_verify(public_key: &Path, event: &Path) -> Result<CommandOutput, CliError> {
    let key = VerifyingKey::from_public_key_pem(&read_file(public_key)?)?;
    let document = load_event_document(event)?;

    let signed = document
        .get("event_signature")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|token| !token.is_empty());
    if !signed {
        return Ok(CommandOutput {
            stdout: "unsigned".to_string(),
            exit_code: ExitCode::VerificationFailed,
        });
    }
    if verify_json(&document, &key) {
        Ok(CommandOutput::success("valid"))
    } else {
        let event_id = document
            .get("event_id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        tracing::warn!(event_id = %event_id, "Signature verification failed");
        Ok(CommandOutput {
            stdout: "invalid".to_string(),
            exit_code: ExitCode::VerificationFailed,
        })
    }
}

/// Execute a tracestate command
pub fn execute_tracestate(action: &TracestateCommands) -> Result<CommandOutput, CliError> {
    match action {
        TracestateCommands::Encode {
            classification,
            policy,
            version,
            existing,
        } => Ok(CommandOutput::success(tracestate::inject(
            existing,
            classification,
            policy,
            *version,
        ))),
        TracestateCommands::Decode { header, format } => {
            let state = tracestate::extract(header);
            let rendered = render(&state, *format, |s| {
                [
                    ("data_classification", &s.data_classification),
                    ("policy_name", &s.policy_name),
                    ("policy_version", &s.policy_version),
                ]
                .iter()
                .filter_map(|(k, v)| v.as_ref().map(|v| format!("{k}: {v}")))
                .collect::<Vec<_>>()
                .join("\n")
            })?;
            Ok(CommandOutput::success(rendered))
        }
    }
}
