//! `aigp` operator CLI
//!
//! ```bash
//! # Flat governance hash
//! aigp hash --content "max position: 10000"
//!
//! # Leaf hash of a pointer-mode resource
//! aigp leaf --type memory --name memory.positions --content-ref s3://positions/v3
//!
//! # Merkle root over a resources file
//! aigp merkle --resources resources.json --format json
//!
//! # Keys, signing and verification
//! aigp keygen --out agent.key --public-out agent.pub
//! aigp sign --key agent.key --event event.json --key-id agrn:key:1 > signed.json
//! aigp verify --public-key agent.pub --event signed.json
//!
//! # Tracestate
//! aigp tracestate encode --classification confidential --policy policy.x --version 4
//! aigp tracestate decode "aigp=cls:con;pol:policy.x;ver:4"
//! ```

pub mod cli;
pub mod error;

pub use cli::{AigpCli, CommandOutput, ExitCode, LogFormat, OutputFormat};
pub use error::CliError;

/// Run the CLI, print its output and return the exit code
pub fn run_cli(cli: AigpCli) -> ExitCode {
    match cli::run(&cli) {
        Ok(output) => {
            if !output.stdout.is_empty() {
                println!("{}", output.stdout);
            }
            output.exit_code
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
