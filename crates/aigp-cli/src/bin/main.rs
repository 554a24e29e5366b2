//! `aigp` - AI governance proof tooling
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Signature missing or invalid
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 10: Internal error

use aigp_cli::{run_cli, AigpCli, LogFormat};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = AigpCli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
