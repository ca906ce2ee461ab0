//! kubestress CLI
//!
//! Generates control plane load by creating nodes and pods from scenario
//! templates and faking node readiness.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use kubestress_cli::error::EXIT_CONSTRUCTION;
use kubestress_cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Every TLS connection to the API server goes through aws-lc-rs
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("failed to install aws-lc-rs crypto provider: {:?}", e);
        return ExitCode::from(EXIT_CONSTRUCTION);
    }

    let cli = Cli::parse();
    if let Err(e) = cli.init_logging() {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::from(e.exit_code());
    }

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "kubestress failed");
            ExitCode::from(e.exit_code())
        }
    }
}
