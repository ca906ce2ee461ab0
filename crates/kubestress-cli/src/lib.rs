//! kubestress CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};
use kubestress_common::logging::{init_logging, LogFormat};

/// kubestress - synthetic load for Kubernetes control planes
#[derive(Parser, Debug)]
#[command(name = "kubestress")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format (text or json)
    #[arg(
        long,
        global = true,
        env = "KUBESTRESS_LOG_FORMAT",
        default_value = "text",
        value_parser = parse_log_format
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create repetitions of a scenario and emulate node readiness
    Load(commands::load::LoadArgs),
    /// Remove objects created by earlier load runs (not implemented yet)
    Cleanup,
}

fn parse_log_format(s: &str) -> std::result::Result<LogFormat, String> {
    s.parse().map_err(|e: kubestress_common::Error| e.to_string())
}

impl Cli {
    /// Install the global tracing subscriber for the chosen log format
    pub fn init_logging(&self) -> Result<()> {
        init_logging(self.log_format).map_err(Error::construction)
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Load(args) => commands::load::run(args).await,
            Commands::Cleanup => commands::cleanup::run().await,
        }
    }
}
