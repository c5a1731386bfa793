//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::connect::ConnectOptions;

#[derive(Debug, Parser)]
#[command(name = "bimo", version, about = "Connect AI and cloud billing providers to the bimo gateway")]
pub struct Cli {
    /// Gateway base URL, e.g. http://localhost:8001/v1
    #[arg(long, global = true)]
    pub gateway: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate via device code flow
    Login {
        /// Print the verification URL without opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Connect a provider (openai, claude, gemini, gcp, azure)
    Connect(ConnectArgs),
    /// Environment utilities
    Env {
        #[command(subcommand)]
        command: EnvCommand,
    },
    /// Show connection status summary
    Status,
    /// Show usage for a provider (defaults to latest gemini)
    Usage {
        /// Provider id (gemini, openai, etc.)
        provider: Option<String>,
        /// Days to include
        #[arg(long, allow_hyphen_values = true)]
        days: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum EnvCommand {
    /// Print env variables in .env format
    Export,
}

#[derive(Debug, Args)]
pub struct ConnectArgs {
    pub provider: String,
    /// Path to a Google service account JSON key
    #[arg(long)]
    pub service_account_file: Option<PathBuf>,
    /// Auto-detect billing account and BigQuery dataset from the service account
    #[arg(long)]
    pub smart_connect: bool,
    /// production or developer
    #[arg(long)]
    pub key_type: Option<String>,
}

impl From<ConnectArgs> for ConnectOptions {
    fn from(args: ConnectArgs) -> Self {
        ConnectOptions {
            provider: args.provider,
            service_account_file: args.service_account_file,
            smart_connect: args.smart_connect,
            key_type: args.key_type,
        }
    }
}
