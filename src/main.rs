//! # bimo CLI entry point

use std::io;
use std::process::ExitCode;

use bimo::cli::{Cli, Command, EnvCommand};
use bimo::commands::{self, CommandContext};
use bimo::config::ConfigLoader;
use bimo::credentials::TerminalPrompter;
use bimo::error::BimoResult;
use bimo::session::SessionStore;
use bimo::telemetry::init_tracing;
use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> BimoResult<()> {
    let config = ConfigLoader::new().load()?;
    if let Err(err) = init_tracing(&config) {
        eprintln!("warning: {err}");
    }
    if let Ok(redacted) = config.redacted_json() {
        debug!(profile = %config.profile, configuration = %redacted, "Loaded configuration");
    }

    let session_store = SessionStore::from_config(&config)?;
    let ctx = CommandContext::new(config, session_store, cli.gateway);
    let mut out = io::stdout();

    let result = match cli.command {
        Command::Login { no_browser } => commands::login::run(&ctx, &mut out, !no_browser).await,
        Command::Connect(args) => {
            let mut prompter = TerminalPrompter::stdio();
            commands::connect::run(&ctx, &args.into(), &mut prompter, &mut out).await
        }
        Command::Env {
            command: EnvCommand::Export,
        } => commands::env::export(&ctx, &mut out).await,
        Command::Status => commands::status::run(&ctx, &mut out).await,
        Command::Usage { provider, days } => {
            let days = commands::usage::parse_days(days.as_deref());
            commands::usage::run(&ctx, provider.as_deref(), days, &mut out).await
        }
    };
    if let Err(err) = &result {
        debug!(error = ?err, "Command failed");
    }
    result
}
