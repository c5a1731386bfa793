use std::io::Write;

use super::CommandContext;
use crate::connect::{ConnectFlow, ConnectOptions};
use crate::credentials::CredentialPrompter;
use crate::error::{BimoError, BimoResult};
use crate::google::{AutoDetector, JwtBearerExchanger};

/// `bimo connect <provider>`.
pub async fn run(
    ctx: &CommandContext,
    options: &ConnectOptions,
    prompter: &mut dyn CredentialPrompter,
    out: &mut impl Write,
) -> BimoResult<()> {
    let gateway = ctx.gateway()?;
    let exchanger = JwtBearerExchanger::new(&ctx.config)?;
    let detector = AutoDetector::new(&ctx.config)?;

    let outcome = ConnectFlow::new(&gateway, &exchanger, &detector)
        .run(options, prompter)
        .await?;

    writeln!(out, "Connected. Connection ID: {}", outcome.connection_id)
        .map_err(BimoError::Output)
}
