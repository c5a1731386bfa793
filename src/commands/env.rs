use std::io::Write;

use super::CommandContext;
use crate::error::{BimoError, BimoResult};

/// `bimo env export`: prints gateway variables in `.env` format.
pub async fn export(ctx: &CommandContext, out: &mut impl Write) -> BimoResult<()> {
    let gateway = ctx.gateway()?;
    let exported = gateway.env().await?;

    let gateway_url = exported
        .gateway_url
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| gateway.base_url().to_string());
    let key = exported
        .key
        .filter(|key| !key.is_empty())
        .or_else(|| gateway.token().map(str::to_string));

    writeln!(out, "BIMO_GATEWAY_URL={gateway_url}").map_err(BimoError::Output)?;
    if let Some(key) = key {
        writeln!(out, "BIMO_KEY={key}").map_err(BimoError::Output)?;
    }
    Ok(())
}
