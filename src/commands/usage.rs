use std::io::Write;

use tracing::debug;

use super::CommandContext;
use crate::error::{BimoError, BimoResult};
use crate::gateway::{ProviderConnection, UsageReport};
use crate::providers::ProviderId;

const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_DAYS: u32 = 30;

/// Parses `--days`; non-positive or unparsable values fall back to 30.
pub fn parse_days(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|days| *days > 0)
        .and_then(|days| u32::try_from(days).ok())
        .unwrap_or(DEFAULT_DAYS)
}

/// `bimo usage [provider] [--days N]`.
pub async fn run(
    ctx: &CommandContext,
    provider: Option<&str>,
    days: u32,
    out: &mut impl Write,
) -> BimoResult<()> {
    let provider = ProviderId::normalize(provider.unwrap_or(DEFAULT_PROVIDER));
    let gateway = ctx.gateway()?;
    let connections = gateway.list_connections().await?;

    let Some(latest) = newest_for(&connections, &provider) else {
        writeln!(
            out,
            "No {provider} connections found. Run: bimo connect {provider}"
        )
        .map_err(BimoError::Output)?;
        return Ok(());
    };
    debug!(connection_id = %latest.id, days, "Fetching usage");

    let report = gateway.usage(&latest.id, days).await?;
    for line in render(&provider, &latest.id, &report) {
        writeln!(out, "{line}").map_err(BimoError::Output)?;
    }
    Ok(())
}

/// Newest connection for `provider` by `created_at`; missing timestamps sort oldest.
fn newest_for<'a>(
    connections: &'a [ProviderConnection],
    provider: &ProviderId,
) -> Option<&'a ProviderConnection> {
    connections
        .iter()
        .filter(|connection| {
            connection
                .provider_id
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(provider.as_str()))
        })
        .max_by(|a, b| {
            a.created_at
                .as_deref()
                .unwrap_or_default()
                .cmp(b.created_at.as_deref().unwrap_or_default())
        })
}

fn render(provider: &ProviderId, connection_id: &str, report: &UsageReport) -> Vec<String> {
    let mut lines = vec![
        format!("Usage for {provider} (connection {connection_id}):"),
        format!("- Monthly cost: ${:.2}", report.monthly_cost),
    ];
    match report.daily_spend.last() {
        Some(day) => lines.push(format!(
            "- Latest day: {}  ${:.2}",
            day.day.as_deref().unwrap_or("n/a"),
            day.cost
        )),
        None => lines.push("- No daily spend data yet".to_string()),
    }
    lines
}
