use std::collections::BTreeMap;
use std::io::Write;

use super::CommandContext;
use crate::error::{BimoError, BimoResult};
use crate::gateway::ProviderConnection;

const EMPTY_HINT: &str =
    "No providers connected yet. Run: bimo connect gemini --service-account-file <path>";

/// `bimo status`: connection counts per provider.
pub async fn run(ctx: &CommandContext, out: &mut impl Write) -> BimoResult<()> {
    let connections = ctx.gateway()?.list_connections().await?;
    let line = match summarize(&connections) {
        Some(summary) => format!("Connected providers: {summary}"),
        None => EMPTY_HINT.to_string(),
    };
    writeln!(out, "{line}").map_err(BimoError::Output)
}

/// `openai(2), gemini(1)` style summary, ordered by provider id.
fn summarize(connections: &[ProviderConnection]) -> Option<String> {
    if connections.is_empty() {
        return None;
    }
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for connection in connections {
        let provider = connection
            .provider_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or("unknown")
            .to_lowercase();
        *counts.entry(provider).or_default() += 1;
    }
    Some(
        counts
            .iter()
            .map(|(provider, count)| format!("{provider}({count})"))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, provider: Option<&str>) -> ProviderConnection {
        ProviderConnection {
            id: id.to_string(),
            provider_id: provider.map(str::to_string),
            created_at: None,
        }
    }

    #[test]
    fn counts_are_grouped_case_insensitively_and_sorted() {
        let rows = vec![
            row("1", Some("OpenAI")),
            row("2", Some("gemini")),
            row("3", Some("openai")),
            row("4", None),
        ];
        assert_eq!(
            summarize(&rows).as_deref(),
            Some("gemini(1), openai(2), unknown(1)")
        );
    }

    #[test]
    fn empty_list_has_no_summary() {
        assert_eq!(summarize(&[]), None);
    }
}
