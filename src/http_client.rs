//! Shared reqwest client construction.

use std::time::Duration;

use reqwest::Client;

use crate::error::BimoResult;

/// Builds a client with the per-request timeout every outbound call must carry.
pub fn build_http_client(timeout: Duration) -> BimoResult<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(concat!("bimo-cli/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
