//! Device-code login.
//!
//! `start` obtains a [`DeviceSession`]; `poll_until_complete` sleeps one
//! interval, polls once, and repeats until the gateway approves the code or
//! the session's lifetime has elapsed. Exactly one poll is in flight at a time
//! and nothing is retried past expiry.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument};

use crate::error::{BimoError, BimoResult};
use crate::gateway::GatewayClient;
use crate::gateway::types::{
    DEFAULT_EXPIRES_IN_SECS, DEFAULT_POLL_INTERVAL_SECS, DeviceStartResponse,
};

/// Lifecycle of one device login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Started,
    Polling,
    Approved,
    Expired,
}

/// A started device authorization.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub interval: Duration,
    pub expires_in: Duration,
    pub started_at: Instant,
}

impl DeviceSession {
    /// Applies the 3 s interval and 600 s lifetime defaults to missing or zero values.
    pub fn from_start(start: DeviceStartResponse, started_at: Instant) -> Self {
        let interval = start
            .interval
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let expires_in = start
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Self {
            device_code: start.device_code,
            user_code: start.user_code,
            verification_uri: start.verification_uri,
            interval: Duration::from_secs(interval),
            expires_in: Duration::from_secs(expires_in),
            started_at,
        }
    }

    /// Page the user visits, on the gateway's web origin.
    pub fn verification_url(&self, gateway_base: &str) -> String {
        if self.verification_uri.starts_with("http://")
            || self.verification_uri.starts_with("https://")
        {
            return self.verification_uri.clone();
        }
        format!(
            "{}{}",
            web_origin(gateway_base),
            self.verification_uri
        )
    }

    /// Verification page with the user code pre-filled.
    pub fn browser_url(&self, gateway_base: &str) -> String {
        let page = self.verification_url(gateway_base);
        let separator = if page.contains('?') { '&' } else { '?' };
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("user_code", &self.user_code)
            .finish();
        format!("{page}{separator}{query}")
    }

    pub fn is_expired(&self) -> bool {
        self.started_at.elapsed() > self.expires_in
    }
}

/// Strips one trailing API-version segment (`/v1`) from the gateway base.
pub fn web_origin(gateway_base: &str) -> &str {
    let trimmed = gateway_base.trim_end_matches('/');
    trimmed.strip_suffix("/v1").unwrap_or(trimmed)
}

/// Drives the device-code flow against one gateway.
pub struct DeviceLoginPoller<'a> {
    gateway: &'a GatewayClient,
}

impl<'a> DeviceLoginPoller<'a> {
    pub fn new(gateway: &'a GatewayClient) -> Self {
        Self { gateway }
    }

    /// Requests a device code.
    pub async fn start(&self) -> BimoResult<DeviceSession> {
        let start = self.gateway.start_device().await?;
        let session = DeviceSession::from_start(start, Instant::now());
        debug!(
            state = ?LoginState::Started,
            interval_secs = session.interval.as_secs(),
            expires_in_secs = session.expires_in.as_secs(),
            "Device login started"
        );
        Ok(session)
    }

    /// Polls until approval, returning the access token.
    ///
    /// `on_pending` runs after every poll that is not yet approved.
    #[instrument(skip_all)]
    pub async fn poll_until_complete(
        &self,
        session: &DeviceSession,
        mut on_pending: impl FnMut(),
    ) -> BimoResult<String> {
        let mut polls = 0u32;
        loop {
            sleep(session.interval).await;
            polls += 1;

            let response = self.gateway.poll_device(&session.device_code).await?;
            if let Some(token) = response.approved_token() {
                info!(state = ?LoginState::Approved, polls, "Device login approved");
                return Ok(token.to_string());
            }

            if session.is_expired() {
                info!(state = ?LoginState::Expired, polls, "Device login expired");
                return Err(BimoError::LoginTimeout {
                    waited_secs: session.started_at.elapsed().as_secs(),
                });
            }

            debug!(state = ?LoginState::Polling, status = ?response.status, "Login not approved yet");
            on_pending();
        }
    }
}
