//! Command handlers behind the CLI subcommands.
//!
//! Each handler takes a [`CommandContext`] and writes user-facing output to
//! the supplied writer; diagnostics go through `tracing` to stderr.

pub mod connect;
pub mod env;
pub mod login;
pub mod status;
pub mod usage;

use crate::config::AppConfig;
use crate::error::BimoResult;
use crate::gateway::GatewayClient;
use crate::session::{SessionState, SessionStore};

/// State shared by every command in one invocation.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: AppConfig,
    pub session_store: SessionStore,
    /// Value of the global `--gateway` flag.
    pub gateway_flag: Option<String>,
    session: SessionState,
}

impl CommandContext {
    /// Reads the session file once; later commands see that snapshot.
    pub fn new(config: AppConfig, session_store: SessionStore, gateway_flag: Option<String>) -> Self {
        let session = session_store.load();
        Self {
            config,
            session_store,
            gateway_flag,
            session,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn gateway_url(&self) -> String {
        self.config.resolve_gateway(
            self.gateway_flag.as_deref(),
            self.session.gateway_url.as_deref(),
        )
    }

    /// Gateway client carrying the saved session token, if any.
    pub fn gateway(&self) -> BimoResult<GatewayClient> {
        GatewayClient::new(&self.config, &self.gateway_url(), self.session.token.clone())
    }

    /// Gateway client without credentials, used before login.
    pub fn anonymous_gateway(&self) -> BimoResult<GatewayClient> {
        GatewayClient::new(&self.config, &self.gateway_url(), None)
    }
}
