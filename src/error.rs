//! # Error Handling
//!
//! Fatal, user-facing failures for one CLI invocation. Best-effort paths
//! (JWT exchange, billing and dataset lookups, service-account inspection)
//! never produce a [`BimoError`]; they degrade to absent values instead.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used across the crate.
pub type BimoResult<T> = Result<T, BimoError>;

/// Every error that terminates a command.
#[derive(Debug, Error)]
pub enum BimoError {
    #[error("Failed to read or parse service account file {}: {reason}", path.display())]
    CredentialSource { path: PathBuf, reason: String },

    #[error("Provider name must not be empty")]
    MissingProvider,

    #[error("Login timed out after {waited_secs}s. Please try again.")]
    LoginTimeout { waited_secs: u64 },

    #[error("Gateway returned {status}: {message}")]
    Gateway { status: StatusCode, message: String },

    #[error("Request to gateway failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },

    #[error("Failed to read input: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Failed to access session file {}: {source}", path.display())]
    Session {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed session file {}: {source}", path.display())]
    SessionFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No home directory available for the session file; set BIMO_CONFIG_DIR")]
    NoSessionDir,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BimoError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Builds a gateway error from a non-2xx status and its raw body.
    ///
    /// Prefers `error.message`, then `detail`, then `message` from a JSON
    /// body; otherwise the trimmed body text, or the status reason.
    pub fn from_gateway_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                [
                    value.pointer("/error/message"),
                    value.get("detail"),
                    value.get("message"),
                ]
                .into_iter()
                .flatten()
                .find_map(|candidate| candidate.as_str().map(str::to_string))
            })
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        BimoError::Gateway { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_message_prefers_nested_error_message() {
        let err = BimoError::from_gateway_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"invalid credentials"},"detail":"ignored"}"#,
        );
        match err {
            BimoError::Gateway { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "invalid credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn gateway_message_falls_back_to_detail_then_body() {
        let err = BimoError::from_gateway_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":"provider not supported"}"#,
        );
        assert!(err.to_string().contains("provider not supported"));

        let err = BimoError::from_gateway_body(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert!(err.to_string().ends_with("upstream down"));

        let err = BimoError::from_gateway_body(StatusCode::NOT_FOUND, "");
        assert!(err.to_string().ends_with("Not Found"));
    }

    #[test]
    fn every_error_exits_with_one() {
        let err = BimoError::LoginTimeout { waited_secs: 600 };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("Login timed out"));
    }
}
