//! JWT-bearer token exchange for Google service accounts.
//!
//! The assertion layout is validated strictly by Google's token endpoint, so
//! it is assembled explicitly: `base64url(header).base64url(claims)` signed
//! with RSA-SHA256, every part base64url without padding.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::AppConfig;
use crate::error::BimoResult;
use crate::google::service_account::ServiceAccountRecord;
use crate::http_client::build_http_client;

/// Read-only Cloud Billing scope.
pub const CLOUD_BILLING_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/cloud-billing.readonly";
/// Read-only BigQuery scope.
pub const BIGQUERY_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery.readonly";

const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Why an assertion could not be built.
#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("private key is not a valid RSA PEM: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error("signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("failed to encode JWT segment: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Diagnostic detail for a failed exchange. Never surfaced to the user.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("service account is missing client_email or private_key")]
    MissingSigner,
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    #[error("token request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("token response did not contain an access_token")]
    MissingToken,
}

fn base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Builds a signed RS256 assertion issued at `issued_at` (unix seconds).
pub fn build_assertion(
    client_email: &str,
    private_key_pem: &str,
    scopes: &[&str],
    audience: &str,
    issued_at: i64,
) -> Result<String, AssertionError> {
    let header = JwtHeader {
        alg: "RS256",
        typ: "JWT",
    };
    let claims = JwtClaims {
        iss: client_email,
        scope: scopes.join(" "),
        aud: audience,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
        iat: issued_at,
    };

    let signing_input = format!(
        "{}.{}",
        base64url(&serde_json::to_vec(&header)?),
        base64url(&serde_json::to_vec(&claims)?)
    );

    let key =
        EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(AssertionError::InvalidKey)?;
    // Already base64url without padding.
    let signature = jsonwebtoken::crypto::sign(signing_input.as_bytes(), &key, Algorithm::RS256)
        .map_err(AssertionError::Signing)?;

    Ok(format!("{signing_input}.{signature}"))
}

/// Exchanges a service-account assertion for a short-lived access token.
pub struct JwtBearerExchanger {
    http_client: Client,
    token_url: String,
}

impl JwtBearerExchanger {
    pub fn new(config: &AppConfig) -> BimoResult<Self> {
        Ok(Self::with_client(
            build_http_client(config.http_timeout())?,
            config.google_token_url.clone(),
        ))
    }

    pub fn with_client(http_client: Client, token_url: String) -> Self {
        Self {
            http_client,
            token_url,
        }
    }

    /// Best-effort exchange: every failure is logged and becomes `None`.
    #[instrument(skip_all, fields(scopes = scopes.len()))]
    pub async fn exchange(&self, record: &ServiceAccountRecord, scopes: &[&str]) -> Option<String> {
        match self.try_exchange(record, scopes).await {
            Ok(token) => {
                debug!("JWT exchange produced an access token");
                Some(token)
            }
            Err(err) => {
                warn!(error = %err, "JWT exchange failed; continuing without auto-detection");
                None
            }
        }
    }

    /// Same as [`exchange`](Self::exchange) but keeps the failure reason.
    pub async fn try_exchange(
        &self,
        record: &ServiceAccountRecord,
        scopes: &[&str],
    ) -> Result<String, ExchangeError> {
        let (client_email, private_key) = record.signer().ok_or(ExchangeError::MissingSigner)?;
        let assertion = build_assertion(
            client_email,
            private_key,
            scopes,
            &self.token_url,
            chrono::Utc::now().timestamp(),
        )?;

        let response = self
            .http_client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: OAuthTokenResponse = response.json().await?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or(ExchangeError::MissingToken)
    }
}
